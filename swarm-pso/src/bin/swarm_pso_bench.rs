use std::path::PathBuf;

use swarm_pso::{run_experiment, Benchmark, ExperimentConfig, ExperimentError, Optimizer};
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("Usage: swarm_pso_bench --test <sphere|rast> --opt <pso|acd_pso|ese_apso> --dim N");
    eprintln!("         [--n-part N] [--n-iter N] [--verbosity N] [--debug] [--seed N]");
    eprintln!("       swarm_pso_bench --config <experiment.json>");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  swarm_pso_bench --test rast --opt ese_apso --dim 10 --n-part 40 --n-iter 500 \\");
    eprintln!("    --verbosity 1");
    std::process::exit(2);
}

fn value<T: std::str::FromStr>(args: &mut impl Iterator<Item = String>, flag: &str) -> T {
    let Some(raw) = args.next() else {
        eprintln!("error: {flag} expects a value");
        usage();
    };
    raw.parse().unwrap_or_else(|_| {
        eprintln!("error: invalid value `{raw}` for {flag}");
        usage();
    })
}

fn parse_args() -> Result<ExperimentConfig, ExperimentError> {
    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut test: Option<Benchmark> = None;
    let mut optimizer: Option<Optimizer> = None;
    let mut dim: Option<usize> = None;
    let mut n_particles: Option<usize> = None;
    let mut n_iter: Option<usize> = None;
    let mut verbosity: Option<u8> = None;
    let mut debug = false;
    let mut seed: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(value::<String>(&mut args, "--config"))),
            "--test" => test = Some(value::<String>(&mut args, "--test").parse()?),
            "--opt" => optimizer = Some(value::<String>(&mut args, "--opt").parse()?),
            "--dim" => dim = Some(value(&mut args, "--dim")),
            "--n-part" => n_particles = Some(value(&mut args, "--n-part")),
            "--n-iter" => n_iter = Some(value(&mut args, "--n-iter")),
            "--verbosity" => verbosity = Some(value(&mut args, "--verbosity")),
            "--seed" => seed = Some(value(&mut args, "--seed")),
            "--debug" => debug = true,
            "-h" | "--help" => usage(),
            other => {
                eprintln!("error: unexpected argument `{other}`");
                usage();
            }
        }
    }

    // command-line flags override the file
    let mut config = match config_path {
        Some(path) => ExperimentConfig::from_json_file(path)?,
        None => {
            let (Some(test), Some(optimizer), Some(dim)) = (test, optimizer, dim) else {
                usage();
            };
            ExperimentConfig::new(test, optimizer, dim)
        }
    };
    if let Some(test) = test {
        config.test = test;
    }
    if let Some(optimizer) = optimizer {
        config.optimizer = optimizer;
    }
    if let Some(dim) = dim {
        config.dim = dim;
    }
    if let Some(n_particles) = n_particles {
        config.n_particles = n_particles;
    }
    if let Some(n_iter) = n_iter {
        config.n_iter = n_iter;
    }
    if let Some(verbosity) = verbosity {
        config.verbosity = verbosity;
    }
    if let Some(seed) = seed {
        config.seed = Some(seed);
    }
    config.debug |= debug;
    Ok(config)
}

fn init_tracing(config: &ExperimentConfig) {
    let level = match config.verbosity {
        0 if !config.debug => "warn",
        1 if !config.debug => "info",
        0..=2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    init_tracing(&config);

    let report = match run_experiment(&config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
