//! Evolutionary-state-estimation PSO on a 5-dimensional sphere, driven
//! directly through the core API with gradient local search on the elite.
//!
//! Run with: cargo run -p swarm-pso --example ese_sphere

use rand::rngs::StdRng;
use rand::SeedableRng;
use swarm_pso::benchmarks::{euclidean, sphere, sphere_gradient, SPHERE_BOUNDS};
use swarm_pso::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let dim = 5;
    let (lo, hi) = SPHERE_BOUNDS;
    let mut rng = StdRng::seed_from_u64(42);

    let init = SwarmInit::new(24, dim)
        .with_position(VectorInit::Uniform { lo, hi })
        .with_velocity(VectorInit::Constant(0.0));
    let mut swarm = EseSwarm::new(&init, &mut rng)?;

    let config = EseConfig::new(300, Bounds::uniform(dim, lo, hi)).with_verbosity(1);
    let search = LocalSearch::new(5e-3, Selector::Elite { k: 3 }, |p: &Particle<EseMeta>| {
        sphere_gradient(p).into_iter().map(|g| -g).collect::<Vec<_>>()
    });

    let report = apso_ese_maximize(
        &mut swarm,
        &sphere::<EseMeta>,
        &euclidean::<EseMeta>,
        &config,
        Some(search),
        &mut rng,
    )?;

    println!("state:         {}", swarm.state.evolutionary_state);
    println!("best fitness:  {:.6}", report.best_fitness);
    println!("best position: {:?}", report.best_position);
    Ok(())
}
