//! Benchmarks for one optimization iteration of each swarm variant.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use swarm_pso_core::prelude::*;
use swarm_pso_core::traits::{Euclidean, SignedDifference};

fn sphere<M>(p: &Particle<M>) -> f64 {
    -p.solution.iter().map(|x| x * x).sum::<f64>()
}

const DIM: usize = 10;

fn init(n: usize) -> SwarmInit {
    SwarmInit::new(n, DIM).with_position(VectorInit::Uniform { lo: -10.0, hi: 10.0 })
}

fn bench_pso(c: &mut Criterion) {
    let mut group = c.benchmark_group("pso_iteration");
    let config = PsoConfig::new(1, Bounds::uniform(DIM, -10.0, 10.0));

    for n in [10, 50, 200].iter() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut swarm = BaseSwarm::new(&init(*n), Topology::FullyConnected, &mut rng).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| {
                pso_maximize(
                    black_box(&mut swarm),
                    &sphere::<BaseMeta>,
                    &config,
                    PsoHooks::default(),
                    &mut rng,
                )
                .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_acd(c: &mut Criterion) {
    let mut group = c.benchmark_group("acd_pso_iteration");
    let config = AcdConfig::new(1, Bounds::uniform(DIM, -10.0, 10.0));

    for n in [10, 50, 200].iter() {
        let mut rng = StdRng::seed_from_u64(0);
        let params = AcdParams::default().with_dist_threshold(2.0 * DIM as f64);
        let mut swarm = AcdSwarm::new(
            &init(*n),
            params,
            &sphere::<AcdMeta>,
            &Euclidean,
            &SignedDifference,
            &mut rng,
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| {
                acd_pso_maximize(
                    black_box(&mut swarm),
                    &sphere::<AcdMeta>,
                    &Euclidean,
                    &SignedDifference,
                    &config,
                    &mut rng,
                )
                .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_ese(c: &mut Criterion) {
    let mut group = c.benchmark_group("ese_apso_iteration");
    let config = EseConfig::new(1, Bounds::uniform(DIM, -10.0, 10.0));

    for n in [10, 50, 200].iter() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut swarm = EseSwarm::new(&init(*n), &mut rng).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| {
                apso_ese_maximize(
                    black_box(&mut swarm),
                    &sphere::<EseMeta>,
                    &Euclidean,
                    &config,
                    None,
                    &mut rng,
                )
                .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pso, bench_acd, bench_ese);
criterion_main!(benches);
