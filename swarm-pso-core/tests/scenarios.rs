//! End-to-end scenarios for the three optimizers.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::SeedableRng;
use swarm_pso_core::fuzzy::DEGENERATE_FACTOR;
use swarm_pso_core::prelude::*;
use swarm_pso_core::topology::SquareMatrix;
use swarm_pso_core::traits::{Euclidean, SignedDifference};

fn sphere<M>(p: &Particle<M>) -> f64 {
    -p.solution.iter().map(|x| x * x).sum::<f64>()
}

/// Particle `i` starts at `[i as f64; dim]`
fn staircase() -> VectorInit {
    let next = AtomicUsize::new(0);
    VectorInit::custom(move |dim, _| vec![next.fetch_add(1, Ordering::SeqCst) as f64; dim])
}

#[test]
fn base_pso_single_particle_on_sphere() {
    let mut rng = StdRng::seed_from_u64(0);
    let init = SwarmInit::new(1, 1)
        .with_position(VectorInit::Explicit(vec![-7.5]))
        .with_velocity(VectorInit::Constant(0.0));
    let mut swarm = BaseSwarm::new(&init, Topology::FullyConnected, &mut rng).unwrap();
    let before = sphere(&swarm.particles[0]);

    let config = PsoConfig::new(1, Bounds::uniform(1, -10.0, 10.0));
    let hooks = PsoHooks::default();
    let report = pso_maximize(&mut swarm, &sphere::<BaseMeta>, &config, hooks, &mut rng).unwrap();

    assert!(swarm.particles[0].solution[0].abs() <= 7.5);
    assert!(report.best_fitness >= before);
    assert!(swarm.particles[0].fitness >= before);
}

#[test]
fn acd_three_particles_connect_deterministically() {
    let mut rng = StdRng::seed_from_u64(0);
    let init = SwarmInit::new(3, 2).with_position(staircase());
    let params = AcdParams::default()
        .with_dist_threshold(1e6)
        .with_prob_rand_connection(0.0);
    let fitness = sphere::<AcdMeta>;
    let swarm =
        AcdSwarm::new(&init, params, &fitness, &Euclidean, &SignedDifference, &mut rng).unwrap();

    let expected = SquareMatrix::from_rows(vec![
        vec![0.0, 1.0, 1.0],
        vec![1.0, 0.0, 1.0],
        vec![1.0, 1.0, 0.0],
    ])
    .unwrap();
    assert_eq!(swarm.state.adjacency, expected);
}

#[test]
fn ese_coinciding_particles_do_not_fault() {
    let mut rng = StdRng::seed_from_u64(0);
    let init = SwarmInit::new(6, 3).with_position(VectorInit::Explicit(vec![0.5, -0.5, 1.0]));
    let mut swarm = EseSwarm::new(&init, &mut rng).unwrap();
    let config = EseConfig::new(1, Bounds::uniform(3, -2.0, 2.0));

    let fitness = sphere::<EseMeta>;
    let report =
        apso_ese_maximize(&mut swarm, &fitness, &Euclidean, &config, None, &mut rng).unwrap();

    assert_eq!(swarm.state.factor, DEGENERATE_FACTOR);
    assert_eq!(swarm.state.evolutionary_state, EvolutionaryState::Convergence);
    assert!(report.best_fitness.is_finite());
}

#[test]
fn ese_stagnation_shock_and_perturbation_width() {
    let mut rng = StdRng::seed_from_u64(5);
    let dim = 3;
    let init = SwarmInit::new(4, dim).with_position(VectorInit::Uniform { lo: -1.0, hi: 1.0 });
    let mut swarm = EseSwarm::new(&init, &mut rng).unwrap();
    let config =
        EseConfig::new(100, Bounds::uniform(dim, -50.0, 50.0)).with_stagnation_shock(1.0, 1.5);
    let plateau = |_: &Particle<EseMeta>| 1.0;

    let mut previous_mult = 0.0;
    let mut previous_dims = 0;
    for iteration in 0..6 {
        let single = EseConfig { n_iter: 1, ..config.clone() };
        apso_ese_maximize(&mut swarm, &plateau, &Euclidean, &single, None, &mut rng).unwrap();

        let mult = swarm.state.shock_mult;
        let dims = swarm.state.elite_perturb_dims;
        if iteration > 0 {
            assert!(
                (mult / previous_mult - 1.5).abs() < 1e-9,
                "shock multiplier must grow geometrically"
            );
        }
        assert!(dims >= previous_dims && dims <= dim);
        previous_mult = mult;
        previous_dims = dims;
    }
    assert_eq!(previous_dims, dim);
}
