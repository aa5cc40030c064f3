//! Rejection behavior: retry geometry, atomicity, negative policies.

use osmos_core::{EntityCatalog, EntityKind};
use osmos_engine::{EpochError, Simulation, SimulationConfig, SteppingConfig};
use osmos_module::{ApplyError, NegativePolicy};
use osmos_modules::ReactionModule;
use osmos_test_utils::{single_node_graph, CYTOPLASM};

fn stiff_decay(initial_step: f64, tolerance: f64, policy: NegativePolicy, a0: f64) -> Simulation {
    let mut catalog = EntityCatalog::new();
    let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
    let p = catalog.register("P", EntityKind::SmallMolecule).unwrap();
    let (graph, _, _) = single_node_graph(&[(a, a0)]);

    let reaction = ReactionModule::builder()
        .name("decay")
        .substrate(a, 1.0)
        .product(p, 1.0)
        .mass_action(1.0)
        .build();

    Simulation::new(SimulationConfig {
        graph,
        catalog,
        modules: vec![Box::new(reaction)],
        stepping: SteppingConfig {
            local_tolerance: tolerance,
            initial_step,
            minimum_step: 1e-9,
            maximum_step: 4.0,
            ..SteppingConfig::default()
        },
        negative_policy: policy,
        seed: 0,
    })
    .unwrap()
}

#[test]
fn retried_step_is_shrink_factor_times_previous() {
    // A coarse step on a stiff reaction forces at least one rejection.
    let mut sim = stiff_decay(1.5, 0.01, NegativePolicy::Clamp, 1.0);
    let result = sim.next_epoch().unwrap();

    assert!(result.retries >= 1, "expected a rejection at step 1.5");
    // Each rejection multiplies by the shrink factor of 0.5 exactly.
    let expected = 1.5 * 0.5f64.powi(result.retries as i32);
    assert_eq!(result.accepted_step, expected);
    assert_eq!(result.elapsed_after, result.accepted_step);
}

#[test]
fn accepted_epoch_commits_the_half_step_state() {
    let mut sim = stiff_decay(1.5, 0.01, NegativePolicy::Clamp, 1.0);
    let catalog = sim.catalog();
    let a = catalog.lookup("A").unwrap();
    let p = catalog.lookup("P").unwrap();
    let node = sim.graph().node_ids().next().unwrap();

    let result = sim.next_epoch().unwrap();

    // Two explicit sub-steps of h/2 from A = 1.0.
    let h = result.accepted_step;
    let expected_a = (1.0 - h / 2.0) * (1.0 - h / 2.0);
    let got_a = sim.concentration(node, CYTOPLASM, a);
    assert!(
        (got_a - expected_a).abs() < 1e-12,
        "committed state is not the half-step candidate: {got_a} vs {expected_a}"
    );
    assert!((got_a + sim.concentration(node, CYTOPLASM, p) - 1.0).abs() < 1e-12);
}

#[test]
fn clamp_policy_floors_overdrawn_substrate() {
    // Step so coarse the substrate would go negative; tolerance so
    // loose the attempt is accepted anyway.
    let mut sim = stiff_decay(3.0, 10.0, NegativePolicy::Clamp, 0.1);
    let catalog = sim.catalog();
    let a = catalog.lookup("A").unwrap();
    let node = sim.graph().node_ids().next().unwrap();

    sim.next_epoch().unwrap();
    assert_eq!(sim.concentration(node, CYTOPLASM, a), 0.0);
}

#[test]
fn strict_policy_fails_instead_of_clamping() {
    let mut sim = stiff_decay(3.0, 10.0, NegativePolicy::Fail, 0.1);
    let catalog = sim.catalog();
    let a = catalog.lookup("A").unwrap();
    let node = sim.graph().node_ids().next().unwrap();

    match sim.next_epoch() {
        Err(EpochError::Consistency(ApplyError::NegativeConcentration {
            value, ..
        })) => assert!(value < 0.0),
        other => panic!("expected NegativeConcentration, got {other:?}"),
    }
    // Fatal errors leave the state untouched.
    assert_eq!(sim.concentration(node, CYTOPLASM, a), 0.1);
    assert_eq!(sim.elapsed_time(), 0.0);
}
