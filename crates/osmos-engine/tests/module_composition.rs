//! Composition properties: registration-order independence, direct
//! assignments, deterministic displacement.

use osmos_core::{EntityCatalog, EntityId, EntityKind, FeatureKind};
use osmos_engine::{Simulation, SimulationConfig, SteppingConfig};
use osmos_graph::{AgentState, AutomatonGraph, CellTopology, RegionBounds};
use osmos_module::{NegativePolicy, UpdateModule};
use osmos_modules::{AssignmentModule, DiffusionModule, DisplacementModule, ReactionModule};
use osmos_test_utils::{single_node_graph, two_node_graph, CYTOPLASM};

fn catalog_ab() -> (EntityCatalog, EntityId, EntityId) {
    let mut catalog = EntityCatalog::new();
    let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
    let b = catalog.register("B", EntityKind::SmallMolecule).unwrap();
    catalog.set_feature(a, FeatureKind::Diffusivity, 0.125).unwrap();
    (catalog, a, b)
}

fn composed_modules(a: EntityId, b: EntityId, reversed: bool) -> Vec<Box<dyn UpdateModule>> {
    let forward = ReactionModule::builder()
        .name("forward")
        .substrate(a, 1.0)
        .product(b, 1.0)
        .mass_action(0.5)
        .build();
    let backward = ReactionModule::builder()
        .name("backward")
        .substrate(b, 1.0)
        .product(a, 1.0)
        .mass_action(0.25)
        .build();
    let diffusion = DiffusionModule::new("diffusion", CellTopology::Inner, vec![a]);

    let mut modules: Vec<Box<dyn UpdateModule>> =
        vec![Box::new(forward), Box::new(backward), Box::new(diffusion)];
    if reversed {
        modules.reverse();
    }
    modules
}

fn run_composed(reversed: bool) -> Vec<f64> {
    let (catalog, a, b) = catalog_ab();
    let (graph, nodes, _) = two_node_graph(&[(a, 1.0)], &[(a, 0.5), (b, 0.5)]);

    let mut sim = Simulation::new(SimulationConfig {
        graph,
        catalog,
        modules: composed_modules(a, b, reversed),
        stepping: SteppingConfig {
            initial_step: 0.25,
            ..SteppingConfig::default()
        },
        negative_policy: NegativePolicy::Clamp,
        seed: 9,
    })
    .unwrap();

    for _ in 0..20 {
        sim.next_epoch().unwrap();
    }

    let mut out = Vec::new();
    for node in nodes {
        for entity in [a, b] {
            out.push(sim.concentration(node, CYTOPLASM, entity));
        }
    }
    out
}

#[test]
fn registration_order_does_not_change_the_result() {
    let forward = run_composed(false);
    let reversed = run_composed(true);
    for (f, r) in forward.iter().zip(&reversed) {
        assert!(
            (f - r).abs() < 1e-9,
            "order-dependent result: {f} vs {r}"
        );
    }
}

#[test]
fn assignment_tracks_inputs_every_accepted_epoch() {
    let mut catalog = EntityCatalog::new();
    let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
    let b = catalog.register("B", EntityKind::SmallMolecule).unwrap();
    let total = catalog.register("total", EntityKind::Complex).unwrap();
    let (graph, node, _) = single_node_graph(&[(a, 1.0)]);

    let reaction = ReactionModule::builder()
        .name("forward")
        .substrate(a, 1.0)
        .product(b, 1.0)
        .mass_action(0.5)
        .build();
    let sum = AssignmentModule::new(
        "sum",
        CellTopology::Inner,
        total,
        vec![a, b],
        Box::new(|inputs| inputs.iter().sum()),
    );

    let mut sim = Simulation::new(SimulationConfig {
        graph,
        catalog,
        modules: vec![Box::new(reaction), Box::new(sum)],
        stepping: SteppingConfig::default(),
        negative_policy: NegativePolicy::Clamp,
        seed: 0,
    })
    .unwrap();

    for _ in 0..10 {
        sim.next_epoch().unwrap();
        let a_now = sim.concentration(node, CYTOPLASM, a);
        let b_now = sim.concentration(node, CYTOPLASM, b);
        let total_now = sim.concentration(node, CYTOPLASM, total);
        assert!(
            (total_now - (a_now + b_now)).abs() < 1e-12,
            "assignment out of date: {total_now} vs {}",
            a_now + b_now
        );
    }
}

fn displacement_simulation(seed: u64) -> Simulation {
    let mut catalog = EntityCatalog::new();
    catalog.register("cargo", EntityKind::SmallMolecule).unwrap();

    let mut graph = AutomatonGraph::new();
    graph.add_node(osmos_test_utils::aqueous_region(), [0.0, 0.0]);
    graph.add_agent([0.5, 0.5], AgentState::Confined);

    let motion = DisplacementModule::new(
        "motion",
        0.02,
        AgentState::Confined,
        RegionBounds::new([0.0, 0.0], [1.0, 1.0]),
        0,
    );

    Simulation::new(SimulationConfig {
        graph,
        catalog,
        modules: vec![Box::new(motion)],
        stepping: SteppingConfig {
            initial_step: 0.05,
            ..SteppingConfig::default()
        },
        negative_policy: NegativePolicy::Clamp,
        seed,
    })
    .unwrap()
}

#[test]
fn displacement_is_deterministic_per_seed_and_confined() {
    let mut first = displacement_simulation(7);
    let mut second = displacement_simulation(7);
    let mut other = displacement_simulation(8);
    let agent = first.graph().agent_ids().next().unwrap();

    let bounds = RegionBounds::new([0.0, 0.0], [1.0, 1.0]);
    for _ in 0..12 {
        first.next_epoch().unwrap();
        second.next_epoch().unwrap();
        other.next_epoch().unwrap();

        let p1 = first.agent(agent).unwrap().position();
        let p2 = second.agent(agent).unwrap().position();
        assert_eq!(p1, p2, "same seed must replay identically");
        assert!(bounds.contains(p1), "agent escaped bounds: {p1:?}");
    }
    let p1 = first.agent(agent).unwrap().position();
    let p3 = other.agent(agent).unwrap().position();
    assert_ne!(p1, p3, "different seeds should decorrelate");
}
