//! Epoch-loop benchmarks: compute fan-out, error estimation, commit.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use osmos_core::{EntityCatalog, EntityKind, FeatureKind};
use osmos_engine::{Simulation, SimulationConfig, SteppingConfig};
use osmos_graph::{AutomatonGraph, CellTopology};
use osmos_module::NegativePolicy;
use osmos_modules::{DiffusionModule, ReactionModule};
use osmos_test_utils::{aqueous_region, CYTOPLASM};

fn chain_simulation(nodes: usize) -> Simulation {
    let mut catalog = EntityCatalog::new();
    let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
    let p = catalog.register("P", EntityKind::SmallMolecule).unwrap();
    catalog.set_feature(a, FeatureKind::Diffusivity, 0.1).unwrap();

    let mut graph = AutomatonGraph::new();
    let region = aqueous_region();
    let ids: Vec<_> = (0..nodes)
        .map(|i| graph.add_node(region.clone(), [i as f64, 0.0]))
        .collect();
    for pair in ids.windows(2) {
        graph.connect(pair[0], pair[1]).unwrap();
    }
    graph
        .node_mut(ids[0])
        .unwrap()
        .concentrations_mut()
        .initialize(CYTOPLASM, a, 1.0)
        .unwrap();

    let reaction = ReactionModule::builder()
        .name("decay")
        .substrate(a, 1.0)
        .product(p, 1.0)
        .mass_action(0.5)
        .build();
    let diffusion = DiffusionModule::new("diffusion", CellTopology::Inner, vec![a]);

    Simulation::new(SimulationConfig {
        graph,
        catalog,
        modules: vec![Box::new(reaction), Box::new(diffusion)],
        stepping: SteppingConfig {
            initial_step: 0.05,
            ..SteppingConfig::default()
        },
        negative_policy: NegativePolicy::Clamp,
        seed: 42,
    })
    .unwrap()
}

fn bench_next_epoch(c: &mut Criterion) {
    for nodes in [16usize, 256] {
        c.bench_function(&format!("next_epoch/chain_{nodes}"), |b| {
            b.iter_batched_ref(
                || chain_simulation(nodes),
                |sim| {
                    sim.next_epoch().unwrap();
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_next_epoch);
criterion_main!(benches);
