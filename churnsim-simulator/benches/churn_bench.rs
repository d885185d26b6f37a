#[macro_use]
extern crate criterion;

use std::time::Duration;

use criterion::{black_box, BatchSize, Criterion};
use churnsim_config::{ChurnMode, ChurnsimConfig, DeviceType};
use churnsim_core::random::SeededRandomSource;
use churnsim_simulator::churn::ChurnModel;
use churnsim_simulator::{ChurnScheduler, Topology};

/// Cost of a single node decision, draws included.
fn benchmark_decide(c: &mut Criterion) {
    let model = ChurnModel::default();
    let mut rng = SeededRandomSource::new(42);

    c.bench_function("churn_decide", |b| {
        b.iter(|| black_box(model.decide(&mut rng)))
    });
}

/// One full pass over a large wired topology.
fn benchmark_pass(c: &mut Criterion) {
    let node_count = 10_000;
    let mut config = ChurnsimConfig::default();
    config.topology.node_count = node_count;
    config.topology.device = DeviceType::Csma;
    config.churn.mode = ChurnMode::DynamicRecurring;

    c.bench_function("churn_pass_10k", |b| {
        b.iter_batched(
            || {
                let topology = Topology::build(&config.topology);
                let devices = topology
                    .device_list(config.churn.exclusion_count..node_count)
                    .unwrap();
                let churn =
                    ChurnScheduler::new(&config.churn, config.simulation.seed, node_count, devices)
                        .unwrap();
                (topology, churn)
            },
            |(_topology, mut churn)| {
                let churned = churn.run_pass(Duration::ZERO).unwrap().churned_nodes;
                black_box(churned)
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, benchmark_decide, benchmark_pass);
criterion_main!(benches);
