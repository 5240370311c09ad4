//! Isolation overhead benchmarks.
//!
//! Measures the per-test cost of each sandbox backend on a suite of trivial
//! passing tests, so the difference is dominated by isolation itself.

use std::io;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gg_testbed::report::{ReportConfig, Reporter};
use gg_testbed::sandbox::{create_sandbox, IsolationMode, SandboxConfig};
use gg_testbed::{require_eq, Registry, Runner, Suite};

fn trivial_suite(tests: usize) -> Suite {
    let mut registry = Registry::new();
    let fixture = registry
        .register_fixture::<Vec<u64>>("bench")
        .expect("fixture registers");
    registry
        .override_setup(fixture, |v: &mut Vec<u64>| v.extend(0..16))
        .expect("setup override");
    for i in 0..tests {
        registry
            .test(fixture, format!("sum_{}", i), |v: &mut Vec<u64>| {
                require_eq!(v.iter().sum::<u64>(), 120);
            })
            .expect("test registers");
    }
    registry.seal()
}

fn runner(mode: IsolationMode) -> Runner<io::Sink> {
    let sandbox = create_sandbox(SandboxConfig {
        mode,
        timeout: None,
    });
    let reporter = Reporter::new(
        io::sink(),
        ReportConfig {
            monochrome: true,
            ..Default::default()
        },
    );
    Runner::new(sandbox, reporter)
}

fn bench_isolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("isolation");
    group.sample_size(20);

    for tests in [1usize, 16] {
        let suite = trivial_suite(tests);
        group.throughput(Throughput::Elements(tests as u64));

        for mode in [IsolationMode::Inline, IsolationMode::Fork] {
            group.bench_with_input(
                BenchmarkId::new(mode.to_string(), tests),
                &suite,
                |b, suite| {
                    let mut runner = runner(mode);
                    b.iter(|| black_box(runner.run(suite).expect("run completes")))
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_isolation);
criterion_main!(benches);
