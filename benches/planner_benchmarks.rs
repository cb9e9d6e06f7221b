use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use notebook_planner::{InMemoryNamespace, OptimizerConfig, Planner, PlannerConfig, Value};

fn run_cells(namespace: &InMemoryNamespace, planner: &mut Planner, cell_count: usize) {
    for i in 0..cell_count {
        planner.pre_run_cell_update(namespace);
        namespace.bind(format!("v{i}"), Value::Int(i as i64));
        planner.post_run_cell_update(namespace, format!("v{i} = {i}"), 0.001);
    }
}

fn benchmark_post_run_cell_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_run_cell_update");

    for cell_count in [10usize, 100, 500] {
        group.bench_with_input(
            BenchmarkId::new("sequential_int_bindings", cell_count),
            &cell_count,
            |b, &cell_count| {
                b.iter(|| {
                    let ns = InMemoryNamespace::new();
                    let mut planner =
                        Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());
                    run_cells(&ns, &mut planner, black_box(cell_count));
                })
            },
        );
    }

    group.finish();
}

fn benchmark_checkpoint_restore_plans(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_checkpoint_restore_plans");

    for cell_count in [10usize, 100, 500] {
        group.bench_with_input(
            BenchmarkId::new("flat_variable_graph", cell_count),
            &cell_count,
            |b, &cell_count| {
                let ns = InMemoryNamespace::new();
                let mut planner =
                    Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());
                run_cells(&ns, &mut planner, cell_count);
                let store = notebook_planner::NullValueStore;

                b.iter(|| {
                    let _ = planner.generate_checkpoint_restore_plans(
                        black_box(&ns),
                        &store,
                        "bench-commit",
                        &[],
                    );
                })
            },
        );
    }

    group.finish();
}

fn benchmark_aliased_namespace(c: &mut Criterion) {
    let mut group = c.benchmark_group("aliased_namespace");

    group.bench_function("shared_list_across_50_names", |b| {
        b.iter(|| {
            let ns = InMemoryNamespace::new();
            let mut planner =
                Planner::new(&ns, PlannerConfig::default(), OptimizerConfig::default());

            planner.pre_run_cell_update(&ns);
            let shared = Value::list((0..100).map(Value::Int).collect());
            for i in 0..50 {
                ns.bind(format!("alias{i}"), shared.clone());
            }
            planner.post_run_cell_update(&ns, black_box("aliasing setup"), 0.01);
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_post_run_cell_update,
    benchmark_checkpoint_restore_plans,
    benchmark_aliased_namespace
);
criterion_main!(benches);
