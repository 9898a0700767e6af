//! Criterion benchmarks for batchsim_core sweeps and batches
//!
//! Run with: cargo bench -p batchsim_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use batchsim_core::{
    Assignment, Design, Engine, EngineError, EngineOptions, MemorySink, Model, OrthogonalSweep,
    OutputField, OutputSelection, OutputValue, Outputs, ParameterSpace, RandomSampleGenerator,
    RunOptions, SampleDomain, SampleSpace, SimulationRunner,
};

/// Sums the numeric inputs of each run
struct SumEngine;

struct SumModel;

impl Engine for SumEngine {
    type Model = SumModel;

    fn configure(
        &self,
        _options: &EngineOptions,
        _selection: &OutputSelection,
    ) -> Result<SumModel, EngineError> {
        Ok(SumModel)
    }
}

impl Model for SumModel {
    fn required_inputs(&self) -> Vec<String> {
        Vec::new()
    }

    fn output_fields(&self) -> Vec<OutputField> {
        vec![OutputField::new("sum", "Sum", "")]
    }

    fn compute(&self, assignment: &Assignment) -> Result<Outputs, EngineError> {
        let sum: f64 = assignment.values().filter_map(|v| v.as_f64()).sum();
        Ok(Outputs::new().with("sum", OutputValue::plain(sum, "")))
    }
}

fn create_space(dims: usize, values_per_dim: usize) -> ParameterSpace {
    let mut space = ParameterSpace::new();
    for d in 0..dims {
        let values: Vec<f64> = (0..values_per_dim).map(|i| (d * 100 + i) as f64).collect();
        space
            .add(format!("dim{d}"), values)
            .expect("benchmark space is valid");
    }
    space
}

fn bench_sweep_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_iteration");

    for dims in [2usize, 4, 6].iter() {
        let space = create_space(*dims, 6);
        let sweep = OrthogonalSweep::new(&space, u64::MAX).expect("sweep fits");

        group.bench_with_input(BenchmarkId::new("dims", dims), dims, |b, _| {
            b.iter(|| sweep.iter().map(|a| black_box(a).len()).sum::<usize>())
        });
    }

    group.finish();
}

fn bench_sweep_decode(c: &mut Criterion) {
    let space = create_space(5, 10);
    let sweep = OrthogonalSweep::new(&space, u64::MAX).expect("sweep fits");

    c.bench_function("sweep_decode_random_access", |b| {
        b.iter(|| sweep.decode(black_box(54_321)))
    });
}

fn bench_random_draws(c: &mut Criterion) {
    let space = SampleSpace::new()
        .with("fuel", SampleDomain::Choice(vec!["gr1".into(), "gr2".into()]))
        .and_then(|s| s.with("wind", SampleDomain::Continuous { min: 0.0, max: 30.0 }))
        .and_then(|s| s.with("slope", SampleDomain::Discrete { min: 0.0, max: 60.0 }))
        .expect("benchmark space is valid");

    c.bench_function("random_draw_1000", |b| {
        b.iter(|| {
            let mut generator = RandomSampleGenerator::seeded(&space, 42);
            generator.samples(1000).count()
        })
    });
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    let design = Design::Orthogonal(create_space(4, 8));
    let engine = SumEngine;

    group.bench_function("sequential", |b| {
        let runner = SimulationRunner::new(&engine).with_options(RunOptions::sequential());
        b.iter(|| {
            let mut sink = MemorySink::new();
            runner
                .run(
                    black_box(&design),
                    &EngineOptions::new(),
                    &OutputSelection::new(),
                    &mut sink,
                )
                .expect("batch runs")
        })
    });

    group.bench_function("parallel", |b| {
        let runner = SimulationRunner::new(&engine).with_options(RunOptions::default());
        b.iter(|| {
            let mut sink = MemorySink::new();
            runner
                .run(
                    black_box(&design),
                    &EngineOptions::new(),
                    &OutputSelection::new(),
                    &mut sink,
                )
                .expect("batch runs")
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sweep_iteration,
    bench_sweep_decode,
    bench_random_draws,
    bench_batch,
);
criterion_main!(benches);
