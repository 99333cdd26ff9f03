//! Benchmarks for the log-derivative and a synthetic fit.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use std::sync::Arc;

use welltest_fit::{
    log_derivative, LevenbergMarquardt, ModelCurves, ModelEvaluator, ModelVariant, ObservedSeries,
    ParameterCatalog, ParameterMap, WellTestProblem,
};

/// p = a·(ln(1 + t/cD) + S) with a = q·mu/(kf·h)
fn evaluator() -> Arc<dyn ModelEvaluator> {
    Arc::new(|_: ModelVariant, p: &ParameterMap, t: &[f64]| {
        let a = p["q"] * p["mu"] / (p["kf"] * p["h"]);
        let (cd, skin) = (p["cD"], p["S"]);
        let time = Array1::from_vec(t.to_vec());
        let pressure = time.mapv(|t| a * ((1.0 + t / cd).ln() + skin));
        let derivative = time.mapv(|t| a * t / (t + cd));
        ModelCurves::new(time, pressure, derivative)
    })
}

fn log_times(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 10f64.powf(-2.0 + 4.0 * i as f64 / (n - 1) as f64))
        .collect()
}

fn bench_log_derivative(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_derivative");
    for n in [100, 1_000, 10_000] {
        let time = log_times(n);
        let pressure: Vec<f64> = time.iter().map(|t| (1.0 + t).ln()).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| log_derivative(black_box(&time), black_box(&pressure)))
        });
    }
    group.finish();
}

fn bench_synthetic_fit(c: &mut Criterion) {
    let mut truth = ParameterCatalog::default();
    truth.get_mut().set_value("kf", 2.5).unwrap();
    truth.get_mut().set_value("cD", 0.8).unwrap();
    truth.get_mut().set_value("S", 1.5).unwrap();

    let evaluator = evaluator();
    let mut group = c.benchmark_group("synthetic_fit");
    for n in [50, 500] {
        let times = log_times(n);
        let curves = evaluator
            .evaluate(truth.variant(), &truth.get().to_map(), &times)
            .unwrap();
        let observed = Arc::new(
            ObservedSeries::with_derivative(times, curves.pressure.to_vec(), curves.derivative.to_vec())
                .unwrap(),
        );

        let mut start = truth.clone();
        for (name, value) in [("kf", 1.8), ("cD", 1.3), ("S", 0.5)] {
            start.get_mut().set_value(name, value).unwrap();
            start.get_mut().set_fit(name, true).unwrap();
        }
        let problem = WellTestProblem::new(
            Arc::clone(&evaluator),
            start.variant(),
            start.get(),
            observed,
            0.5,
        )
        .unwrap();

        for parallel in [false, true] {
            let optimizer = LevenbergMarquardt::new().with_parallel_jacobian(parallel);
            let id = format!("{}{}", n, if parallel { "/parallel" } else { "" });
            group.bench_function(id, |b| {
                b.iter(|| optimizer.minimize(&problem, problem.initial_params()).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_log_derivative, bench_synthetic_fit);
criterion_main!(benches);
