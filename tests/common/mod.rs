//! Shared fixtures for the integration tests.
//!
//! The synthetic evaluator is a smooth stand-in for an analytic reservoir
//! model with wellbore storage and skin:
//!
//! ```text
//! a = q·mu / (kf·h)
//! p = a·(ln(1 + t/cD) + S)
//! d = a·t / (t + cD)
//! ```
//!
//! `d` is the exact log-derivative of `p`.

#![allow(dead_code)]

use ndarray::Array1;
use std::sync::Arc;

use welltest_fit::{
    EvaluationError, ModelCurves, ModelEvaluator, ModelVariant, ObservedSeries, ParameterCatalog,
    ParameterMap,
};

/// The synthetic model as a [`ModelEvaluator`].
pub struct SyntheticEvaluator;

impl ModelEvaluator for SyntheticEvaluator {
    fn evaluate(
        &self,
        variant: ModelVariant,
        params: &ParameterMap,
        times: &[f64],
    ) -> Result<ModelCurves, EvaluationError> {
        if variant == ModelVariant::Unrecognized {
            return Err(EvaluationError::UnsupportedVariant(variant));
        }
        let get = |key: &str| {
            params
                .get(key)
                .copied()
                .ok_or_else(|| EvaluationError::Failed(format!("missing parameter {}", key)))
        };
        let a = get("q")? * get("mu")? / (get("kf")? * get("h")?);
        let cd = get("cD")?;
        let skin = get("S")?;

        let time = Array1::from_vec(times.to_vec());
        let pressure = time.mapv(|t| a * ((1.0 + t / cd).ln() + skin));
        let derivative = time.mapv(|t| a * t / (t + cd));
        ModelCurves::new(time, pressure, derivative)
    }
}

pub fn evaluator() -> Arc<dyn ModelEvaluator> {
    Arc::new(SyntheticEvaluator)
}

/// Values the synthetic data are generated from.
pub const TRUE_KF: f64 = 2.5;
pub const TRUE_CD: f64 = 0.8;
pub const TRUE_S: f64 = 1.5;

/// `n` log-spaced times between `start` and `end`.
pub fn log_times(n: usize, start: f64, end: f64) -> Vec<f64> {
    let (l0, l1) = (start.ln(), end.ln());
    (0..n)
        .map(|i| (l0 + (l1 - l0) * i as f64 / (n - 1) as f64).exp())
        .collect()
}

/// Catalog at the true values with only `free` marked for fitting.
pub fn true_catalog(free: &[&str]) -> ParameterCatalog {
    let mut catalog = ParameterCatalog::default();
    let set = catalog.get_mut();
    set.set_value("kf", TRUE_KF).unwrap();
    set.set_value("cD", TRUE_CD).unwrap();
    set.set_value("S", TRUE_S).unwrap();
    let names: Vec<String> = set.names().iter().map(|s| s.to_string()).collect();
    for name in &names {
        set.set_fit(name, free.contains(&name.as_str())).unwrap();
    }
    catalog
}

/// Noise-free observed data generated at the true values.
pub fn synthetic_series(n: usize) -> ObservedSeries {
    let catalog = true_catalog(&[]);
    let times = log_times(n, 0.01, 100.0);
    let curves = SyntheticEvaluator
        .evaluate(catalog.variant(), &catalog.get().to_map(), &times)
        .unwrap();
    ObservedSeries::with_derivative(times, curves.pressure.to_vec(), curves.derivative.to_vec())
        .unwrap()
}

/// Catalog moved away from the true values, with kf, cD and S free.
pub fn perturbed_catalog() -> ParameterCatalog {
    let mut catalog = true_catalog(&["kf", "cD", "S"]);
    let set = catalog.get_mut();
    set.set_value("kf", 1.8).unwrap();
    set.set_value("cD", 1.3).unwrap();
    set.set_value("S", 0.5).unwrap();
    catalog
}
