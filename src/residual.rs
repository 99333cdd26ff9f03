//! Weighted residual function for one fit run.
//!
//! [`WellTestProblem`] binds a model evaluator, a model variant, the
//! observed series and the free/fixed split of a parameter set into a
//! [`Problem`] over the free parameters only.
//!
//! The residual vector has `2n` entries for `n` observed points:
//!
//! ```text
//! r = [ w·(p_model − p_obs) ; (1 − w)·(d_model − d_obs) ]
//! ```
//!
//! so `w = 1` ignores the derivative and `w = 0` ignores the pressure.

use ndarray::{concatenate, Array1, Axis};
use std::sync::Arc;

use crate::derivative::ObservedSeries;
use crate::error::{FitError, Result};
use crate::model::{ModelCurves, ModelEvaluator};
use crate::parameters::{Bounds, ModelVariant, ParameterMap, ParameterSet};
use crate::problem::Problem;

/// The ResidualFunction of a single fit run.
#[derive(Clone)]
pub struct WellTestProblem {
    evaluator: Arc<dyn ModelEvaluator>,
    variant: ModelVariant,
    observed: Arc<ObservedSeries>,
    times: Vec<f64>,
    free_names: Vec<String>,
    free_bounds: Vec<Bounds>,
    initial: Array1<f64>,
    fixed: ParameterMap,
    weight: f64,
}

impl WellTestProblem {
    /// Build the residual function for `params` against `observed`.
    ///
    /// Fails with `InvalidInput` for an empty series or a weight outside
    /// `[0, 1]`, and with `UnsupportedVariant` when the evaluator has no
    /// formulation for `variant`.
    pub fn new(
        evaluator: Arc<dyn ModelEvaluator>,
        variant: ModelVariant,
        params: &ParameterSet,
        observed: Arc<ObservedSeries>,
        weight: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(FitError::InvalidInput(format!(
                "weight must lie in [0, 1], got {}",
                weight
            )));
        }
        if observed.is_empty() {
            return Err(FitError::InvalidInput(
                "observed series has no points".to_string(),
            ));
        }
        if !evaluator.supports(variant) {
            return Err(FitError::UnsupportedVariant(variant));
        }

        let (free_names, free_bounds) = params.free_bounds().into_iter().unzip();
        let initial = params.free().map(|p| p.value()).collect();

        Ok(Self {
            evaluator,
            variant,
            times: observed.time().to_vec(),
            observed,
            free_names,
            free_bounds,
            initial,
            fixed: params.fixed_map(),
            weight,
        })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn observed(&self) -> &ObservedSeries {
        &self.observed
    }

    /// Names of the free parameters, in Jacobian column order.
    pub fn free_names(&self) -> &[String] {
        &self.free_names
    }

    /// Free parameter values at the start of the run.
    pub fn initial_params(&self) -> Array1<f64> {
        self.initial.clone()
    }

    /// Merge free values with the fixed parameters.
    pub fn full_map(&self, free_values: &Array1<f64>) -> ParameterMap {
        let mut map = self.fixed.clone();
        for (name, value) in self.free_names.iter().zip(free_values.iter()) {
            map.insert(name.clone(), *value);
        }
        map
    }

    /// Model curves at the observed times for the given free values.
    pub fn curves(&self, free_values: &Array1<f64>) -> Result<ModelCurves> {
        let map = self.full_map(free_values);
        let curves = self.evaluator.evaluate(self.variant, &map, &self.times)?;
        if curves.len() != self.times.len() {
            return Err(FitError::ModelEvaluation(format!(
                "evaluator returned {} points for {} times",
                curves.len(),
                self.times.len()
            )));
        }
        Ok(curves)
    }

    /// Weighted residual vector for curves returned by [`Self::curves`].
    fn residuals_for(&self, curves: &ModelCurves) -> Array1<f64> {
        let w = self.weight;
        let pressure = (&curves.pressure - self.observed.pressure()) * w;
        let derivative = (&curves.derivative - self.observed.derivative()) * (1.0 - w);
        concatenate![Axis(0), pressure, derivative]
    }
}

impl Problem for WellTestProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let curves = self.curves(params)?;
        Ok(self.residuals_for(&curves))
    }

    fn parameter_count(&self) -> usize {
        self.free_names.len()
    }

    fn residual_count(&self) -> usize {
        2 * self.observed.len()
    }

    fn bounds(&self) -> Vec<Bounds> {
        self.free_bounds.clone()
    }
}
