//! Problem definition trait.
//!
//! This module defines the `Problem` trait, which represents a bounded
//! nonlinear least squares problem to be solved with the Levenberg-Marquardt
//! algorithm.

use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::lm::config::LmConfig;
use crate::parameters::Bounds;

/// A trait representing a bounded nonlinear least squares problem.
pub trait Problem: Sync {
    /// Evaluate the residuals at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Bounds of each parameter, in parameter order.
    ///
    /// Defaults to unbounded parameters.
    fn bounds(&self) -> Vec<Bounds> {
        vec![Bounds::unbounded(); self.parameter_count()]
    }

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// The default implementation uses bounded forward differences around
    /// the already-computed `residuals`.
    fn jacobian(
        &self,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
        config: &LmConfig,
    ) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, residuals, config)
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(sum_of_squares(&residuals))
    }
}

/// Sum of squared residuals.
pub fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r.powi(2)).sum()
}
