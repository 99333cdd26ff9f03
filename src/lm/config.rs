//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the tolerances, damping schedule and finite-difference
//! settings used by [`LevenbergMarquardt`](super::LevenbergMarquardt).

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of accepted iterations. Default: 100
    pub max_iterations: usize,

    /// Tolerance for the relative improvement of the error. Default: 1e-8
    pub ftol: f64,

    /// Tolerance for the step size relative to parameter scale. Default: 1e-8
    pub xtol: f64,

    /// Tolerance for the gradient infinity norm. Default: 1e-10
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e10
    pub max_lambda: f64,

    /// Rejected steps allowed within one iteration. Default: 16
    pub max_damping_escalations: usize,

    /// Relative finite-difference step. Default: 1e-6
    pub jacobian_rel_step: f64,

    /// Absolute floor of the finite-difference step. Default: 1e-8
    pub jacobian_min_step: f64,

    /// Evaluate Jacobian columns on the rayon thread pool. Default: false
    pub parallel_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e10,
            max_damping_escalations: 16,
            jacobian_rel_step: 1e-6,
            jacobian_min_step: 1e-8,
            parallel_jacobian: false,
        }
    }
}

impl LmConfig {
    /// Check that the settings describe a usable damping schedule.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("ftol", self.ftol),
            ("xtol", self.xtol),
            ("initial_lambda", self.initial_lambda),
            ("min_lambda", self.min_lambda),
            ("max_lambda", self.max_lambda),
            ("jacobian_rel_step", self.jacobian_rel_step),
            ("jacobian_min_step", self.jacobian_min_step),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(FitError::InvalidInput(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if !(self.gtol >= 0.0) {
            return Err(FitError::InvalidInput(format!(
                "gtol must be non-negative, got {}",
                self.gtol
            )));
        }
        if !(self.lambda_up_factor > 1.0) {
            return Err(FitError::InvalidInput(format!(
                "lambda_up_factor must exceed 1, got {}",
                self.lambda_up_factor
            )));
        }
        if !(self.lambda_down_factor > 0.0 && self.lambda_down_factor < 1.0) {
            return Err(FitError::InvalidInput(format!(
                "lambda_down_factor must lie in (0, 1), got {}",
                self.lambda_down_factor
            )));
        }
        if self.min_lambda > self.max_lambda {
            return Err(FitError::InvalidInput(format!(
                "min_lambda ({}) exceeds max_lambda ({})",
                self.min_lambda, self.max_lambda
            )));
        }
        if self.max_iterations == 0 {
            return Err(FitError::InvalidInput(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
