//! Termination states and convergence criteria.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::LmConfig;

/// State of an optimization run. Every state but `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The error or step size stopped improving meaningfully.
    Converged,

    /// The iteration cap was reached.
    MaxIterationsReached,

    /// Cancellation was requested.
    Cancelled,

    /// Damping escalation ran out without an acceptable step.
    NumericalFailure,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated.
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged)
    }

    /// Returns a description of the status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::Converged => "Converged",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::Cancelled => "Terminated: cancelled",
            ConvergenceStatus::NumericalFailure => "Terminated: numerical failure",
        }
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Criteria for deciding that a run has converged.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceCriteria {
    /// Tolerance for the step relative to parameter scale.
    pub xtol: f64,

    /// Tolerance for the relative change in error.
    pub ftol: f64,

    /// Tolerance for the gradient infinity norm.
    pub gtol: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self::from_config(&LmConfig::default())
    }
}

impl ConvergenceCriteria {
    pub fn from_config(config: &LmConfig) -> Self {
        Self {
            xtol: config.xtol,
            ftol: config.ftol,
            gtol: config.gtol,
        }
    }

    /// `|Jᵀr|∞` is below `gtol`: the current point is stationary.
    pub fn gradient_converged(&self, gradient: &Array1<f64>) -> bool {
        gradient.iter().fold(0.0_f64, |m, g| m.max(g.abs())) <= self.gtol
    }

    /// Every component of `step` is negligible relative to its parameter.
    pub fn step_negligible(&self, params: &Array1<f64>, step: &Array1<f64>) -> bool {
        params
            .iter()
            .zip(step.iter())
            .all(|(p, s)| s.abs() <= self.xtol * (p.abs() + self.xtol))
    }

    /// The relative error improvement of an accepted step is below `ftol`.
    pub fn error_converged(&self, cost: f64, new_cost: f64) -> bool {
        new_cost == 0.0 || (cost - new_cost) <= self.ftol * cost
    }

    /// Convergence test applied after an accepted step.
    ///
    /// Returns a message describing the criterion that fired, if any.
    pub fn check_accepted(
        &self,
        params: &Array1<f64>,
        step: &Array1<f64>,
        cost: f64,
        new_cost: f64,
    ) -> Option<String> {
        if self.error_converged(cost, new_cost) {
            return Some(format!(
                "relative error change {:.2e} below {:.2e}",
                if cost > 0.0 { (cost - new_cost) / cost } else { 0.0 },
                self.ftol
            ));
        }
        if self.step_negligible(params, step) {
            return Some(format!("step below relative tolerance {:.2e}", self.xtol));
        }
        None
    }
}
