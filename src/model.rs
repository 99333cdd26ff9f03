//! Boundary to the analytic reservoir models.
//!
//! The model formulas themselves live outside this crate. Anything that can
//! turn a variant, a full parameter map and a vector of times into pressure
//! and derivative curves can drive a fit by implementing [`ModelEvaluator`].

use ndarray::Array1;
use thiserror::Error;

use crate::parameters::{ModelVariant, ParameterMap};

/// Errors an evaluator may report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The evaluator has no formulation for this variant.
    #[error("unsupported model variant '{0}'")]
    UnsupportedVariant(ModelVariant),

    /// The returned curves do not match the requested times.
    #[error("expected {expected} points, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Evaluation failed for this particular parameter vector.
    #[error("{0}")]
    Failed(String),
}

/// Predicted pressure and log-derivative at a set of times.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCurves {
    pub time: Array1<f64>,
    pub pressure: Array1<f64>,
    pub derivative: Array1<f64>,
}

impl ModelCurves {
    /// Bundle curves, checking that all three have the same length.
    pub fn new(
        time: Array1<f64>,
        pressure: Array1<f64>,
        derivative: Array1<f64>,
    ) -> Result<Self, EvaluationError> {
        let expected = time.len();
        for got in [pressure.len(), derivative.len()] {
            if got != expected {
                return Err(EvaluationError::LengthMismatch { expected, got });
            }
        }
        Ok(Self {
            time,
            pressure,
            derivative,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// A pure, deterministic reservoir-model function.
///
/// Implementations must return curves of the same length as `times` and
/// must be safe to call from a background thread.
pub trait ModelEvaluator: Send + Sync {
    /// Evaluate pressure and derivative for `variant` at `times`.
    fn evaluate(
        &self,
        variant: ModelVariant,
        params: &ParameterMap,
        times: &[f64],
    ) -> Result<ModelCurves, EvaluationError>;

    /// Whether this evaluator has a formulation for `variant`.
    fn supports(&self, variant: ModelVariant) -> bool {
        variant != ModelVariant::Unrecognized
    }
}

impl<F> ModelEvaluator for F
where
    F: Fn(ModelVariant, &ParameterMap, &[f64]) -> Result<ModelCurves, EvaluationError> + Send + Sync,
{
    fn evaluate(
        &self,
        variant: ModelVariant,
        params: &ParameterMap,
        times: &[f64],
    ) -> Result<ModelCurves, EvaluationError> {
        self(variant, params, times)
    }
}
