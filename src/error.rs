use thiserror::Error;

use crate::model::EvaluationError;
use crate::parameters::bounds::BoundsError;
use crate::parameters::variant::ModelVariant;

/// Error types for the welltest-fit library.
#[derive(Error, Debug)]
pub enum FitError {
    /// Invalid input data (observed series, weight, configuration).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for malformed parameter bounds.
    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    /// The model evaluator does not know the requested variant.
    #[error("Model variant '{0}' is not supported by the evaluator")]
    UnsupportedVariant(ModelVariant),

    /// The model evaluator failed for a particular parameter vector.
    #[error("Model evaluation failed: {0}")]
    ModelEvaluation(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// The background fit worker panicked before reporting a result.
    #[error("Fit worker panicked")]
    WorkerPanicked,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FitError {
    /// Returns true for errors that invalidate the whole run rather than a
    /// single optimizer step.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            FitError::UnsupportedVariant(_)
                | FitError::DimensionMismatch(_)
                | FitError::InvalidInput(_)
        )
    }
}

impl From<EvaluationError> for FitError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::UnsupportedVariant(variant) => FitError::UnsupportedVariant(variant),
            EvaluationError::LengthMismatch { expected, got } => FitError::ModelEvaluation(
                format!("evaluator returned {} points for {} times", got, expected),
            ),
            EvaluationError::Failed(message) => FitError::ModelEvaluation(message),
        }
    }
}

/// Result type alias for welltest-fit operations.
pub type Result<T> = std::result::Result<T, FitError>;
