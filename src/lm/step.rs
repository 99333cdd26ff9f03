//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! The damped normal equations `(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr` are formed
//! once per iteration and re-solved for each trial damping factor.

use ndarray::{Array1, Array2};

use crate::error::{FitError, Result};
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

/// Floor applied to diagonal entries before scaling by λ, so parameters
/// with no influence still get a positive pivot.
const MIN_DIAGONAL: f64 = 1e-10;

/// `JᵀJ` and `Jᵀr` at the current parameters.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    jtj: Array2<f64>,
    jtr: Array1<f64>,
}

impl NormalEquations {
    /// Form the normal equations from a Jacobian and residual vector.
    pub fn new(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> Result<Self> {
        if jacobian.nrows() != residuals.len() {
            return Err(FitError::DimensionMismatch(format!(
                "Jacobian has {} rows for {} residuals",
                jacobian.nrows(),
                residuals.len()
            )));
        }
        Ok(Self {
            jtj: jacobian.t().dot(jacobian),
            jtr: jacobian.t().dot(residuals),
        })
    }

    /// Gradient of `½|r|²`, i.e. `Jᵀr`.
    pub fn gradient(&self) -> &Array1<f64> {
        &self.jtr
    }

    /// Solve the damped system for `lambda` and return the step `δ`.
    ///
    /// A system that cannot be factorized, or whose solution is not finite,
    /// yields [`FitError::SingularMatrix`].
    pub fn solve(&self, lambda: f64) -> Result<Array1<f64>> {
        let n = self.jtj.nrows();
        let mut augmented = self.jtj.clone();
        for i in 0..n {
            augmented[[i, i]] += lambda * augmented[[i, i]].max(MIN_DIAGONAL);
        }

        let a = ndarray_to_nalgebra(&augmented);
        let b = ndarray_vec_to_nalgebra(&-&self.jtr);

        // Cholesky first; LU picks up systems that lost definiteness to rounding
        let x = match a.clone().cholesky() {
            Some(chol) => chol.solve(&b),
            None => a.lu().solve(&b).ok_or(FitError::SingularMatrix)?,
        };

        let step = nalgebra_vec_to_ndarray(&x);
        if step.iter().any(|v| !v.is_finite()) {
            return Err(FitError::SingularMatrix);
        }
        Ok(step)
    }
}
