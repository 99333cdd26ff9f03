//! Bounded finite-difference Jacobian.
//!
//! Each column is a forward (or, at the upper bound, backward) difference of
//! the residual vector with respect to one parameter. Perturbed points never
//! leave the parameter's `[min, max]` interval.

use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::error::{FitError, Result};
use crate::lm::config::LmConfig;
use crate::parameters::Bounds;
use crate::problem::Problem;

/// Signed perturbation for one parameter.
///
/// The step is `rel_step * |value|` with a floor of `min_step`, pointing
/// upward unless that would cross `max`. Returns 0 when the interval is
/// degenerate.
pub fn perturbation(value: f64, bounds: &Bounds, rel_step: f64, min_step: f64) -> f64 {
    let h = (value.abs() * rel_step).max(min_step);
    if value + h <= bounds.max {
        return h;
    }
    if value - h >= bounds.min {
        return -h;
    }

    // Interval narrower than the step: use the roomier side
    let up = bounds.max - value;
    let down = value - bounds.min;
    if up >= down {
        up
    } else {
        -down
    }
}

/// Compute the Jacobian matrix of `problem` at `params`.
///
/// `residuals` must be the residual vector at `params`. Columns follow the
/// parameter order; a parameter pinned by a degenerate interval gets a zero
/// column. With `config.parallel_jacobian` the columns are evaluated on the
/// rayon thread pool.
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    config: &LmConfig,
) -> Result<Array2<f64>> {
    let n_params = params.len();
    let n_residuals = residuals.len();
    let bounds = problem.bounds();

    if bounds.len() != n_params {
        return Err(FitError::DimensionMismatch(format!(
            "{} bounds for {} parameters",
            bounds.len(),
            n_params
        )));
    }

    let column = |j: usize| -> Result<Array1<f64>> {
        let h = perturbation(
            params[j],
            &bounds[j],
            config.jacobian_rel_step,
            config.jacobian_min_step,
        );
        let target = bounds[j].clamp(params[j] + h);
        let step = target - params[j];
        if step == 0.0 {
            return Ok(Array1::zeros(n_residuals));
        }

        let mut perturbed = params.clone();
        perturbed[j] = target;
        let r = problem.eval(&perturbed)?;
        if r.len() != n_residuals {
            return Err(FitError::ModelEvaluation(format!(
                "expected {} residuals, got {}",
                n_residuals,
                r.len()
            )));
        }
        Ok((&r - residuals) / step)
    };

    let columns: Vec<Array1<f64>> = if config.parallel_jacobian {
        (0..n_params).into_par_iter().map(column).collect::<Result<_>>()?
    } else {
        (0..n_params).map(column).collect::<Result<_>>()?
    };

    let mut jac = Array2::zeros((n_residuals, n_params));
    for (j, col) in columns.iter().enumerate() {
        jac.column_mut(j).assign(col);
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // r1 = x^2 - 1, r2 = y^2 - 2, with x confined to [0, 2]
    struct TestProblem;

    impl Problem for TestProblem {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            let x = params[0];
            let y = params[1];
            Ok(array![x.powi(2) - 1.0, y.powi(2) - 2.0])
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            2
        }

        fn bounds(&self) -> Vec<Bounds> {
            vec![Bounds::new(0.0, 2.0).unwrap(), Bounds::unbounded()]
        }
    }

    #[test]
    fn test_perturbation_direction() {
        let b = Bounds::new(0.0, 1.0).unwrap();
        assert!(perturbation(0.5, &b, 1e-6, 1e-8) > 0.0);
        // At the upper bound the step reflects downward
        let h = perturbation(1.0, &b, 1e-6, 1e-8);
        assert!(h < 0.0);
        assert!(1.0 + h >= 0.0);
        // Near-zero values use the floor
        assert_eq!(perturbation(0.0, &b, 1e-6, 1e-8), 1e-8);
        // Degenerate interval
        let pinned = Bounds::new(3.0, 3.0).unwrap();
        assert_eq!(perturbation(3.0, &pinned, 1e-6, 1e-8), 0.0);
        // Interval narrower than the step
        let narrow = Bounds::new(0.0, 1e-9).unwrap();
        let h = perturbation(2e-10, &narrow, 1e-6, 1e-8);
        assert!(h > 0.0 && h < 1e-9);
    }

    #[test]
    fn test_jacobian() {
        let params = array![1.5, 3.0];
        let problem = TestProblem;
        let residuals = problem.eval(&params).unwrap();
        let config = LmConfig::default();

        let jac = jacobian(&problem, &params, &residuals, &config).unwrap();
        assert_eq!(jac.shape(), &[2, 2]);
        assert_relative_eq!(jac[[0, 0]], 3.0, epsilon = 1e-4);
        assert_relative_eq!(jac[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(jac[[1, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(jac[[1, 1]], 6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_jacobian_at_upper_bound() {
        let params = array![2.0, 1.0];
        let problem = TestProblem;
        let residuals = problem.eval(&params).unwrap();

        let jac = jacobian(&problem, &params, &residuals, &LmConfig::default()).unwrap();
        assert_relative_eq!(jac[[0, 0]], 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let params = array![0.7, -1.2];
        let problem = TestProblem;
        let residuals = problem.eval(&params).unwrap();

        let serial = jacobian(&problem, &params, &residuals, &LmConfig::default()).unwrap();
        let config = LmConfig {
            parallel_jacobian: true,
            ..LmConfig::default()
        };
        let parallel = jacobian(&problem, &params, &residuals, &config).unwrap();
        assert_eq!(serial, parallel);
    }
}
