//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the damped Gauss-Newton iteration for bounded
//! nonlinear least-squares problems, with progress observation and
//! cooperative cancellation.

use ndarray::Array1;
use std::fmt;

use crate::error::{FitError, Result};
use crate::parameters::Bounds;
use crate::problem::{sum_of_squares, Problem};

use super::cancel::CancellationToken;
use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::NormalEquations;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Best parameter values found
    pub params: Array1<f64>,

    /// Sum of squared residuals at `params`
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of residual evaluations, including Jacobian columns
    pub func_evals: usize,

    /// Terminal state of the run
    pub status: ConvergenceStatus,

    /// Damping factor when the run stopped
    pub lambda: f64,

    /// A message describing the result
    pub message: String,
}

impl LmResult {
    /// Whether the run converged.
    pub fn success(&self) -> bool {
        self.status.is_converged()
    }
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Status: {}", self.status)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Transient state of one run, handed to observers after every accepted
/// iteration.
#[derive(Debug, Clone)]
pub struct OptimizationState {
    /// Accepted iterations so far
    pub iteration: usize,

    /// Current parameter vector
    pub params: Array1<f64>,

    /// Sum of squared residuals at `params`
    pub cost: f64,

    /// Current damping factor
    pub lambda: f64,

    /// Best parameters seen so far
    pub best_params: Array1<f64>,

    /// Cost at `best_params`
    pub best_cost: f64,

    /// Running until a terminal state is reached
    pub status: ConvergenceStatus,
}

impl OptimizationState {
    fn new(params: Array1<f64>, cost: f64, lambda: f64) -> Self {
        Self {
            iteration: 0,
            best_params: params.clone(),
            best_cost: cost,
            params,
            cost,
            lambda,
            status: ConvergenceStatus::Running,
        }
    }

    fn accept(&mut self, params: Array1<f64>, cost: f64) {
        if cost < self.best_cost {
            self.best_params = params.clone();
            self.best_cost = cost;
        }
        self.params = params;
        self.cost = cost;
        self.iteration += 1;
    }
}

/// Receives a snapshot after every accepted iteration.
pub trait IterationObserver {
    fn on_iteration(&mut self, state: &OptimizationState);
}

impl<F: FnMut(&OptimizationState)> IterationObserver for F {
    fn on_iteration(&mut self, state: &OptimizationState) {
        self(state)
    }
}

/// Outcome of the damping loop within one iteration.
enum StepOutcome {
    Accepted {
        params: Array1<f64>,
        residuals: Array1<f64>,
        cost: f64,
        step: Array1<f64>,
    },
    Negligible,
    Exhausted(String),
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for the relative error improvement.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for the relative step size.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for the gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the factor by which to increase lambda.
    pub fn with_lambda_up_factor(mut self, factor: f64) -> Self {
        self.config.lambda_up_factor = factor;
        self
    }

    /// Set the factor by which to decrease lambda.
    pub fn with_lambda_down_factor(mut self, factor: f64) -> Self {
        self.config.lambda_down_factor = factor;
        self
    }

    /// Set the maximum value for lambda.
    pub fn with_max_lambda(mut self, max_lambda: f64) -> Self {
        self.config.max_lambda = max_lambda;
        self
    }

    /// Set the number of rejected steps allowed per iteration.
    pub fn with_max_damping_escalations(mut self, escalations: usize) -> Self {
        self.config.max_damping_escalations = escalations;
        self
    }

    /// Evaluate Jacobian columns in parallel.
    pub fn with_parallel_jacobian(mut self, parallel: bool) -> Self {
        self.config.parallel_jacobian = parallel;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        let mut ignore = |_: &OptimizationState| {};
        self.minimize_with(problem, initial_params, &CancellationToken::new(), &mut ignore)
    }

    /// Minimize with cancellation and per-iteration observation.
    ///
    /// The initial parameters are clamped into the problem's bounds, and so
    /// is every proposal. A step is accepted only if it strictly lowers the
    /// error, so the reported cost never increases between observer calls.
    ///
    /// Evaluation failures at a trial point, including a residual vector of
    /// the wrong length, count as a rejected step. Configuration errors
    /// (unsupported variant, parameter count mismatch) abort the run with
    /// `Err`.
    pub fn minimize_with<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
        cancel: &CancellationToken,
        observer: &mut dyn IterationObserver,
    ) -> Result<LmResult> {
        self.config.validate()?;

        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(FitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        let bounds = problem.bounds();
        if bounds.len() != n_params {
            return Err(FitError::DimensionMismatch(format!(
                "{} bounds for {} parameters",
                bounds.len(),
                n_params
            )));
        }

        let criteria = ConvergenceCriteria::from_config(&self.config);
        let mut func_evals = 0;
        let params = clamp_to(&bounds, &initial_params);

        let (mut residuals, cost) = match self.evaluate(problem, &params, &mut func_evals)? {
            Some(evaluated) => evaluated,
            None => {
                tracing::warn!("model evaluation failed at the starting point");
                return Ok(LmResult {
                    params,
                    cost: f64::INFINITY,
                    iterations: 0,
                    func_evals,
                    status: ConvergenceStatus::NumericalFailure,
                    lambda: self.config.initial_lambda,
                    message: "evaluation failed at the starting point".to_string(),
                });
            }
        };

        let mut state = OptimizationState::new(params, cost, self.config.initial_lambda);
        let message = loop {
            if cancel.is_cancelled() {
                state.status = ConvergenceStatus::Cancelled;
                break format!("cancelled after {} iterations", state.iteration);
            }
            if state.iteration >= self.config.max_iterations {
                state.status = ConvergenceStatus::MaxIterationsReached;
                break format!("maximum iterations ({}) reached", self.config.max_iterations);
            }
            if state.cost == 0.0 {
                state.status = ConvergenceStatus::Converged;
                break "exact fit".to_string();
            }

            let jacobian = match problem.jacobian(&state.params, &residuals, &self.config) {
                Ok(jacobian) => jacobian,
                Err(e) if e.is_configuration_error() => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Jacobian evaluation failed");
                    state.status = ConvergenceStatus::NumericalFailure;
                    break format!("Jacobian evaluation failed: {}", e);
                }
            };
            func_evals += n_params;

            let normal = NormalEquations::new(&jacobian, &residuals)?;
            if criteria.gradient_converged(normal.gradient()) {
                state.status = ConvergenceStatus::Converged;
                break format!("gradient below {:.2e}", self.config.gtol);
            }

            match self.damped_step(problem, &normal, &bounds, &criteria, &mut state, &mut func_evals)? {
                StepOutcome::Accepted {
                    params,
                    residuals: new_residuals,
                    cost,
                    step,
                } => {
                    let converged = criteria.check_accepted(&state.params, &step, state.cost, cost);
                    tracing::debug!(
                        iteration = state.iteration + 1,
                        cost,
                        lambda = state.lambda,
                        "accepted step"
                    );

                    state.accept(params, cost);
                    residuals = new_residuals;
                    state.lambda =
                        (state.lambda * self.config.lambda_down_factor).max(self.config.min_lambda);
                    observer.on_iteration(&state);

                    if let Some(reason) = converged {
                        state.status = ConvergenceStatus::Converged;
                        break reason;
                    }
                }
                StepOutcome::Negligible => {
                    state.status = ConvergenceStatus::Converged;
                    break format!("step below relative tolerance {:.2e}", self.config.xtol);
                }
                StepOutcome::Exhausted(reason) => {
                    tracing::warn!(lambda = state.lambda, %reason, "no acceptable step");
                    state.status = ConvergenceStatus::NumericalFailure;
                    break reason;
                }
            }
        };

        tracing::debug!(
            status = ?state.status,
            iterations = state.iteration,
            cost = state.best_cost,
            "optimization finished"
        );

        Ok(LmResult {
            params: state.best_params,
            cost: state.best_cost,
            iterations: state.iteration,
            func_evals,
            status: state.status,
            lambda: state.lambda,
            message,
        })
    }

    /// Try increasingly damped steps until one lowers the error.
    fn damped_step<P: Problem>(
        &self,
        problem: &P,
        normal: &NormalEquations,
        bounds: &[Bounds],
        criteria: &ConvergenceCriteria,
        state: &mut OptimizationState,
        func_evals: &mut usize,
    ) -> Result<StepOutcome> {
        let mut escalations = 0;

        loop {
            match normal.solve(state.lambda) {
                Ok(delta) => {
                    let proposal = clamp_to(bounds, &(&state.params + &delta));
                    let step = &proposal - &state.params;

                    if criteria.step_negligible(&state.params, &step) {
                        return Ok(StepOutcome::Negligible);
                    }

                    if let Some((residuals, cost)) = self.evaluate(problem, &proposal, func_evals)? {
                        if cost < state.cost {
                            return Ok(StepOutcome::Accepted {
                                params: proposal,
                                residuals,
                                cost,
                                step,
                            });
                        }
                    }
                    tracing::debug!(lambda = state.lambda, "rejected step");
                }
                Err(FitError::SingularMatrix) => {
                    tracing::debug!(lambda = state.lambda, "singular normal equations");
                }
                Err(e) => return Err(e),
            }

            escalations += 1;
            state.lambda *= self.config.lambda_up_factor;

            if state.lambda > self.config.max_lambda {
                return Ok(StepOutcome::Exhausted(format!(
                    "damping factor exceeded {:.2e} without improvement",
                    self.config.max_lambda
                )));
            }
            if escalations > self.config.max_damping_escalations {
                return Ok(StepOutcome::Exhausted(format!(
                    "{} consecutive rejected steps",
                    escalations
                )));
            }
        }
    }

    /// Evaluate residuals and cost; `None` marks an unusable point.
    fn evaluate<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        func_evals: &mut usize,
    ) -> Result<Option<(Array1<f64>, f64)>> {
        *func_evals += 1;
        match problem.eval(params) {
            Ok(residuals) => {
                if residuals.len() != problem.residual_count() {
                    tracing::warn!(
                        expected = problem.residual_count(),
                        got = residuals.len(),
                        "wrong residual count; treating point as rejected"
                    );
                    return Ok(None);
                }
                let cost = sum_of_squares(&residuals);
                if cost.is_finite() {
                    Ok(Some((residuals, cost)))
                } else {
                    tracing::debug!("non-finite residuals");
                    Ok(None)
                }
            }
            Err(e) if e.is_configuration_error() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "evaluation failed; treating point as rejected");
                Ok(None)
            }
        }
    }
}

fn clamp_to(bounds: &[Bounds], params: &Array1<f64>) -> Array1<f64> {
    params
        .iter()
        .zip(bounds)
        .map(|(p, b)| b.clamp(*p))
        .collect()
}
