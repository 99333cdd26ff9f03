//! Background fit runs.
//!
//! A [`FitController`] owns one optimizer run on its own thread. Progress
//! and completion cross back to the caller over a channel as owned
//! snapshots; the caller never shares mutable state with the worker.

use ndarray::Array1;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::derivative::ObservedSeries;
use crate::error::{FitError, Result};
use crate::lm::{
    CancellationToken, ConvergenceStatus, LevenbergMarquardt, LmConfig, OptimizationState,
};
use crate::model::{ModelCurves, ModelEvaluator};
use crate::parameters::{ModelVariant, ParameterMap, ParameterSet};
use crate::residual::WellTestProblem;

/// Everything a fit run needs, moved into the worker.
#[derive(Debug, Clone)]
pub struct FitRequest {
    pub variant: ModelVariant,
    /// Values, bounds and fit flags at the start of the run.
    pub parameters: ParameterSet,
    pub observed: Arc<ObservedSeries>,
    /// Pressure/derivative trade-off in `[0, 1]`.
    pub weight: f64,
    pub config: LmConfig,
}

/// State of a run after an accepted iteration.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub iteration: usize,
    /// Share of the iteration cap used so far, 0 to 100.
    pub percent: f64,
    /// Sum of squared residuals.
    pub error: f64,
    pub lambda: f64,
    /// Full parameter map, fixed parameters included.
    pub parameters: ParameterMap,
    /// Model curves at the observed times; `None` if re-evaluation failed.
    pub curves: Option<ModelCurves>,
}

impl ProgressSnapshot {
    fn capture(
        problem: &WellTestProblem,
        params: &Array1<f64>,
        iteration: usize,
        percent: f64,
        error: f64,
        lambda: f64,
    ) -> Self {
        Self {
            iteration,
            percent,
            error,
            lambda,
            parameters: problem.full_map(params),
            curves: problem.curves(params).ok(),
        }
    }

    pub fn model_time(&self) -> Option<&Array1<f64>> {
        self.curves.as_ref().map(|c| &c.time)
    }

    pub fn model_pressure(&self) -> Option<&Array1<f64>> {
        self.curves.as_ref().map(|c| &c.pressure)
    }

    pub fn model_derivative(&self) -> Option<&Array1<f64>> {
        self.curves.as_ref().map(|c| &c.derivative)
    }
}

/// Terminal result of a fit run.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub variant: ModelVariant,
    pub status: ConvergenceStatus,
    /// Best full parameter map found.
    pub parameters: ParameterMap,
    pub free_parameters: Vec<String>,
    pub error: f64,
    pub iterations: usize,
    pub func_evals: usize,
    pub message: String,
    pub elapsed: Duration,
}

impl fmt::Display for FitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit report:")?;
        writeln!(f, "  Model: {}", self.variant)?;
        writeln!(f, "  Status: {} ({})", self.status, self.message)?;
        writeln!(f, "  Error: {:.6e}", self.error)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Evaluations: {}", self.func_evals)?;
        writeln!(f, "  Elapsed: {:.3} s", self.elapsed.as_secs_f64())?;
        writeln!(f, "  Parameters:")?;
        for (name, value) in &self.parameters {
            let marker = if self.free_parameters.contains(name) { " *" } else { "" };
            writeln!(f, "    {:<8} = {:.6e}{}", name, value, marker)?;
        }
        Ok(())
    }
}

/// Notifications sent from the worker.
#[derive(Debug, Clone)]
pub enum FitEvent {
    Progress(ProgressSnapshot),
    Finished(FitOutcome),
}

/// Handle to a running fit.
///
/// Dropping the handle cancels the run and waits for the worker.
pub struct FitController {
    cancel: CancellationToken,
    events: Receiver<FitEvent>,
    handle: Option<JoinHandle<Result<FitOutcome>>>,
}

impl FitController {
    /// Validate `request` and start the run on a new thread.
    ///
    /// Input errors are returned here, before any thread starts.
    pub fn spawn(evaluator: Arc<dyn ModelEvaluator>, request: FitRequest) -> Result<Self> {
        request.config.validate()?;
        let problem = WellTestProblem::new(
            evaluator,
            request.variant,
            &request.parameters,
            request.observed,
            request.weight,
        )?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (sink, events) = mpsc::channel();
        let config = request.config;
        let handle = thread::spawn(move || Self::run(problem, config, token, sink));

        Ok(Self {
            cancel,
            events,
            handle: Some(handle),
        })
    }

    /// Ask the worker to stop at its next iteration boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receiver for progress and completion events.
    pub fn events(&self) -> &Receiver<FitEvent> {
        &self.events
    }

    /// Next pending event, without blocking.
    pub fn try_event(&self) -> Option<FitEvent> {
        self.events.try_recv().ok()
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Block until the run ends and return its outcome.
    pub fn wait(mut self) -> Result<FitOutcome> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| FitError::WorkerPanicked)?,
            None => Err(FitError::WorkerPanicked),
        }
    }

    fn run(
        problem: WellTestProblem,
        config: LmConfig,
        cancel: CancellationToken,
        sink: Sender<FitEvent>,
    ) -> Result<FitOutcome> {
        let started = Instant::now();
        let max_iterations = config.max_iterations;
        tracing::info!(
            variant = %problem.variant(),
            free = ?problem.free_names(),
            points = problem.observed().len(),
            weight = problem.weight(),
            "starting fit"
        );

        let optimizer = LevenbergMarquardt::with_config(config);
        let mut report = |state: &OptimizationState| {
            let percent = (100.0 * state.iteration as f64 / max_iterations as f64).min(100.0);
            let snapshot = ProgressSnapshot::capture(
                &problem,
                &state.params,
                state.iteration,
                percent,
                state.cost,
                state.lambda,
            );
            // The receiver may already be gone; the run still completes
            let _ = sink.send(FitEvent::Progress(snapshot));
        };

        let initial = problem.initial_params();
        let result = match optimizer.minimize_with(&problem, initial, &cancel, &mut report) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "fit aborted");
                return Err(e);
            }
        };

        let outcome = FitOutcome {
            variant: problem.variant(),
            status: result.status,
            parameters: problem.full_map(&result.params),
            free_parameters: problem.free_names().to_vec(),
            error: result.cost,
            iterations: result.iterations,
            func_evals: result.func_evals,
            message: result.message.clone(),
            elapsed: started.elapsed(),
        };

        match outcome.status {
            ConvergenceStatus::NumericalFailure => tracing::warn!(
                iterations = outcome.iterations,
                error = outcome.error,
                message = %outcome.message,
                "fit stopped on numerical failure"
            ),
            status => tracing::info!(
                ?status,
                iterations = outcome.iterations,
                error = outcome.error,
                "fit finished"
            ),
        }

        let last = ProgressSnapshot::capture(
            &problem,
            &result.params,
            result.iterations,
            100.0,
            result.cost,
            result.lambda,
        );
        let _ = sink.send(FitEvent::Progress(last));
        let _ = sink.send(FitEvent::Finished(outcome.clone()));

        Ok(outcome)
    }
}

impl Drop for FitController {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.cancel();
            let _ = handle.join();
        }
    }
}

impl fmt::Debug for FitController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitController")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
