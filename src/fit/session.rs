//! A fitting session: the catalog, the observed data and at most one
//! active run.

use std::sync::Arc;

use crate::derivative::ObservedSeries;
use crate::error::{FitError, Result};
use crate::lm::LmConfig;
use crate::model::{ModelCurves, ModelEvaluator};
use crate::parameters::{ModelVariant, ParameterCatalog, ParameterMap, SessionState};

use super::controller::{FitController, FitEvent, FitOutcome, FitRequest, ProgressSnapshot};

/// Default pressure/derivative weight.
pub const DEFAULT_WEIGHT: f64 = 0.5;

/// Owns the parameter catalog and serializes fit runs against it.
///
/// Starting a fit while another is active cancels the earlier run, waits
/// for it, and applies its best parameters before the new run starts, so
/// only one optimizer ever writes into the catalog.
pub struct FittingSession {
    evaluator: Arc<dyn ModelEvaluator>,
    catalog: ParameterCatalog,
    observed: Option<Arc<ObservedSeries>>,
    weight: f64,
    config: LmConfig,
    active: Option<FitController>,
    last_progress: Option<ProgressSnapshot>,
}

impl FittingSession {
    pub fn new(evaluator: Arc<dyn ModelEvaluator>) -> Self {
        Self {
            evaluator,
            catalog: ParameterCatalog::default(),
            observed: None,
            weight: DEFAULT_WEIGHT,
            config: LmConfig::default(),
            active: None,
            last_progress: None,
        }
    }

    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LmConfig) {
        self.config = config;
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Set the pressure/derivative weight used by the next fit.
    pub fn set_weight(&mut self, weight: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(FitError::InvalidInput(format!(
                "weight must lie in [0, 1], got {}",
                weight
            )));
        }
        self.weight = weight;
        Ok(())
    }

    /// Replace the observed data. A run already in flight keeps its copy.
    pub fn load_observed(&mut self, observed: ObservedSeries) {
        tracing::debug!(points = observed.len(), "observed data loaded");
        self.observed = Some(Arc::new(observed));
    }

    pub fn observed(&self) -> Option<&ObservedSeries> {
        self.observed.as_deref()
    }

    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ParameterCatalog {
        &mut self.catalog
    }

    /// Switch model variant, carrying over shared parameter values.
    ///
    /// Returns whether any value was carried over.
    pub fn switch_variant(&mut self, variant: ModelVariant) -> bool {
        self.catalog.switch_variant(variant)
    }

    /// Start a fit of the free parameters against the observed data.
    pub fn start_fit(&mut self) -> Result<()> {
        if let Some(previous) = self.active.take() {
            tracing::info!("cancelling active fit before starting a new one");
            previous.cancel();
            if let Err(e) = self.finish(previous) {
                tracing::warn!(error = %e, "previous fit ended with an error");
            }
        }

        let observed = self
            .observed
            .clone()
            .ok_or_else(|| FitError::InvalidInput("no observed data loaded".to_string()))?;

        let request = FitRequest {
            variant: self.catalog.variant(),
            parameters: self.catalog.get().clone(),
            observed,
            weight: self.weight,
            config: self.config.clone(),
        };
        self.last_progress = None;
        self.active = Some(FitController::spawn(Arc::clone(&self.evaluator), request)?);
        Ok(())
    }

    /// Drain pending events without blocking.
    ///
    /// Returns the outcome once the active run has finished; its parameters
    /// are applied to the catalog at that point.
    pub fn poll(&mut self) -> Result<Option<FitOutcome>> {
        let Some(controller) = self.active.as_ref() else {
            return Ok(None);
        };

        let mut finished = false;
        while let Some(event) = controller.try_event() {
            match event {
                FitEvent::Progress(snapshot) => self.last_progress = Some(snapshot),
                FitEvent::Finished(_) => finished = true,
            }
        }

        if !finished && !controller.is_finished() {
            return Ok(None);
        }
        match self.active.take() {
            Some(controller) => self.finish(controller).map(Some),
            None => Ok(None),
        }
    }

    /// Block until the active run ends.
    pub fn wait_for_fit(&mut self) -> Result<Option<FitOutcome>> {
        match self.active.take() {
            Some(controller) => self.finish(controller).map(Some),
            None => Ok(None),
        }
    }

    /// Request cancellation of the active run. The run's best parameters
    /// are applied on the next [`poll`](Self::poll) or
    /// [`wait_for_fit`](Self::wait_for_fit).
    pub fn cancel_fit(&self) {
        if let Some(controller) = &self.active {
            controller.cancel();
        }
    }

    pub fn is_fitting(&self) -> bool {
        self.active.is_some()
    }

    /// Most recent progress snapshot of the current or last run.
    pub fn last_progress(&self) -> Option<&ProgressSnapshot> {
        self.last_progress.as_ref()
    }

    /// Evaluate the model for the current catalog at the observed times.
    pub fn model_curves(&self) -> Result<ModelCurves> {
        let observed = self
            .observed
            .as_ref()
            .ok_or_else(|| FitError::InvalidInput("no observed data loaded".to_string()))?;
        let variant = self.catalog.variant();
        if !self.evaluator.supports(variant) {
            return Err(FitError::UnsupportedVariant(variant));
        }
        let times = observed.time().to_vec();
        Ok(self.evaluator.evaluate(variant, &self.catalog.get().to_map(), &times)?)
    }

    pub fn save_state(&self) -> SessionState {
        self.catalog.to_state()
    }

    /// Restore a saved state. An active run is cancelled and its result
    /// discarded.
    pub fn load_state(&mut self, state: &SessionState) -> Result<()> {
        let catalog = ParameterCatalog::from_state(state)?;
        if let Some(active) = self.active.take() {
            active.cancel();
            if let Err(e) = active.wait() {
                tracing::warn!(error = %e, "discarded run ended with an error");
            }
        }
        self.catalog = catalog;
        self.last_progress = None;
        Ok(())
    }

    pub fn save_json(&self) -> Result<String> {
        self.save_state().to_json()
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let state = SessionState::from_json(json)?;
        self.load_state(&state)
    }

    /// Join a run, keep its last progress and apply its fitted values.
    ///
    /// Only the run's free parameters are written back; fixed parameters
    /// keep whatever the caller set while the run was in flight.
    fn finish(&mut self, controller: FitController) -> Result<FitOutcome> {
        // Ends once the worker drops its sender
        for event in controller.events().iter() {
            if let FitEvent::Progress(snapshot) = event {
                self.last_progress = Some(snapshot);
            }
        }

        let outcome = controller.wait()?;
        if outcome.variant == self.catalog.variant() {
            let fitted: ParameterMap = outcome
                .free_parameters
                .iter()
                .filter_map(|name| outcome.parameters.get(name).map(|v| (name.clone(), *v)))
                .collect();
            let updated = self.catalog.get_mut().apply_values(&fitted);
            tracing::debug!(updated, "applied fitted parameters");
        } else {
            tracing::warn!(
                fitted = %outcome.variant,
                current = %self.catalog.variant(),
                "model variant changed during fit; result not applied"
            );
        }
        Ok(outcome)
    }
}
