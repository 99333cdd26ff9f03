//! Ordered parameter sets and the per-variant parameter catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::parameters::bounds::{self, Bounds};
use crate::parameters::parameter::Parameter;
use crate::parameters::variant::ModelVariant;

/// Full name → value map handed to the model evaluator.
pub type ParameterMap = BTreeMap<String, f64>;

/// An ordered sequence of uniquely named parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    /// Build the default set for a variant.
    pub fn defaults_for(variant: ModelVariant) -> Self {
        Self {
            params: variant
                .parameter_order()
                .into_iter()
                .map(Parameter::with_default)
                .collect(),
        }
    }

    /// Build a set from explicit parameters, rejecting duplicate names.
    pub fn from_parameters(params: Vec<Parameter>) -> Result<Self> {
        for (i, p) in params.iter().enumerate() {
            if params[..i].iter().any(|q| q.name() == p.name()) {
                return Err(FitError::InvalidInput(format!(
                    "duplicate parameter '{}'",
                    p.name()
                )));
            }
        }
        Ok(Self { params })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Parameter names in set order.
    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name()).collect()
    }

    /// Mark a parameter as free or fixed.
    pub fn set_fit(&mut self, name: &str, is_fit: bool) -> Result<()> {
        let param = self.get_mut(name).ok_or_else(|| unknown(name))?;
        param.set_fit(is_fit);
        Ok(())
    }

    /// Set a value (clamped into the parameter's bounds).
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<f64> {
        let param = self.get_mut(name).ok_or_else(|| unknown(name))?;
        Ok(param.set_value(value))
    }

    /// Free parameters, in set order.
    pub fn free(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_fit())
    }

    /// Fixed parameters, in set order.
    pub fn fixed(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| !p.is_fit())
    }

    /// Names and bounds of the free parameters, in set order.
    pub fn free_bounds(&self) -> Vec<(String, Bounds)> {
        self.free()
            .map(|p| (p.name().to_string(), p.bounds()))
            .collect()
    }

    /// Every parameter value by name.
    pub fn to_map(&self) -> ParameterMap {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }

    /// Values of the fixed parameters by name.
    pub fn fixed_map(&self) -> ParameterMap {
        self.fixed()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }

    /// Copy values from a map into matching parameters, clamping each one.
    ///
    /// Names absent from the set are ignored. Returns how many parameters
    /// were updated.
    pub fn apply_values(&mut self, values: &ParameterMap) -> usize {
        let mut updated = 0;
        for param in self.params.iter_mut() {
            if let Some(&v) = values.get(param.name()) {
                param.set_value(v);
                updated += 1;
            }
        }
        updated
    }
}

fn unknown(name: &str) -> FitError {
    FitError::InvalidInput(format!("unknown parameter '{}'", name))
}

/// Persisted form of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub name: String,
    pub value: f64,
    #[serde(rename = "isFit")]
    pub is_fit: bool,
    /// `null` in JSON when open below.
    #[serde(with = "bounds::lower")]
    pub min: f64,
    /// `null` in JSON when open above.
    #[serde(with = "bounds::upper")]
    pub max: f64,
}

/// Minimal saved state of a fit session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SessionRecord", into = "SessionRecord")]
pub struct SessionState {
    pub variant: ModelVariant,
    /// Identifier read from a record whose variant this build does not
    /// know; written back unchanged on save.
    pub unrecognized_id: Option<String>,
    pub parameters: Vec<ParameterState>,
}

/// On-disk layout of [`SessionState`].
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    variant: String,
    parameters: Vec<ParameterState>,
}

impl From<SessionRecord> for SessionState {
    fn from(record: SessionRecord) -> Self {
        let variant = ModelVariant::from_id(&record.variant);
        Self {
            variant,
            unrecognized_id: (variant == ModelVariant::Unrecognized).then_some(record.variant),
            parameters: record.parameters,
        }
    }
}

impl From<SessionState> for SessionRecord {
    fn from(state: SessionState) -> Self {
        Self {
            variant: state.variant_id().to_string(),
            parameters: state.parameters,
        }
    }
}

impl SessionState {
    /// Identifier written for the variant.
    pub fn variant_id(&self) -> &str {
        match (&self.unrecognized_id, self.variant) {
            (Some(id), ModelVariant::Unrecognized) => id.as_str(),
            (_, variant) => variant.id(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Owns the active model variant and its parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCatalog {
    variant: ModelVariant,
    unrecognized_id: Option<String>,
    params: ParameterSet,
}

impl ParameterCatalog {
    pub fn new(variant: ModelVariant) -> Self {
        Self {
            variant,
            unrecognized_id: None,
            params: ParameterSet::defaults_for(variant),
        }
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Replace the active set with the variant's defaults.
    pub fn reset(&mut self, variant: ModelVariant) {
        self.variant = variant;
        self.unrecognized_id = None;
        self.params = ParameterSet::defaults_for(variant);
    }

    /// Switch to another variant, carrying over values of shared names.
    ///
    /// Bounds and fit flags come from the new variant's defaults; only the
    /// value of a parameter present in both sets is restored (clamped to the
    /// new bounds). Returns true if any value was restored.
    pub fn switch_variant(&mut self, variant: ModelVariant) -> bool {
        let previous = self.params.to_map();
        self.reset(variant);
        let restored = self.params.apply_values(&previous);
        tracing::debug!(%variant, restored, "switched model variant");
        restored > 0
    }

    pub fn get(&self) -> &ParameterSet {
        &self.params
    }

    pub fn get_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    pub fn set(&mut self, params: ParameterSet) {
        self.params = params;
    }

    /// Snapshot the catalog into its saved form.
    pub fn to_state(&self) -> SessionState {
        SessionState {
            variant: self.variant,
            unrecognized_id: self.unrecognized_id.clone(),
            parameters: self
                .params
                .iter()
                .map(|p| ParameterState {
                    name: p.name().to_string(),
                    value: p.value(),
                    is_fit: p.is_fit(),
                    min: p.min(),
                    max: p.max(),
                })
                .collect(),
        }
    }

    /// Restore a catalog from its saved form.
    ///
    /// Invalid bounds or duplicate names are rejected and leave nothing
    /// half-applied. Out-of-range values are clamped.
    pub fn from_state(state: &SessionState) -> Result<Self> {
        let params = state
            .parameters
            .iter()
            .map(|s| -> Result<Parameter> {
                let mut p = Parameter::with_bounds(&s.name, s.value, s.min, s.max)?;
                p.set_fit(s.is_fit);
                Ok(p)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            variant: state.variant,
            unrecognized_id: state
                .unrecognized_id
                .clone()
                .filter(|_| state.variant == ModelVariant::Unrecognized),
            params: ParameterSet::from_parameters(params)?,
        })
    }
}

impl Default for ParameterCatalog {
    fn default() -> Self {
        Self::new(ModelVariant::default())
    }
}
