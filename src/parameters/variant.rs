//! Reservoir model variants and their parameter orderings.
//!
//! Each variant maps to a fixed, ordered list of parameter keys. The order
//! drives both presentation and the column order of the Jacobian, so it is
//! part of the public contract of this module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parameters shared by every variant (fluid and completion properties).
const BASE_KEYS: &[&str] = &["phi", "h", "mu", "B", "Ct", "q", "nf"];

/// Composite dual-porosity keys common to the known variants.
const COMPOSITE_KEYS: &[&str] = &[
    "kf", "km", "L", "Lf", "rmD", "omega1", "omega2", "lambda1", "gamaD",
];

const STORAGE_KEYS: &[&str] = &["cD", "S"];
const BOUNDARY_KEYS: &[&str] = &["reD"];

/// Ordering used when the variant is not recognized.
const FALLBACK_KEYS: &[&str] = &[
    "kf", "km", "L", "Lf", "rmD", "omega1", "omega2", "lambda1", "cD", "S",
];

/// An analytic reservoir-flow formulation.
///
/// The "changing storage" variants carry wellbore storage (`cD`) and skin
/// (`S`); the bounded variants carry an outer boundary radius (`reD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelVariant {
    /// Infinite-acting reservoir, variable wellbore storage.
    InfiniteChangingStorage,
    /// Infinite-acting reservoir, constant wellbore storage.
    InfiniteConstantStorage,
    /// Closed outer boundary, variable wellbore storage.
    ClosedChangingStorage,
    /// Closed outer boundary, constant wellbore storage.
    ClosedConstantStorage,
    /// Constant-pressure outer boundary, variable wellbore storage.
    ConstantPressureChangingStorage,
    /// Constant-pressure outer boundary, constant wellbore storage.
    ConstantPressureConstantStorage,
    /// Any identifier this build does not know about.
    Unrecognized,
}

impl ModelVariant {
    /// All known variants, in menu order.
    pub const KNOWN: [ModelVariant; 6] = [
        ModelVariant::InfiniteChangingStorage,
        ModelVariant::InfiniteConstantStorage,
        ModelVariant::ClosedChangingStorage,
        ModelVariant::ClosedConstantStorage,
        ModelVariant::ConstantPressureChangingStorage,
        ModelVariant::ConstantPressureConstantStorage,
    ];

    /// Stable identifier used in saved sessions.
    pub fn id(&self) -> &'static str {
        match self {
            ModelVariant::InfiniteChangingStorage => "infinite_changing_storage",
            ModelVariant::InfiniteConstantStorage => "infinite_constant_storage",
            ModelVariant::ClosedChangingStorage => "closed_changing_storage",
            ModelVariant::ClosedConstantStorage => "closed_constant_storage",
            ModelVariant::ConstantPressureChangingStorage => "constant_pressure_changing_storage",
            ModelVariant::ConstantPressureConstantStorage => "constant_pressure_constant_storage",
            ModelVariant::Unrecognized => "unrecognized",
        }
    }

    /// Parse an identifier; anything unknown maps to [`ModelVariant::Unrecognized`].
    pub fn from_id(id: &str) -> Self {
        ModelVariant::KNOWN
            .iter()
            .copied()
            .find(|v| v.id() == id)
            .unwrap_or(ModelVariant::Unrecognized)
    }

    /// Whether the variant models wellbore storage and skin.
    pub fn has_storage(&self) -> bool {
        matches!(
            self,
            ModelVariant::InfiniteChangingStorage
                | ModelVariant::ClosedChangingStorage
                | ModelVariant::ConstantPressureChangingStorage
        )
    }

    /// Whether the variant has a finite outer boundary.
    pub fn has_boundary(&self) -> bool {
        matches!(
            self,
            ModelVariant::ClosedChangingStorage
                | ModelVariant::ClosedConstantStorage
                | ModelVariant::ConstantPressureChangingStorage
                | ModelVariant::ConstantPressureConstantStorage
        )
    }

    /// The ordered parameter keys for this variant.
    pub fn parameter_order(&self) -> Vec<&'static str> {
        let mut order: Vec<&'static str> = BASE_KEYS.to_vec();
        if *self == ModelVariant::Unrecognized {
            order.extend_from_slice(FALLBACK_KEYS);
            return order;
        }
        order.extend_from_slice(COMPOSITE_KEYS);
        if self.has_boundary() {
            order.extend_from_slice(BOUNDARY_KEYS);
        }
        if self.has_storage() {
            order.extend_from_slice(STORAGE_KEYS);
        }
        order
    }
}

impl Default for ModelVariant {
    fn default() -> Self {
        ModelVariant::InfiniteChangingStorage
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelVariant {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ModelVariant::from_id(s))
    }
}

impl Serialize for ModelVariant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for ModelVariant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = String::deserialize(deserializer)?;
        Ok(ModelVariant::from_id(&id))
    }
}
