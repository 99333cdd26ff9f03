//! Parameter bounds and the bound policy table.
//!
//! Every fittable quantity is boxed in by an inclusive `[min, max]`
//! interval. Values are clamped into the interval after every mutation, so
//! the optimizer never sees or produces an out-of-range parameter.
//!
//! Default intervals come from [`BoundRule`], a static lookup keyed by the
//! parameter name. Keys without an entry derive their interval from their
//! default value.

use serde::{Deserialize, Deserializer, Serializer};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Bounds must not be NaN")]
    NanBound,
}

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint with min and max values
    ///
    /// # Examples
    ///
    /// ```
    /// use welltest_fit::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.clamp(12.0), 10.0);
    /// assert!(Bounds::new(2.0, 1.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() {
            return Err(BoundsError::NanBound);
        }
        if min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded constraint (negative infinity to positive infinity)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Check if a value is within the bounds
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if the bounds are finite (both min and max are finite)
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Clamp a value to be within the bounds
    ///
    /// NaN is mapped to the lower bound (or zero when unbounded below) so a
    /// bad proposal can never leak out of the interval.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return if self.min.is_finite() { self.min } else { 0.0_f64.min(self.max) };
        }
        value.max(self.min).min(self.max)
    }
}

/// Serde adapter for a lower bound stored as a bare number.
///
/// JSON has no infinity, so an open lower end is written as `null` and
/// `null` reads back as negative infinity.
pub mod lower {
    use super::*;

    pub fn serialize<S: Serializer>(min: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *min == NEG_INFINITY {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*min)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(NEG_INFINITY))
    }
}

/// Serde adapter for an upper bound; `null` is positive infinity.
pub mod upper {
    use super::*;

    pub fn serialize<S: Serializer>(max: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *max == INFINITY {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*max)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(INFINITY))
    }
}

/// How the default interval of a parameter is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundRule {
    /// A fixed physical range.
    Range { min: f64, max: f64 },

    /// Derived from the default value: `±1000×` for positive defaults,
    /// `[0, 100]` for zero and `[-100, 100]` for negative defaults.
    FromDefault,
}

impl BoundRule {
    /// Look up the rule for a parameter key.
    pub fn for_key(key: &str) -> BoundRule {
        use BoundRule::Range;
        match key {
            "kf" | "km" => Range { min: 1e-6, max: 100.0 },
            "L" => Range { min: 10.0, max: 5000.0 },
            "Lf" => Range { min: 1.0, max: 1000.0 },
            "rmD" => Range { min: 1.0, max: 50.0 },
            "omega1" | "omega2" => Range { min: 0.001, max: 1.0 },
            "lambda1" => Range { min: 1e-9, max: 1.0 },
            "cD" => Range { min: 0.0, max: 5000.0 },
            "S" => Range { min: -5.0, max: 50.0 },
            "gamaD" => Range { min: 0.0, max: 1.0 },
            // reD must stay strictly outside the wellbore
            "reD" => Range { min: 1.1, max: 1000.0 },
            "phi" => Range { min: 0.001, max: 1.0 },
            "h" => Range { min: 1.0, max: 500.0 },
            "mu" => Range { min: 0.01, max: 1000.0 },
            "B" => Range { min: 0.5, max: 2.0 },
            "Ct" => Range { min: 1e-6, max: 1e-2 },
            "q" => Range { min: 0.1, max: 10000.0 },
            "nf" => Range { min: 1.0, max: 100.0 },
            _ => BoundRule::FromDefault,
        }
    }

    /// Resolve the rule into concrete bounds for the given default value.
    pub fn resolve(&self, default: f64) -> Bounds {
        match *self {
            BoundRule::Range { min, max } => Bounds { min, max },
            BoundRule::FromDefault => {
                if default > 0.0 {
                    Bounds {
                        min: default * 0.001,
                        max: default * 1000.0,
                    }
                } else if default == 0.0 {
                    Bounds { min: 0.0, max: 100.0 }
                } else {
                    Bounds {
                        min: -100.0,
                        max: 100.0,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_creation() {
        let bounds = Bounds::new(-1.0, 1.0).unwrap();
        assert_eq!(bounds.min, -1.0);
        assert_eq!(bounds.max, 1.0);
        assert!(bounds.is_finite());

        assert_eq!(
            Bounds::new(1.0, -1.0),
            Err(BoundsError::InvalidBounds { min: 1.0, max: -1.0 })
        );
        assert_eq!(Bounds::new(f64::NAN, 1.0), Err(BoundsError::NanBound));

        // Degenerate interval is allowed
        assert!(Bounds::new(3.0, 3.0).is_ok());
    }

    #[test]
    fn test_clamp() {
        let bounds = Bounds::new(0.0, 10.0).unwrap();
        assert_eq!(bounds.clamp(-5.0), 0.0);
        assert_eq!(bounds.clamp(5.0), 5.0);
        assert_eq!(bounds.clamp(15.0), 10.0);
        assert_eq!(bounds.clamp(f64::NAN), 0.0);
        assert_eq!(bounds.clamp(f64::INFINITY), 10.0);
    }

    #[test]
    fn test_rule_table() {
        assert_eq!(BoundRule::for_key("kf").resolve(1.0), Bounds { min: 1e-6, max: 100.0 });
        assert_eq!(BoundRule::for_key("reD").resolve(10.0).min, 1.1);
        assert_eq!(BoundRule::for_key("gamaD").resolve(0.02), Bounds { min: 0.0, max: 1.0 });
        assert_eq!(BoundRule::for_key("unknown_key"), BoundRule::FromDefault);
    }

    #[test]
    fn test_rule_from_default() {
        let rule = BoundRule::FromDefault;
        let b = rule.resolve(2.0);
        assert!((b.min - 0.002).abs() < 1e-15);
        assert!((b.max - 2000.0).abs() < 1e-9);
        assert_eq!(rule.resolve(0.0), Bounds { min: 0.0, max: 100.0 });
        assert_eq!(rule.resolve(-3.0), Bounds { min: -100.0, max: 100.0 });
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Interval {
        #[serde(with = "lower")]
        min: f64,
        #[serde(with = "upper")]
        max: f64,
    }

    #[test]
    fn test_open_ends_serialize_as_null() {
        let closed = Interval { min: 0.0, max: 5.0 };
        let json = serde_json::to_string(&closed).unwrap();
        assert_eq!(json, r#"{"min":0.0,"max":5.0}"#);

        let open = Interval { min: NEG_INFINITY, max: INFINITY };
        let json = serde_json::to_string(&open).unwrap();
        assert_eq!(json, r#"{"min":null,"max":null}"#);
        assert_eq!(serde_json::from_str::<Interval>(&json).unwrap(), open);
    }
}
