//! Parameter definition and implementation
//!
//! A [`Parameter`] is one physical quantity of a reservoir model. Its
//! presentation metadata is looked up from a static table keyed by name,
//! while the value, bounds and fit flag are user-editable.

use crate::parameters::bounds::{BoundRule, Bounds, BoundsError};

/// Static description of a known parameter key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterInfo {
    pub key: &'static str,
    pub display_name: &'static str,
    pub symbol: &'static str,
    pub unit: &'static str,
    pub default: f64,
}

const fn info(
    key: &'static str,
    display_name: &'static str,
    symbol: &'static str,
    unit: &'static str,
    default: f64,
) -> ParameterInfo {
    ParameterInfo {
        key,
        display_name,
        symbol,
        unit,
        default,
    }
}

/// Known parameters. Defaults are shared by every model variant.
const PARAMETER_INFO: &[ParameterInfo] = &[
    info("phi", "Porosity", "φ", "fraction", 0.05),
    info("h", "Net thickness", "h", "m", 20.0),
    info("mu", "Viscosity", "μ", "mPa·s", 0.5),
    info("B", "Formation volume factor", "B", "", 1.05),
    info("Ct", "Total compressibility", "Cₜ", "MPa⁻¹", 5e-4),
    info("q", "Rate", "q", "m³/d", 5.0),
    info("nf", "Number of fractures", "n_f", "", 4.0),
    info("kf", "Inner-zone permeability", "k_f", "mD", 1.0),
    info("km", "Outer-zone permeability", "kₘ", "mD", 0.1),
    info("L", "Horizontal well length", "L", "m", 1000.0),
    info("Lf", "Fracture half-length", "L_f", "m", 100.0),
    info("rmD", "Composite radius", "rₘᴅ", "", 4.0),
    info("omega1", "Inner-zone storativity ratio", "ω₁", "", 0.4),
    info("omega2", "Outer-zone storativity ratio", "ω₂", "", 0.08),
    info("lambda1", "Interporosity flow coefficient", "λ₁", "", 1e-3),
    info("gamaD", "Permeability modulus", "γᴅ", "", 0.02),
    info("reD", "Outer boundary radius", "reD", "", 10.0),
    info("cD", "Wellbore storage", "Cᴅ", "", 10.0),
    info("S", "Skin factor", "S", "", 1.0),
];

impl ParameterInfo {
    /// Look up the metadata of a known key.
    pub fn lookup(key: &str) -> Option<&'static ParameterInfo> {
        PARAMETER_INFO.iter().find(|p| p.key == key)
    }
}

/// A fittable physical quantity.
///
/// The invariant `min <= value <= max` holds after every mutation; setters
/// clamp instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Stable key, unique within a parameter set
    name: String,

    /// Human readable name
    display_name: String,

    /// Plain-text symbol
    symbol: String,

    /// Unit label (empty for dimensionless quantities)
    unit: String,

    /// Current value of the parameter
    value: f64,

    /// Whether the optimizer may adjust this parameter
    is_fit: bool,

    /// Minimum and maximum bounds for the parameter value
    bounds: Bounds,
}

impl Parameter {
    /// Create the default parameter for a key.
    ///
    /// Known keys take their default value, metadata and bound rule from the
    /// static tables. Unknown keys start at zero with the key as display
    /// name and value-derived bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use welltest_fit::parameters::Parameter;
    ///
    /// let skin = Parameter::with_default("S");
    /// assert_eq!(skin.min(), -5.0);
    /// assert!(!skin.is_fit());
    /// ```
    pub fn with_default(key: &str) -> Self {
        match ParameterInfo::lookup(key) {
            Some(info) => {
                let bounds = BoundRule::for_key(key).resolve(info.default);
                Self {
                    name: key.to_string(),
                    display_name: info.display_name.to_string(),
                    symbol: info.symbol.to_string(),
                    unit: info.unit.to_string(),
                    value: bounds.clamp(info.default),
                    is_fit: false,
                    bounds,
                }
            }
            None => {
                let bounds = BoundRule::for_key(key).resolve(0.0);
                Self {
                    name: key.to_string(),
                    display_name: key.to_string(),
                    symbol: key.to_string(),
                    unit: String::new(),
                    value: 0.0,
                    is_fit: false,
                    bounds,
                }
            }
        }
    }

    /// Create a parameter with explicit value and bounds, clamping the value.
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, BoundsError> {
        let bounds = Bounds::new(min, max)?;
        let mut param = Self::with_default(name);
        param.bounds = bounds;
        param.value = bounds.clamp(value);
        Ok(param)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Get the current value of the parameter
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value, clamping it into `[min, max]`.
    ///
    /// Returns the value actually stored.
    pub fn set_value(&mut self, value: f64) -> f64 {
        self.value = self.bounds.clamp(value);
        self.value
    }

    pub fn is_fit(&self) -> bool {
        self.is_fit
    }

    pub fn set_fit(&mut self, is_fit: bool) {
        self.is_fit = is_fit;
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    /// Replace the bounds and re-clamp the current value.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), BoundsError> {
        self.bounds = Bounds::new(min, max)?;
        self.value = self.bounds.clamp(self.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_default() {
        let param = Parameter::with_default("kf");
        assert_eq!(param.name(), "kf");
        assert_eq!(param.unit(), "mD");
        assert_eq!(param.value(), 1.0);
        assert_eq!(param.min(), 1e-6);
        assert_eq!(param.max(), 100.0);
        assert!(!param.is_fit());
    }

    #[test]
    fn test_unknown_default() {
        let param = Parameter::with_default("tortuosity");
        assert_eq!(param.display_name(), "tortuosity");
        assert_eq!(param.value(), 0.0);
        assert_eq!(param.min(), 0.0);
        assert_eq!(param.max(), 100.0);
    }

    #[test]
    fn test_every_known_default_is_in_bounds() {
        for info in PARAMETER_INFO {
            let param = Parameter::with_default(info.key);
            assert!(param.bounds().is_within_bounds(info.default), "{}", info.key);
        }
    }

    #[test]
    fn test_set_value_clamps() {
        let mut param = Parameter::with_default("omega1");
        assert_eq!(param.set_value(3.0), 1.0);
        assert_eq!(param.set_value(-1.0), 0.001);
        assert_eq!(param.set_value(0.5), 0.5);
    }

    #[test]
    fn test_set_bounds_reclamps() {
        let mut param = Parameter::with_bounds("S", 20.0, -5.0, 50.0).unwrap();
        param.set_bounds(-1.0, 10.0).unwrap();
        assert_eq!(param.value(), 10.0);
        assert!(param.set_bounds(5.0, 1.0).is_err());
        // Failed update leaves the old bounds in place
        assert_eq!(param.max(), 10.0);
    }
}
