//! # Parameter System
//!
//! Named, bounded, partially-free parameters for the reservoir model
//! variants.
//!
//! ## Core Components
//!
//! - [`ModelVariant`]: the analytic formulations and their fixed parameter order
//! - [`Parameter`]: a value with bounds, a fit flag and presentation metadata
//! - [`Bounds`] and [`BoundRule`]: intervals and the default bound policy
//! - [`ParameterSet`] and [`ParameterCatalog`]: the ordered set for the active
//!   variant, including variant switching and session save/restore
//!
//! ## Example Usage
//!
//! ```rust
//! use welltest_fit::parameters::{ModelVariant, ParameterCatalog};
//!
//! let mut catalog = ParameterCatalog::new(ModelVariant::InfiniteChangingStorage);
//! catalog.get_mut().set_value("kf", 5.0).unwrap();
//! catalog.get_mut().set_fit("kf", true).unwrap();
//!
//! // Values of shared parameters survive a variant switch
//! assert!(catalog.switch_variant(ModelVariant::ClosedChangingStorage));
//! assert_eq!(catalog.get().get("kf").unwrap().value(), 5.0);
//! ```

pub mod bounds;
pub mod catalog;
pub mod parameter;
pub mod variant;

// Re-export key types
pub use bounds::{BoundRule, Bounds, BoundsError};
pub use catalog::{ParameterCatalog, ParameterMap, ParameterSet, ParameterState, SessionState};
pub use parameter::{Parameter, ParameterInfo};
pub use variant::ModelVariant;
