//! # welltest-fit
//!
//! `welltest-fit` matches an observed pressure transient from a well test
//! against analytic reservoir-model curves by estimating the free physical
//! parameters with a bounded Levenberg-Marquardt optimizer.
//!
//! The library provides:
//! - Logarithmic pressure-derivative estimation for observed data
//! - Per-variant parameter catalogs with default bounds and fit flags
//! - A weighted pressure/derivative residual over any [`ModelEvaluator`]
//! - A bounded Levenberg-Marquardt optimizer with finite-difference Jacobians
//! - Background fit runs with progress snapshots and cooperative cancellation
//!
//! ## Basic Usage
//!
//! ```
//! use std::sync::Arc;
//! use ndarray::Array1;
//! use welltest_fit::{FittingSession, ModelCurves, ModelVariant, ObservedSeries, ParameterMap};
//!
//! // A stand-in evaluator: p = q·mu/(kf·h) · ln(1 + t)
//! let evaluator = |_: ModelVariant, p: &ParameterMap, t: &[f64]| {
//!     let a = p["q"] * p["mu"] / (p["kf"] * p["h"]);
//!     let time = Array1::from_vec(t.to_vec());
//!     let pressure = time.mapv(|t| a * (1.0 + t).ln());
//!     let derivative = time.mapv(|t| a * t / (1.0 + t));
//!     ModelCurves::new(time, pressure, derivative)
//! };
//!
//! let time: Vec<f64> = (1..=30).map(|i| 0.1 * i as f64).collect();
//! let a = 5.0 * 0.5 / (2.0 * 20.0);
//! let pressure: Vec<f64> = time.iter().map(|t| a * (1.0 + t).ln()).collect();
//!
//! let mut session = FittingSession::new(Arc::new(evaluator));
//! session.load_observed(ObservedSeries::new(time, pressure).unwrap());
//! session.set_weight(1.0).unwrap();
//! session.catalog_mut().get_mut().set_fit("kf", true).unwrap();
//!
//! session.start_fit().unwrap();
//! let outcome = session.wait_for_fit().unwrap().unwrap();
//! assert!((outcome.parameters["kf"] - 2.0).abs() < 1e-4);
//! ```

// Public modules
pub mod derivative;
pub mod error;
pub mod fit;
pub mod lm;
pub mod model;
pub mod parameters;
pub mod problem;
pub mod residual;
pub mod utils;

// Re-exports for convenience
pub use derivative::{log_derivative, ObservedSeries};
pub use error::{FitError, Result};
pub use fit::{FitController, FitEvent, FitOutcome, FitRequest, FittingSession, ProgressSnapshot};
pub use lm::{CancellationToken, ConvergenceStatus, LevenbergMarquardt, LmConfig, LmResult};
pub use model::{EvaluationError, ModelCurves, ModelEvaluator};
pub use parameters::{ModelVariant, Parameter, ParameterCatalog, ParameterMap, ParameterSet, SessionState};
pub use problem::Problem;
pub use residual::WellTestProblem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
