//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides a bounded Levenberg-Marquardt optimizer for nonlinear
//! least-squares problems. Runs can be observed after every accepted
//! iteration and cancelled cooperatively from another thread.

pub mod algorithm;
pub mod cancel;
pub mod config;
pub mod convergence;
pub mod step;

// Re-export key types
pub use algorithm::{IterationObserver, LevenbergMarquardt, LmResult, OptimizationState};
pub use cancel::CancellationToken;
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::NormalEquations;
