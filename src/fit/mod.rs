//! Running fits off the caller's thread.
//!
//! [`FitController`] runs one optimization in the background and reports
//! progress over a channel. [`FittingSession`] ties a controller to the
//! parameter catalog and guarantees a single active run.

pub mod controller;
pub mod session;

pub use controller::{FitController, FitEvent, FitOutcome, FitRequest, ProgressSnapshot};
pub use session::{FittingSession, DEFAULT_WEIGHT};
