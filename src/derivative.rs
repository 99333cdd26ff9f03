//! Pressure log-derivative and the observed series used as fitting target.
//!
//! The log-derivative `dp / d(ln t)` is the primary diagnostic curve in
//! pressure-transient analysis. It is estimated with a three-point weighted
//! finite difference in log-time (Bourdet-style, no smoothing window).

use ndarray::Array1;

use crate::error::{FitError, Result};

/// Log-time gaps smaller than this are treated as duplicate samples.
const LOG_TIME_EPSILON: f64 = 1e-9;

/// Readings with magnitude below this are not used as the initial pressure.
const INITIAL_PRESSURE_THRESHOLD: f64 = 1e-6;

/// Estimate `dp / d(ln t)` for each sample.
///
/// The first and last points, any point adjacent to a near-duplicate time,
/// and every point of a series shorter than three samples are zero.
/// `time` must be strictly positive; lengths must match (the shorter length
/// wins otherwise).
///
/// # Examples
///
/// ```
/// use welltest_fit::derivative::log_derivative;
///
/// let t = [1.0, 10.0, 100.0];
/// let p = [0.0, 2.0, 4.0];
/// let d = log_derivative(&t, &p);
/// assert!((d[1] - 2.0 / 10f64.ln()).abs() < 1e-12);
/// assert_eq!(d[0], 0.0);
/// ```
pub fn log_derivative(time: &[f64], pressure: &[f64]) -> Vec<f64> {
    let n = time.len().min(pressure.len());
    let mut derivative = vec![0.0; n];
    if n < 3 {
        return derivative;
    }

    for i in 1..n - 1 {
        let l0 = time[i - 1].ln();
        let l1 = time[i].ln();
        let l2 = time[i + 1].ln();

        if (l1 - l0).abs() < LOG_TIME_EPSILON || (l2 - l1).abs() < LOG_TIME_EPSILON {
            continue;
        }

        let d1 = (pressure[i] - pressure[i - 1]) / (l1 - l0);
        let d2 = (pressure[i + 1] - pressure[i]) / (l2 - l1);
        let w1 = (l2 - l1) / (l2 - l0);
        let w2 = (l1 - l0) / (l2 - l0);
        derivative[i] = d1 * w1 + d2 * w2;
    }

    derivative
}

/// Observed time, pressure and log-derivative samples.
///
/// All three arrays have equal length, every time is strictly positive and
/// time is non-decreasing. The series is read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSeries {
    time: Array1<f64>,
    pressure: Array1<f64>,
    derivative: Array1<f64>,
}

impl ObservedSeries {
    /// Validate a raw series and compute its log-derivative.
    ///
    /// Empty and single-point series are accepted and produce zero
    /// derivatives.
    pub fn new(time: Vec<f64>, pressure: Vec<f64>) -> Result<Self> {
        validate(&time, &pressure)?;
        let derivative = log_derivative(&time, &pressure);
        Ok(Self {
            time: Array1::from_vec(time),
            pressure: Array1::from_vec(pressure),
            derivative: Array1::from_vec(derivative),
        })
    }

    /// Build a series with an externally supplied derivative.
    pub fn with_derivative(time: Vec<f64>, pressure: Vec<f64>, derivative: Vec<f64>) -> Result<Self> {
        validate(&time, &pressure)?;
        if derivative.len() != time.len() {
            return Err(FitError::DimensionMismatch(format!(
                "{} derivative samples for {} times",
                derivative.len(),
                time.len()
            )));
        }
        Ok(Self {
            time: Array1::from_vec(time),
            pressure: Array1::from_vec(pressure),
            derivative: Array1::from_vec(derivative),
        })
    }

    /// Build a series from raw gauge readings.
    ///
    /// Rows with `time <= 0` are dropped, and pressure is converted to the
    /// change `|p - p_initial|` relative to the first reading whose magnitude
    /// exceeds a small threshold.
    pub fn from_gauge_readings(time: &[f64], pressure: &[f64]) -> Result<Self> {
        if time.len() != pressure.len() {
            return Err(FitError::DimensionMismatch(format!(
                "{} times but {} pressures",
                time.len(),
                pressure.len()
            )));
        }

        let initial = pressure
            .iter()
            .copied()
            .find(|p| p.abs() > INITIAL_PRESSURE_THRESHOLD)
            .unwrap_or(0.0);

        let (t, dp): (Vec<f64>, Vec<f64>) = time
            .iter()
            .zip(pressure)
            .filter(|(t, _)| **t > 0.0)
            .map(|(t, p)| (*t, (p - initial).abs()))
            .unzip();

        Self::new(t, dp)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn pressure(&self) -> &Array1<f64> {
        &self.pressure
    }

    pub fn derivative(&self) -> &Array1<f64> {
        &self.derivative
    }
}

fn validate(time: &[f64], pressure: &[f64]) -> Result<()> {
    if time.len() != pressure.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} times but {} pressures",
            time.len(),
            pressure.len()
        )));
    }
    if let Some((i, t)) = time.iter().enumerate().find(|(_, t)| !(**t > 0.0) || !t.is_finite()) {
        return Err(FitError::InvalidInput(format!(
            "time[{}] = {} is not a positive finite value",
            i, t
        )));
    }
    if let Some(i) = time.windows(2).position(|w| w[1] < w[0]) {
        return Err(FitError::InvalidInput(format!(
            "time is not sorted: time[{}] = {} > time[{}] = {}",
            i,
            time[i],
            i + 1,
            time[i + 1]
        )));
    }
    if let Some(i) = pressure.iter().position(|p| !p.is_finite()) {
        return Err(FitError::InvalidInput(format!("pressure[{}] is not finite", i)));
    }
    Ok(())
}
