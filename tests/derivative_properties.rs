//! Properties of the log-derivative estimator.

use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use welltest_fit::{log_derivative, FitError, ObservedSeries};

/// Strictly increasing positive times with random spacing.
fn random_times(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    let mut t = rng.gen_range(1e-3..1.0);
    (0..n)
        .map(|_| {
            t *= 1.0 + rng.gen_range(0.01..1.0);
            t
        })
        .collect()
}

#[test]
fn test_boundary_points_are_zero() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for n in 3..40 {
        let time = random_times(&mut rng, n);
        let pressure: Vec<f64> = (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect();
        let d = log_derivative(&time, &pressure);
        assert_eq!(d.len(), n);
        assert_eq!(d[0], 0.0);
        assert_eq!(d[n - 1], 0.0);
    }
}

#[test]
fn test_log_linear_pressure_has_constant_derivative() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    for _ in 0..50 {
        let a = rng.gen_range(-100.0..100.0);
        let b = rng.gen_range(-10.0..10.0);
        let time = random_times(&mut rng, 25);
        let pressure: Vec<f64> = time.iter().map(|t| a + b * t.ln()).collect();

        let d = log_derivative(&time, &pressure);
        for value in &d[1..d.len() - 1] {
            assert_relative_eq!(*value, b, epsilon = 1e-8, max_relative = 1e-8);
        }
    }
}

#[test]
fn test_short_and_empty_observed_series() {
    let empty = ObservedSeries::new(vec![], vec![]).unwrap();
    assert!(empty.is_empty());
    let single = ObservedSeries::new(vec![2.0], vec![1.0]).unwrap();
    assert_eq!(single.derivative().to_vec(), vec![0.0]);
}

#[test]
fn test_duplicate_times_give_zero() {
    let time = [1.0, 2.0, 2.0, 4.0, 8.0];
    let pressure = [0.0, 1.0, 1.5, 2.0, 3.0];
    let d = log_derivative(&time, &pressure);
    assert_eq!(d[1], 0.0);
    assert_eq!(d[2], 0.0);
    assert!(d[3] != 0.0);
}

#[test]
fn test_invalid_series_rejected() {
    assert!(matches!(
        ObservedSeries::new(vec![1.0, 2.0], vec![1.0]),
        Err(FitError::DimensionMismatch(_))
    ));
    assert!(matches!(
        ObservedSeries::new(vec![0.0, 1.0], vec![1.0, 2.0]),
        Err(FitError::InvalidInput(_))
    ));
    assert!(matches!(
        ObservedSeries::new(vec![2.0, 1.0], vec![1.0, 2.0]),
        Err(FitError::InvalidInput(_))
    ));
}

#[test]
fn test_gauge_readings_become_pressure_change() {
    let time = [0.0, 0.5, 1.0, 2.0, 4.0];
    let gauge = [30.0, 29.0, 27.5, 26.0, 25.0];
    let series = ObservedSeries::from_gauge_readings(&time, &gauge).unwrap();

    // t = 0 is dropped, initial pressure is the first reading
    assert_eq!(series.len(), 4);
    assert_eq!(series.time().to_vec(), vec![0.5, 1.0, 2.0, 4.0]);
    assert_eq!(series.pressure().to_vec(), vec![1.0, 2.5, 4.0, 5.0]);
    assert_eq!(series.derivative()[0], 0.0);
}
