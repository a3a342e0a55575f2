//! Tests for the local bounded backend

use approx::assert_relative_eq;
use ndarray::{array, Array1};
use paramfit_rs::backend::{ConvergenceStatus, LocalBoundedBackend, LocalConfig, OptimizationBackend};
use paramfit_rs::error::Result;
use paramfit_rs::parameters::Bounds;

fn quadratic(p: &Array1<f64>) -> Result<f64> {
    Ok(2.0 * (p[0] - 2.0).powi(2) + 3.0 * (p[1] + 1.0).powi(2))
}

#[test]
fn test_quadratic_converges_without_bounds() {
    crate::test_helpers::init_tracing();
    let backend = LocalBoundedBackend::new().with_tolerance(1e-4);
    let result = backend.minimize(quadratic, &array![0.0, 0.0], None).unwrap();

    assert!(result.success());
    assert!(result.status.is_converged());
    assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-2);
    assert_relative_eq!(result.params[1], -1.0, epsilon = 1e-2);
}

#[test]
fn test_open_bounds_match_no_bounds() {
    let open = [Bounds::unbounded(), Bounds::unbounded()];
    let backend = LocalBoundedBackend::new();

    let with_open = backend.minimize(quadratic, &array![0.0, 0.0], Some(&open)).unwrap();
    let without = backend.minimize(quadratic, &array![0.0, 0.0], None).unwrap();

    assert_eq!(with_open.params, without.params);
    assert_eq!(with_open.func_evals, without.func_evals);
}

#[test]
fn test_half_open_bounds() {
    let bounds = [Bounds::max_only(1.5), Bounds::min_only(-0.5)];
    let backend = LocalBoundedBackend::new();
    let result = backend
        .minimize(quadratic, &array![0.0, 0.0], Some(&bounds))
        .unwrap();

    assert_relative_eq!(result.params[0], 1.5, epsilon = 1e-6);
    assert_relative_eq!(result.params[1], -0.5, epsilon = 1e-6);
}

#[test]
fn test_flat_objective_with_tight_tolerance() {
    crate::test_helpers::init_tracing();
    // Oscillating plateau: tiny gradients everywhere, many shallow minima
    let wobbly = |p: &Array1<f64>| -> Result<f64> { Ok(1e-3 * (50.0 * p[0]).sin() + 1.0) };
    let config = LocalConfig::default()
        .with_tolerance(1e-300)
        .with_max_iterations(1);
    let backend = LocalBoundedBackend::with_config(config);

    let result = backend.minimize(wobbly, &array![0.3], None).unwrap();
    assert!(result.cost.is_finite());
    assert!(result.params[0].is_finite());
    assert!(result.cost <= wobbly(&array![0.3]).unwrap());
    assert!(!result.success());
    assert!(matches!(
        result.status,
        ConvergenceStatus::MaxIterationsReached | ConvergenceStatus::LineSearchFailure
    ));
}

#[test]
fn test_bounds_length_mismatch() {
    let backend = LocalBoundedBackend::new();
    let bounds = [Bounds::unbounded()];
    assert!(backend
        .minimize(quadratic, &array![0.0, 0.0], Some(&bounds))
        .is_err());
}

#[test]
fn test_one_sided_infinite_bound() {
    let bounds = [Bounds::new(0.0, f64::INFINITY).unwrap(), Bounds::unbounded()];
    let backend = LocalBoundedBackend::new();
    let result = backend
        .minimize(quadratic, &array![0.0, 0.0], Some(&bounds))
        .unwrap();

    assert_relative_eq!(result.params[0], 2.0, epsilon = 1e-3);
    assert_relative_eq!(result.params[1], -1.0, epsilon = 1e-3);
}

#[test]
fn test_evaluations_are_counted() {
    let calls = std::sync::atomic::AtomicUsize::new(0);
    let counted = |p: &Array1<f64>| {
        calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        quadratic(p)
    };
    let result = LocalBoundedBackend::new()
        .minimize(counted, &array![0.0, 0.0], None)
        .unwrap();

    assert_eq!(result.func_evals, calls.load(std::sync::atomic::Ordering::SeqCst));
    assert!(result.cost <= quadratic(&array![0.0, 0.0]).unwrap());
}
