//! End-to-end fits through the Fitter

use approx::assert_relative_eq;
use paramfit_rs::backend::{
    BackendConfig, ConvergenceStatus, GlobalDerivativeFreeBackend, LocalBoundedBackend,
};
use paramfit_rs::error::{FitError, Result};
use paramfit_rs::fitter::Fitter;
use paramfit_rs::model::Model;
use paramfit_rs::objective::{AggregateObjective, EnergyObjective};
use paramfit_rs::output::select_parameters;
use paramfit_rs::parameters::{Bounds, NestedBounds, NestedParams};

use crate::test_helpers::{dimer_params, init_tracing, quadratic, Dimer, HarmonicDimer};

#[test]
fn test_deterministic_convergence() {
    init_tracing();
    let initial = NestedParams::from_scalars([("x", 0.0), ("y", 0.0)]).unwrap();
    let fitter = Fitter::new(quadratic, initial).unwrap();

    let optimal = fitter
        .fit(&LocalBoundedBackend::new().with_tolerance(1e-4))
        .unwrap();

    assert_relative_eq!(optimal.scalar("x").unwrap(), 2.0, epsilon = 1e-2);
    assert_relative_eq!(optimal.scalar("y").unwrap(), -1.0, epsilon = 1e-2);
}

#[test]
fn test_reordering_invariance() {
    let nested = |p: &NestedParams| -> Result<f64> {
        let a = p.scalar("group.a").unwrap_or(0.0);
        let b = p.scalar("group.b").unwrap_or(0.0);
        let c = p.scalar("c").unwrap_or(0.0);
        Ok((a - 1.0).powi(2) + 2.0 * (b + 0.5).powi(2) + (c - a * b).powi(2))
    };
    let first: NestedParams =
        serde_json::from_str(r#"{"group": {"a": 0.0, "b": 0.0}, "c": 0.0}"#).unwrap();
    let second: NestedParams =
        serde_json::from_str(r#"{"c": 0.0, "group": {"b": 0.0, "a": 0.0}}"#).unwrap();

    let backend = LocalBoundedBackend::new();
    let a = Fitter::new(nested, first).unwrap().fit(&backend).unwrap();
    let b = Fitter::new(nested, second).unwrap().fit(&backend).unwrap();

    assert_eq!(a, b);
    assert_relative_eq!(a.scalar("group.a").unwrap(), 1.0, epsilon = 1e-3);
    assert_relative_eq!(a.scalar("c").unwrap(), -0.5, epsilon = 1e-3);
}

#[test]
fn test_unbounded_with_budget() {
    init_tracing();
    let initial = NestedParams::from_scalars([("x", 0.0), ("y", 0.0)]).unwrap();
    let fitter = Fitter::new(quadratic, initial).unwrap();

    let result = fitter
        .fit_with_diagnostics(&GlobalDerivativeFreeBackend::new(50))
        .unwrap();

    assert_eq!(result.history.len(), 50);
    assert_eq!(result.backend.func_evals, 50);
    assert_eq!(result.backend.status, ConvergenceStatus::BudgetExhausted);
    assert!(result.params.scalar("x").unwrap().is_finite());
    assert!(result.params.scalar("y").unwrap().is_finite());
}

#[test]
fn test_non_convergence_still_returns() {
    init_tracing();
    let oscillating = |p: &NestedParams| -> Result<f64> {
        let x = p.scalar("x").unwrap_or(0.0);
        Ok(1e-3 * (40.0 * x).cos() + 1e-6 * x * x)
    };
    let initial = NestedParams::from_scalars([("x", 0.1)]).unwrap();
    let fitter = Fitter::new(oscillating, initial).unwrap();

    let config: BackendConfig = serde_json::from_str(
        r#"{"backend": "local", "ftol": 1e-300, "gtol": 1e-300, "max_iterations": 1}"#,
    )
    .unwrap();
    let result = fitter.fit_with_config(&config).unwrap();

    assert!(!result.backend.success());
    assert!(result.final_cost.is_finite());
    assert!(result.final_cost <= result.initial_cost);
}

#[test]
fn test_unknown_parameter_rejected_at_construction() {
    let objective = EnergyObjective::new(HarmonicDimer::default(), Dimer::along_x(1.0), 0.0, "dimer");
    let initial = NestedParams::from_scalars([("bond.k", 1.0), ("angle.theta0", 104.5)]).unwrap();

    assert!(matches!(
        Fitter::new(objective, initial),
        Err(FitError::UnknownParameter { name }) if name == "angle.theta0"
    ));
}

#[test]
fn test_recovers_dimer_parameters() {
    init_tracing();
    let mut truth = HarmonicDimer::default();
    truth.set_parameter("bond.k", 2.5).unwrap();
    truth.set_parameter("bond.r0", 0.97).unwrap();
    truth.set_parameter("offset", -0.3).unwrap();

    let records: Vec<(Dimer, String, f64)> = [0.6, 0.8, 1.0, 1.2, 1.5]
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            let dimer = Dimer::along_x(r);
            let energy = truth.energy(&dimer).unwrap();
            (dimer, format!("dimer_{}", i), energy)
        })
        .collect();
    let objective = AggregateObjective::from_energy_records(&HarmonicDimer::default(), records);

    let defaults = dimer_params(1.0, 1.0, 0.0);
    let initial = select_parameters(["bond.k", "bond.r0", "offset"], &defaults).unwrap();
    let mut bounds = NestedBounds::new();
    bounds.insert("bond.k", Bounds::new(0.1, 10.0).unwrap()).unwrap();
    bounds.insert("bond.r0", Bounds::min_only(0.5)).unwrap();

    let result = Fitter::new(objective, initial)
        .unwrap()
        .with_bounds(bounds)
        .fit_with_diagnostics(&LocalBoundedBackend::new().with_tolerance(1e-10))
        .unwrap();

    assert!(result.final_cost < 1e-6, "{}", result);
    assert_relative_eq!(result.params.scalar("bond.k").unwrap(), 2.5, epsilon = 5e-2);
    assert_relative_eq!(result.params.scalar("bond.r0").unwrap(), 0.97, epsilon = 1e-2);
    assert_relative_eq!(result.params.scalar("offset").unwrap(), -0.3, epsilon = 1e-2);
}
