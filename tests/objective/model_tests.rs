//! Tests for parameter application and single-term objectives

use approx::assert_relative_eq;
use paramfit_rs::error::{FitError, Result};
use paramfit_rs::model::{apply_parameters, Model, ParameterSurface};
use paramfit_rs::objective::{EnergyObjective, ObjectiveFunction, PairDistance, StructuralTargetObjective};
use paramfit_rs::parameters::NestedParams;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::test_helpers::{dimer_params, Dimer, HarmonicDimer};

/// Wraps the harmonic dimer and counts energy evaluations.
#[derive(Debug, Clone)]
struct Counted {
    inner: HarmonicDimer,
    energies: Arc<AtomicUsize>,
}

impl Model for Counted {
    type Configuration = Dimer;

    fn surface(&self) -> ParameterSurface {
        self.inner.surface()
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        self.inner.set_parameter(name, value)
    }

    fn energy(&self, dimer: &Dimer) -> Result<f64> {
        self.energies.fetch_add(1, Ordering::SeqCst);
        self.inner.energy(dimer)
    }
}

#[test]
fn test_unknown_parameter_before_any_energy() {
    let energies = Arc::new(AtomicUsize::new(0));
    let model = Counted {
        inner: HarmonicDimer::default(),
        energies: Arc::clone(&energies),
    };
    let objective = EnergyObjective::new(model, Dimer::along_x(1.2), 0.0, "dimer");

    let mut params = dimer_params(2.0, 1.0, 0.0);
    params.insert("polarizability.alpha", 1.47.into()).unwrap();

    match objective.evaluate(&params) {
        Err(FitError::UnknownParameter { name }) => assert_eq!(name, "polarizability.alpha"),
        other => panic!("Expected UnknownParameter, got {:?}", other),
    }
    assert_eq!(energies.load(Ordering::SeqCst), 0);

    objective.evaluate(&dimer_params(2.0, 1.0, 0.0)).unwrap();
    assert_eq!(energies.load(Ordering::SeqCst), 1);
}

#[test]
fn test_apply_parameters_leaves_model_untouched_on_error() {
    let mut model = HarmonicDimer::default();
    let surface = model.surface();
    let params = NestedParams::from_scalars([("bond.k", 9.0), ("bond.kk", 1.0)]).unwrap();

    assert!(apply_parameters(&mut model, &surface, &params).is_err());
    assert_eq!(model, HarmonicDimer::default());
}

#[test]
fn test_energy_objective_squared_error() {
    let objective = EnergyObjective::new(HarmonicDimer::default(), Dimer::along_x(1.5), 1.0, "stretched");

    // 0.5 * 4 * 0.25 + 0.5 = 1.0
    assert_relative_eq!(objective.evaluate(&dimer_params(4.0, 1.0, 0.5)).unwrap(), 0.0);
    // 0.5 * 2 * 0.25 = 0.25
    assert_relative_eq!(
        objective.evaluate(&dimer_params(2.0, 1.0, 0.0)).unwrap(),
        0.75f64.powi(2)
    );
}

#[test]
fn test_structural_target_relaxes_dimer() {
    let objective = StructuralTargetObjective::new(
        HarmonicDimer::default(),
        Dimer::along_x(2.0),
        PairDistance::new(0, 1),
        0.96,
        0.1,
        100,
        "oo_distance",
    );

    let params = dimer_params(1.0, 0.96, 0.0);
    assert_relative_eq!(objective.measure(&params).unwrap(), 0.96, epsilon = 1e-6);
    assert!(objective.evaluate(&params).unwrap() < 1e-12);

    let off = dimer_params(1.0, 1.2, 0.0);
    assert_relative_eq!(objective.evaluate(&off).unwrap(), 0.24f64.powi(2), epsilon = 1e-9);
}

#[test]
fn test_structural_target_without_trajectory_support() {
    let model = Counted {
        inner: HarmonicDimer::default(),
        energies: Arc::new(AtomicUsize::new(0)),
    };
    let objective = StructuralTargetObjective::new(
        model,
        Dimer::along_x(2.0),
        PairDistance::new(0, 1),
        1.0,
        0.1,
        3,
        "no_dynamics",
    );

    assert!(matches!(
        objective.evaluate(&dimer_params(1.0, 1.0, 0.0)),
        Err(FitError::NotImplemented(_))
    ));
}
