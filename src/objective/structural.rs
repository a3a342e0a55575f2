//! Structural target objective.
//!
//! Drives a fixed-length trajectory of a configuration under the current
//! parameters and compares a geometric quantity of the end point, such as
//! the distance between two bodies, with a target value.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{FitError, Result};
use crate::model::{apply_parameters, HasPositions, Model, ParameterSurface};
use crate::output::dump_to_file;
use crate::parameters::NestedParams;

use super::ObjectiveFunction;

/// Extracts a scalar geometric quantity from a configuration.
pub trait GeometricProbe<C>: Send + Sync {
    fn measure(&self, configuration: &C) -> Result<f64>;
}

impl<C, F> GeometricProbe<C> for F
where
    F: Fn(&C) -> f64 + Send + Sync,
{
    fn measure(&self, configuration: &C) -> Result<f64> {
        Ok(self(configuration))
    }
}

/// Euclidean distance between two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairDistance {
    pub first: usize,
    pub second: usize,
}

impl PairDistance {
    pub fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }
}

impl<C: HasPositions> GeometricProbe<C> for PairDistance {
    fn measure(&self, configuration: &C) -> Result<f64> {
        let positions = configuration.positions();
        let body = |i: usize| {
            positions.get(i).ok_or_else(|| {
                FitError::DimensionMismatch(format!(
                    "Body index {} out of range for {} bodies",
                    i,
                    positions.len()
                ))
            })
        };
        let (a, b) = (body(self.first)?, body(self.second)?);
        Ok(a.iter()
            .zip(b.iter())
            .map(|(p, q)| (p - q).powi(2))
            .sum::<f64>()
            .sqrt())
    }
}

/// Squared error between a measured end-of-trajectory quantity and a target.
pub struct StructuralTargetObjective<M: Model, P> {
    model: M,
    surface: ParameterSurface,
    configuration: M::Configuration,
    probe: P,
    target: f64,
    dt: f64,
    max_steps: usize,
    tag: String,
}

/// Values written by [`StructuralTargetObjective::dump`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralReport {
    pub tag: String,
    pub target: f64,
    pub measured: f64,
    pub dt: f64,
    pub max_steps: usize,
    pub objective: f64,
}

impl<M, P> StructuralTargetObjective<M, P>
where
    M: Model,
    P: GeometricProbe<M::Configuration>,
{
    /// Create an objective that runs `max_steps` steps of size `dt`.
    pub fn new(
        model: M,
        configuration: M::Configuration,
        probe: P,
        target: f64,
        dt: f64,
        max_steps: usize,
        tag: impl Into<String>,
    ) -> Self {
        let surface = model.surface();
        Self {
            model,
            surface,
            configuration,
            probe,
            target,
            dt,
            max_steps,
            tag: tag.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// End point of the trajectory under `params`.
    pub fn propagate(&self, params: &NestedParams) -> Result<M::Configuration> {
        let mut model = self.model.clone();
        apply_parameters(&mut model, &self.surface, params)?;

        let mut configuration = self.configuration.clone();
        for _ in 0..self.max_steps {
            model.propagate(&mut configuration, self.dt)?;
        }
        Ok(configuration)
    }

    /// Measured quantity at the end of the trajectory under `params`.
    pub fn measure(&self, params: &NestedParams) -> Result<f64> {
        self.probe.measure(&self.propagate(params)?)
    }
}

impl<M, P> ObjectiveFunction for StructuralTargetObjective<M, P>
where
    M: Model,
    P: GeometricProbe<M::Configuration>,
{
    fn evaluate(&self, params: &NestedParams) -> Result<f64> {
        Ok((self.measure(params)? - self.target).powi(2))
    }

    fn parameter_surface(&self) -> Option<ParameterSurface> {
        Some(self.surface.clone())
    }

    fn dump(&self, params: &NestedParams, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let end = self.propagate(params)?;
        let measured = self.probe.measure(&end)?;

        dump_to_file(&dir.join("configuration.json"), &end)?;
        dump_to_file(
            &dir.join("structure.json"),
            &StructuralReport {
                tag: self.tag.clone(),
                target: self.target,
                measured,
                dt: self.dt,
                max_steps: self.max_steps,
                objective: (measured - self.target).powi(2),
            },
        )?;
        dump_to_file(&dir.join("parameters.json"), params)
    }
}
