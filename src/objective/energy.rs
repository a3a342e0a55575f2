//! Energy objective for a single reference configuration.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::{apply_parameters, Model, ParameterSurface};
use crate::output::dump_to_file;
use crate::parameters::NestedParams;

use super::ObjectiveFunction;

/// Squared error between a predicted and a reference energy.
///
/// Each evaluation clones the model prototype, applies the parameters to
/// the clone and evaluates the fixed configuration.
#[derive(Debug, Clone)]
pub struct EnergyObjective<M: Model> {
    model: M,
    surface: ParameterSurface,
    configuration: M::Configuration,
    reference_energy: f64,
    tag: String,
    weight: f64,
}

/// Values written by [`EnergyObjective::dump`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReport {
    pub tag: String,
    pub reference_energy: f64,
    pub predicted_energy: f64,
    pub weight: f64,
    pub objective: f64,
}

impl<M: Model> EnergyObjective<M> {
    /// Create an objective bound to one configuration and its reference energy.
    pub fn new(
        model: M,
        configuration: M::Configuration,
        reference_energy: f64,
        tag: impl Into<String>,
    ) -> Self {
        let surface = model.surface();
        Self {
            model,
            surface,
            configuration,
            reference_energy,
            tag: tag.into(),
            weight: 1.0,
        }
    }

    /// Scale the squared error by `weight`.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn reference_energy(&self) -> f64 {
        self.reference_energy
    }

    pub fn configuration(&self) -> &M::Configuration {
        &self.configuration
    }

    /// Energy predicted by the model under `params`.
    pub fn predict(&self, params: &NestedParams) -> Result<f64> {
        let mut model = self.model.clone();
        apply_parameters(&mut model, &self.surface, params)?;
        model.energy(&self.configuration)
    }

    /// Evaluate and collect everything [`EnergyObjective::dump`] writes.
    pub fn report(&self, params: &NestedParams) -> Result<EnergyReport> {
        let predicted_energy = self.predict(params)?;
        Ok(EnergyReport {
            tag: self.tag.clone(),
            reference_energy: self.reference_energy,
            predicted_energy,
            weight: self.weight,
            objective: self.weight * (predicted_energy - self.reference_energy).powi(2),
        })
    }
}

impl<M: Model> ObjectiveFunction for EnergyObjective<M> {
    fn evaluate(&self, params: &NestedParams) -> Result<f64> {
        let predicted = self.predict(params)?;
        Ok(self.weight * (predicted - self.reference_energy).powi(2))
    }

    fn parameter_surface(&self) -> Option<ParameterSurface> {
        Some(self.surface.clone())
    }

    fn dump(&self, params: &NestedParams, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        dump_to_file(&dir.join("configuration.json"), &self.configuration)?;
        dump_to_file(&dir.join("energy.json"), &self.report(params)?)?;
        dump_to_file(&dir.join("parameters.json"), params)
    }
}
