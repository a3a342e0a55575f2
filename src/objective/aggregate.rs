//! Weighted sum of tagged sub-objectives.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::model::{Model, ParameterSurface};
use crate::output::{dump_to_file, next_free_folder};
use crate::parameters::NestedParams;

use super::{file_stem, EnergyObjective, ObjectiveFunction};

/// One sub-objective of an [`AggregateObjective`].
pub struct ObjectiveTerm {
    pub objective: Box<dyn ObjectiveFunction>,
    pub tag: String,
    pub weight: f64,
}

impl std::fmt::Debug for ObjectiveTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectiveTerm")
            .field("tag", &self.tag)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Value of one term at a given parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermBreakdown {
    pub tag: String,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// Sum of `weight * term(params)` over an ordered list of terms.
///
/// Terms are kept in insertion order; tags label them in breakdowns and
/// output folders and need not be unique.
#[derive(Debug, Default)]
pub struct AggregateObjective {
    terms: Vec<ObjectiveTerm>,
}

impl AggregateObjective {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term with weight 1.
    pub fn add<O>(&mut self, objective: O, tag: impl Into<String>) -> &mut Self
    where
        O: ObjectiveFunction + 'static,
    {
        self.add_weighted(objective, tag, 1.0)
    }

    /// Add a term scaled by `weight`.
    pub fn add_weighted<O>(&mut self, objective: O, tag: impl Into<String>, weight: f64) -> &mut Self
    where
        O: ObjectiveFunction + 'static,
    {
        self.terms.push(ObjectiveTerm {
            objective: Box::new(objective),
            tag: tag.into(),
            weight,
        });
        self
    }

    /// Build one [`EnergyObjective`] term per `(configuration, tag, reference)` record.
    pub fn from_energy_records<M, I, S>(model: &M, records: I) -> Self
    where
        M: Model + 'static,
        I: IntoIterator<Item = (M::Configuration, S, f64)>,
        S: Into<String>,
    {
        let mut aggregate = Self::new();
        for (configuration, tag, reference) in records {
            let tag = tag.into();
            aggregate.add(
                EnergyObjective::new(model.clone(), configuration, reference, tag.clone()),
                tag,
            );
        }
        aggregate
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.tag.as_str())
    }

    /// Evaluate every term at `params`.
    pub fn breakdown(&self, params: &NestedParams) -> Result<Vec<TermBreakdown>> {
        self.validate(params)?;
        self.terms
            .iter()
            .map(|term| {
                let value = term.objective.evaluate(params)?;
                Ok(TermBreakdown {
                    tag: term.tag.clone(),
                    value,
                    weight: term.weight,
                    contribution: term.weight * value,
                })
            })
            .collect()
    }

    /// Write initial and optimal parameters with their breakdowns into the
    /// first free folder derived from `base`, plus one sub-folder per term
    /// dumped at the optimal parameters.
    ///
    /// Returns the folder that was written.
    pub fn write_output(
        &self,
        base: &Path,
        initial: &NestedParams,
        optimal: &NestedParams,
    ) -> Result<PathBuf> {
        let dir = next_free_folder(base);
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Writing fit output");

        dump_to_file(&dir.join("initial_params.json"), initial)?;
        dump_to_file(&dir.join("optimal_params.json"), optimal)?;
        dump_to_file(&dir.join("breakdown_initial.json"), &self.breakdown(initial)?)?;
        dump_to_file(&dir.join("breakdown_optimal.json"), &self.breakdown(optimal)?)?;
        self.dump_terms(optimal, &dir)?;
        Ok(dir)
    }

    fn validate(&self, params: &NestedParams) -> Result<()> {
        for term in &self.terms {
            if let Some(surface) = term.objective.parameter_surface() {
                surface.validate(params)?;
            }
        }
        Ok(())
    }

    fn dump_terms(&self, params: &NestedParams, dir: &Path) -> Result<()> {
        for (i, term) in self.terms.iter().enumerate() {
            let sub = dir.join(format!("term_{}_{}", i, file_stem(&term.tag)));
            term.objective.dump(params, &sub)?;
        }
        Ok(())
    }
}

impl ObjectiveFunction for AggregateObjective {
    fn evaluate(&self, params: &NestedParams) -> Result<f64> {
        self.validate(params)?;
        let mut total = 0.0;
        for term in &self.terms {
            total += term.weight * term.objective.evaluate(params)?;
        }
        Ok(total)
    }

    /// Names assignable on every bound term.
    fn parameter_surface(&self) -> Option<ParameterSurface> {
        self.terms
            .iter()
            .filter_map(|t| t.objective.parameter_surface())
            .reduce(|acc, s| acc.intersection(&s))
    }

    fn dump(&self, params: &NestedParams, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        dump_to_file(&dir.join("breakdown.json"), &self.breakdown(params)?)?;
        self.dump_terms(params, dir)
    }
}
