//! Objective functions.
//!
//! An objective maps nested parameters to a scalar mismatch; lower is better.
//! This module provides:
//!
//! - [`EnergyObjective`]: squared error of one predicted energy
//! - [`StructuralTargetObjective`]: squared error of a geometric quantity
//!   measured after a fixed-length trajectory
//! - [`AggregateObjective`]: weighted sum of tagged sub-objectives
//!
//! Plain closures `Fn(&NestedParams) -> Result<f64>` are objectives too.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::model::ParameterSurface;
use crate::output::dump_to_file;
use crate::parameters::NestedParams;

mod aggregate;
mod energy;
mod structural;

pub use aggregate::{AggregateObjective, ObjectiveTerm, TermBreakdown};
pub use energy::{EnergyObjective, EnergyReport};
pub use structural::{GeometricProbe, PairDistance, StructuralReport, StructuralTargetObjective};

/// A scalar function of nested parameters to be minimized.
///
/// Objectives are evaluated many times during one fit, possibly from
/// several threads at once, and must not carry state between evaluations.
pub trait ObjectiveFunction: Send + Sync {
    /// Evaluate the objective at `params`.
    fn evaluate(&self, params: &NestedParams) -> Result<f64>;

    /// Names the objective can assign, if it is bound to a model.
    ///
    /// Used to reject unknown parameters before a fit starts.
    fn parameter_surface(&self) -> Option<ParameterSurface> {
        None
    }

    /// Write the evaluated configuration(s) and achieved values under `dir`.
    ///
    /// Objectives without a configuration only record the parameters.
    fn dump(&self, params: &NestedParams, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        dump_to_file(&dir.join("parameters.json"), params)
    }
}

impl<F> ObjectiveFunction for F
where
    F: Fn(&NestedParams) -> Result<f64> + Send + Sync,
{
    fn evaluate(&self, params: &NestedParams) -> Result<f64> {
        self(params)
    }
}

/// Turn a tag into a file-system friendly name.
fn file_stem(tag: &str) -> String {
    let stem: String = tag
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "untagged".to_string()
    } else {
        stem
    }
}
