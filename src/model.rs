//! Model trait and parameter application.
//!
//! The physical model itself lives outside this crate. Objectives talk to it
//! through [`Model`], which exposes an explicit [`ParameterSurface`]: the
//! enumerated set of names that may be assigned. Parameters are validated
//! against the surface before anything is assigned, so an unknown name is
//! reported without touching the model.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{FitError, Result};
use crate::parameters::{flatten, NestedParams};

/// The assignable named numeric fields of a model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterSurface {
    names: BTreeSet<String>,
}

impl ParameterSurface {
    /// Create a surface from dotted parameter names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names assignable on both surfaces.
    pub fn intersection(&self, other: &ParameterSurface) -> ParameterSurface {
        Self {
            names: self.names.intersection(&other.names).cloned().collect(),
        }
    }

    /// Check every flattened parameter name against the surface.
    ///
    /// Fails with [`FitError::UnknownParameter`] on the first name (in key
    /// order) that is not assignable.
    pub fn validate(&self, params: &NestedParams) -> Result<()> {
        for key in flatten(params)?.keys {
            if !self.contains(&key) {
                return Err(FitError::UnknownParameter { name: key });
            }
        }
        Ok(())
    }
}

/// A model whose parameters can be fitted.
///
/// Objectives keep one instance as a prototype and clone it for every
/// evaluation, so implementations must be cheap enough to clone and safe to
/// share between threads.
pub trait Model: Clone + Send + Sync {
    /// A fixed reference structure the model can be evaluated on.
    type Configuration: Clone + Send + Sync + Serialize;

    /// The assignable parameter names.
    fn surface(&self) -> ParameterSurface;

    /// Assign one parameter. Only called with names on [`Model::surface`].
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<()>;

    /// Predicted energy of a configuration under the current parameters.
    fn energy(&self, configuration: &Self::Configuration) -> Result<f64>;

    /// Advance a configuration by one integration or relaxation step.
    fn propagate(&self, _configuration: &mut Self::Configuration, _dt: f64) -> Result<()> {
        Err(FitError::NotImplemented(
            "this model does not support trajectories".to_string(),
        ))
    }
}

/// Configurations made of point bodies.
pub trait HasPositions {
    /// Cartesian positions of all bodies.
    fn positions(&self) -> &[[f64; 3]];
}

/// Validate `params` against the model's surface, then assign every scalar.
pub fn apply_parameters<M: Model>(
    model: &mut M,
    surface: &ParameterSurface,
    params: &NestedParams,
) -> Result<()> {
    let flat = flatten(params)?;
    if let Some(unknown) = flat.keys.iter().find(|k| !surface.contains(k)) {
        return Err(FitError::UnknownParameter {
            name: unknown.clone(),
        });
    }
    for (name, value) in flat.keys.iter().zip(flat.values.iter()) {
        model.set_parameter(name, *value)?;
    }
    Ok(())
}
