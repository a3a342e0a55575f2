//! Transform between nested parameters and flat optimizer vectors.
//!
//! Optimizers work on `Array1<f64>`, objective functions work on
//! [`NestedParams`]. [`ParameterSpace`] fixes one key ordering when the
//! initial parameters are flattened and reuses it for every unflatten and
//! for aligning bounds, so a single fit never mixes two orderings.

use ndarray::Array1;
use std::collections::BTreeMap;

use crate::error::{FitError, Result};
use crate::parameters::bounds::Bounds;
use crate::parameters::tree::{NestedBounds, NestedParams, ParamValue};

/// Ordered keys paired with their values.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatVector {
    pub keys: Vec<String>,
    pub values: Array1<f64>,
}

impl FlatVector {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.values[i])
    }
}

/// Flatten nested parameters depth-first into a [`FlatVector`].
///
/// Fails with [`FitError::TypeMismatch`] if any leaf is not a numeric scalar.
pub fn flatten(nested: &NestedParams) -> Result<FlatVector> {
    let leaves = nested.leaves()?;
    let mut keys = Vec::with_capacity(leaves.len());
    let mut values = Vec::with_capacity(leaves.len());

    for (key, leaf) in leaves {
        match leaf {
            ParamValue::Scalar(v) => {
                keys.push(key);
                values.push(*v);
            }
            other => {
                return Err(FitError::TypeMismatch {
                    key,
                    found: other.kind().to_string(),
                })
            }
        }
    }

    Ok(FlatVector {
        keys,
        values: Array1::from_vec(values),
    })
}

/// Rebuild nested parameters from a [`FlatVector`].
pub fn unflatten(flat: &FlatVector) -> Result<NestedParams> {
    if flat.keys.len() != flat.values.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} keys but {} values",
            flat.keys.len(),
            flat.values.len()
        )));
    }
    NestedParams::from_leaves(
        flat.keys
            .iter()
            .zip(flat.values.iter())
            .map(|(k, v)| (k.as_str(), ParamValue::Scalar(*v))),
    )
}

/// Flatten nested bounds into a key lookup.
pub fn flatten_bounds(bounds: &NestedBounds) -> Result<BTreeMap<String, Bounds>> {
    Ok(bounds
        .leaves()?
        .into_iter()
        .map(|(key, b)| (key, *b))
        .collect())
}

/// Bounds for `key`, unbounded on both sides if the key has no entry.
pub fn bounds_for(flat_bounds: &BTreeMap<String, Bounds>, key: &str) -> Bounds {
    flat_bounds.get(key).copied().unwrap_or_default()
}

/// The canonical key ordering of one fit call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    keys: Vec<String>,
}

impl ParameterSpace {
    /// Flatten `initial` and capture its key ordering.
    pub fn from_initial(initial: &NestedParams) -> Result<(Self, Array1<f64>)> {
        let FlatVector { keys, values } = flatten(initial)?;
        Ok((Self { keys }, values))
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn dimension(&self) -> usize {
        self.keys.len()
    }

    /// Pair `values` with the captured keys.
    pub fn to_flat(&self, values: &Array1<f64>) -> Result<FlatVector> {
        if values.len() != self.keys.len() {
            return Err(FitError::DimensionMismatch(format!(
                "Expected {} parameter values, got {}",
                self.keys.len(),
                values.len()
            )));
        }
        Ok(FlatVector {
            keys: self.keys.clone(),
            values: values.clone(),
        })
    }

    /// Rebuild nested parameters from an optimizer vector.
    pub fn unflatten(&self, values: &Array1<f64>) -> Result<NestedParams> {
        unflatten(&self.to_flat(values)?)
    }

    /// Bounds aligned with the captured key ordering.
    ///
    /// Keys without bounds are unbounded. Bound keys that name no parameter
    /// are ignored and returned separately so the caller can report them.
    pub fn align_bounds(&self, bounds: &NestedBounds) -> Result<(Vec<Bounds>, Vec<String>)> {
        let flat_bounds = flatten_bounds(bounds)?;
        let aligned = self
            .keys
            .iter()
            .map(|key| bounds_for(&flat_bounds, key))
            .collect();
        let unmatched = flat_bounds
            .keys()
            .filter(|key| !self.keys.contains(key))
            .cloned()
            .collect();
        Ok((aligned, unmatched))
    }
}
