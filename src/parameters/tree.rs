//! Nested parameter mappings.
//!
//! Parameters, their bounds and fit results are all trees keyed by path
//! segments, e.g. `{"dispersion": {"C6": 46.4}}` whose single leaf lives at
//! the dotted path `dispersion.C6`. The tree is ordered, so traversal order is
//! deterministic and independent of the order in which entries were inserted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FitError, Result};
use crate::parameters::bounds::Bounds;

/// Separator between path segments of a flattened key.
pub const KEY_SEPARATOR: char = '.';

/// A node of a parameter tree: either a leaf value or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamNode<T> {
    Leaf(T),
    Group(ParamTree<T>),
}

/// An ordered tree of named nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamTree<T>(BTreeMap<String, ParamNode<T>>);

/// A leaf of a parameter record.
///
/// Model parameter records routinely mix tunable numbers with switches and
/// labels; only [`ParamValue::Scalar`] leaves can take part in a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    Flag(bool),
    Text(String),
}

impl ParamValue {
    /// The numeric value, if this leaf is a scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Short name of the leaf kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Scalar(_) => "scalar",
            ParamValue::Flag(_) => "bool",
            ParamValue::Text(_) => "string",
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// Nested parameter values.
pub type NestedParams = ParamTree<ParamValue>;

/// Nested parameter bounds, sharing the key structure of [`NestedParams`].
pub type NestedBounds = ParamTree<Bounds>;

impl<T> Default for ParamTree<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split(KEY_SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(FitError::InvalidKey(path.to_string()));
    }
    Ok(segments)
}

impl<T> ParamTree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if the tree has no children.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the direct children in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamNode<T>)> {
        self.0.iter()
    }

    /// Look up the node at a dotted path.
    pub fn get(&self, path: &str) -> Option<&ParamNode<T>> {
        let mut segments = path.split(KEY_SEPARATOR);
        let mut node = self.0.get(segments.next()?)?;
        for segment in segments {
            match node {
                ParamNode::Group(group) => node = group.0.get(segment)?,
                ParamNode::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// Look up the leaf at a dotted path.
    pub fn get_leaf(&self, path: &str) -> Option<&T> {
        match self.get(path)? {
            ParamNode::Leaf(value) => Some(value),
            ParamNode::Group(_) => None,
        }
    }

    /// Insert a leaf at a dotted path, creating intermediate groups.
    ///
    /// Replacing an existing leaf is allowed; turning a leaf into a group or
    /// a group into a leaf is a [`FitError::KeyConflict`].
    pub fn insert(&mut self, path: &str, value: T) -> Result<()> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| FitError::InvalidKey(path.to_string()))?;

        let mut current = self;
        for segment in parents {
            let node = current
                .0
                .entry(segment.to_string())
                .or_insert_with(|| ParamNode::Group(ParamTree::new()));
            current = match node {
                ParamNode::Group(group) => group,
                ParamNode::Leaf(_) => return Err(FitError::KeyConflict(path.to_string())),
            };
        }

        if let Some(ParamNode::Group(_)) = current.0.get(*last) {
            return Err(FitError::KeyConflict(path.to_string()));
        }
        current.0.insert(last.to_string(), ParamNode::Leaf(value));
        Ok(())
    }

    /// All leaves with their dotted paths, in depth-first key order.
    pub fn leaves(&self) -> Result<Vec<(String, &T)>> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out)?;
        Ok(out)
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a T)>) -> Result<()> {
        for (key, node) in &self.0 {
            if key.is_empty() || key.contains(KEY_SEPARATOR) {
                return Err(FitError::InvalidKey(format!("{}{}", prefix, key)));
            }
            let path = format!("{}{}", prefix, key);
            match node {
                ParamNode::Leaf(value) => out.push((path, value)),
                ParamNode::Group(group) => {
                    group.collect_leaves(&format!("{}{}", path, KEY_SEPARATOR), out)?
                }
            }
        }
        Ok(())
    }

    /// Build a tree from dotted paths and leaf values.
    pub fn from_leaves<K, I>(leaves: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut tree = Self::new();
        for (key, value) in leaves {
            tree.insert(key.as_ref(), value)?;
        }
        Ok(tree)
    }
}

impl NestedParams {
    /// Build parameters from dotted paths and numeric values.
    ///
    /// ```
    /// use paramfit_rs::parameters::NestedParams;
    ///
    /// let params = NestedParams::from_scalars([("x", 0.0), ("dispersion.C6", 46.4)]).unwrap();
    /// assert_eq!(params.scalar("dispersion.C6"), Some(46.4));
    /// ```
    pub fn from_scalars<K, I>(values: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Self::from_leaves(values.into_iter().map(|(k, v)| (k, ParamValue::Scalar(v))))
    }

    /// The numeric value at a dotted path, if present and a scalar.
    pub fn scalar(&self, path: &str) -> Option<f64> {
        self.get_leaf(path).and_then(ParamValue::as_f64)
    }
}

impl<T: Serialize> fmt::Display for ParamTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
