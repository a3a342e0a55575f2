//! # Parameter System
//!
//! Nested parameter mappings, per-parameter bounds, and the lossless
//! transform between nested parameters and the flat vectors optimizers use.
//!
//! ## Core Components
//!
//! - [`ParamTree`]: ordered tree keyed by path segments (`group.name`)
//! - [`NestedParams`] and [`NestedBounds`]: parameter values and their bounds
//! - [`Bounds`]: optional lower/upper pair for one flattened key
//! - [`ParameterSpace`]: captures the key ordering of one fit call
//!
//! ## Example Usage
//!
//! ```rust
//! use paramfit_rs::parameters::{flatten, unflatten, NestedParams};
//!
//! let params = NestedParams::from_scalars([("td", 4.78), ("dispersion.C6", 46.4)]).unwrap();
//!
//! let flat = flatten(&params).unwrap();
//! assert_eq!(flat.keys, vec!["dispersion.C6", "td"]);
//! assert_eq!(unflatten(&flat).unwrap(), params);
//! ```

pub mod bounds;
pub mod space;
pub mod tree;

// Re-export key types
pub use bounds::{Bounds, BoundsError};
pub use space::{bounds_for, flatten, flatten_bounds, unflatten, FlatVector, ParameterSpace};
pub use tree::{NestedBounds, NestedParams, ParamNode, ParamTree, ParamValue, KEY_SEPARATOR};
