//! # paramfit-rs
//!
//! `paramfit-rs` fits the free numeric parameters of a physical interaction
//! model against reference observations (energies, geometric targets) by
//! minimizing a scalar mismatch with black-box numerical optimization.
//!
//! The library provides:
//! - A lossless, order-preserving transform between nested parameter records
//!   and the flat vectors optimizers work on, with per-parameter bounds
//! - Two optimization backends behind one contract: a local bounded
//!   quasi-Newton search and a budget-driven global differential evolution
//! - Composable objectives: single-configuration energies, structural
//!   targets, and weighted aggregates with per-term breakdowns
//! - Helpers for reading reference tables and writing fit results
//!
//! ## Basic Usage
//!
//! ```
//! use paramfit_rs::{Fitter, LocalBoundedBackend, NestedParams, Result};
//!
//! let objective = |p: &NestedParams| -> Result<f64> {
//!     let x = p.scalar("x").unwrap_or(0.0);
//!     let y = p.scalar("y").unwrap_or(0.0);
//!     Ok(2.0 * (x - 2.0).powi(2) + 3.0 * (y + 1.0).powi(2))
//! };
//! let initial = NestedParams::from_scalars([("x", 0.0), ("y", 0.0)])?;
//!
//! let fitter = Fitter::new(objective, initial)?;
//! let optimal = fitter.fit(&LocalBoundedBackend::new().with_tolerance(1e-4))?;
//!
//! assert!((optimal.scalar("x").unwrap() - 2.0).abs() < 1e-2);
//! assert!((optimal.scalar("y").unwrap() + 1.0).abs() < 1e-2);
//! # Ok::<(), paramfit_rs::FitError>(())
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

pub mod backend;
pub mod dataset;
pub mod fitter;
pub mod model;
pub mod objective;
pub mod output;

mod utils;

// Re-exports for convenience
pub use error::{FitError, Result};

pub use backend::{
    BackendConfig, GlobalConfig, GlobalDerivativeFreeBackend, LocalBoundedBackend, LocalConfig,
    OptimizationBackend,
};
pub use fitter::{FitResult, Fitter};
pub use model::{Model, ParameterSurface};
pub use objective::{AggregateObjective, EnergyObjective, ObjectiveFunction};
pub use parameters::{Bounds, NestedBounds, NestedParams};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
