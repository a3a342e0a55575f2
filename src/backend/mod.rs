//! Optimization backends.
//!
//! Both backends minimize a black-box scalar function of a flat parameter
//! vector behind one contract, [`OptimizationBackend::minimize`]:
//!
//! - [`LocalBoundedBackend`]: deterministic L-BFGS search run by `argmin`,
//!   driven by tolerances and an iteration cap
//! - [`GlobalDerivativeFreeBackend`]: stochastic differential evolution,
//!   driven by an evaluation budget
//!
//! Options are explicit per-variant types ([`LocalConfig`], [`GlobalConfig`]);
//! [`BackendConfig`] selects one of them at run time.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FitError, Result};
use crate::parameters::Bounds;

pub mod convergence;
mod global;
mod local;

pub use convergence::ConvergenceStatus;
pub use global::{DEStrategy, GlobalConfig, GlobalDerivativeFreeBackend};
pub use local::{LocalBoundedBackend, LocalConfig};

/// Uniform contract over the optimization backends.
pub trait OptimizationBackend {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Minimize `objective` starting from `x0`.
    ///
    /// # Arguments
    ///
    /// * `objective` - Scalar function of the flat parameter vector
    /// * `x0` - Initial parameter vector
    /// * `bounds` - Bounds aligned with `x0`, or `None` for a fully unbounded search
    ///
    /// # Returns
    ///
    /// * The best point found with backend diagnostics. Failing to meet a
    ///   tolerance is reported through [`BackendResult::status`], not as an error.
    fn minimize<F>(
        &self,
        objective: F,
        x0: &Array1<f64>,
        bounds: Option<&[Bounds]>,
    ) -> Result<BackendResult>
    where
        F: Fn(&Array1<f64>) -> Result<f64> + Sync;
}

/// Result of a backend run.
#[derive(Debug, Clone)]
pub struct BackendResult {
    /// The best parameters found
    pub params: Array1<f64>,

    /// Objective value at `params`
    pub cost: f64,

    /// Iterations (local) or generations (global) performed
    pub iterations: usize,

    /// The number of objective evaluations
    pub func_evals: usize,

    /// Why the backend stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,
}

impl BackendResult {
    /// `true` unless the backend stopped short of its tolerance.
    pub fn success(&self) -> bool {
        !self.status.is_non_convergence()
    }
}

impl fmt::Display for BackendResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success())?;
        writeln!(f, "  Status: {:?}", self.status)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Run-time selection of a backend and its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendConfig {
    Local(LocalConfig),
    Global(GlobalConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local(LocalConfig::default())
    }
}

/// Expand optional bounds to one entry per coordinate.
fn resolve_bounds(x0: &Array1<f64>, bounds: Option<&[Bounds]>) -> Result<Vec<Bounds>> {
    match bounds {
        None => Ok(vec![Bounds::unbounded(); x0.len()]),
        Some(b) if b.len() == x0.len() => Ok(b.to_vec()),
        Some(b) => Err(FitError::DimensionMismatch(format!(
            "Expected {} bounds for parameters, got {}",
            x0.len(),
            b.len()
        ))),
    }
}

/// Clip a point to the given bounds.
fn clip_to_bounds(point: &Array1<f64>, bounds: &[Bounds]) -> Array1<f64> {
    let mut clipped = point.clone();
    for (value, b) in clipped.iter_mut().zip(bounds.iter()) {
        *value = b.clamp(*value);
    }
    clipped
}

/// Order NaN costs after every real value.
fn sanitize_cost(cost: f64) -> f64 {
    if cost.is_nan() {
        f64::INFINITY
    } else {
        cost
    }
}
