//! The fit driver.
//!
//! [`Fitter`] owns an objective, the initial nested parameters and optional
//! nested bounds. A fit call fixes one key ordering, hands a flat-vector view
//! of the objective to a backend and maps the backend's answer back to the
//! nested form.

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::backend::{
    BackendConfig, BackendResult, ConvergenceStatus, GlobalDerivativeFreeBackend,
    LocalBoundedBackend, OptimizationBackend,
};
use crate::error::Result;
use crate::objective::ObjectiveFunction;
use crate::parameters::{NestedBounds, NestedParams, ParameterSpace};

/// Backend diagnostics of one fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendReport {
    pub name: String,
    pub status: ConvergenceStatus,
    pub cost: f64,
    pub iterations: usize,
    pub func_evals: usize,
    pub message: String,
}

impl BackendReport {
    fn new(name: &str, result: &BackendResult) -> Self {
        Self {
            name: name.to_string(),
            status: result.status,
            cost: result.cost,
            iterations: result.iterations,
            func_evals: result.func_evals,
            message: result.message.clone(),
        }
    }

    /// `true` unless the backend stopped short of its tolerance.
    pub fn success(&self) -> bool {
        !self.status.is_non_convergence()
    }
}

/// Outcome of [`Fitter::fit_with_diagnostics`].
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    /// The optimal nested parameters
    pub params: NestedParams,

    /// Objective value at the initial parameters
    pub initial_cost: f64,

    /// Objective value at `params`
    pub final_cost: f64,

    /// Wall time of the whole fit call
    pub elapsed: Duration,

    /// Every objective value requested by the backend
    pub history: Vec<f64>,

    /// Backend diagnostics
    pub backend: BackendReport,
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result:")?;
        writeln!(f, "  Backend: {}", self.backend.name)?;
        writeln!(f, "  Success: {}", self.backend.success())?;
        writeln!(f, "  Status: {}", self.backend.status.description())?;
        writeln!(f, "  Initial objective: {:.6e}", self.initial_cost)?;
        writeln!(f, "  Final objective: {:.6e}", self.final_cost)?;
        writeln!(f, "  Iterations: {}", self.backend.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.backend.func_evals)?;
        writeln!(f, "  Time taken: {:.3?}", self.elapsed)?;
        writeln!(f, "  Parameters: {}", self.params)?;
        Ok(())
    }
}

/// Fits the scalar leaves of a nested parameter record.
///
/// # Examples
///
/// ```
/// use paramfit_rs::backend::LocalBoundedBackend;
/// use paramfit_rs::fitter::Fitter;
/// use paramfit_rs::parameters::NestedParams;
/// use paramfit_rs::Result;
///
/// let objective = |p: &NestedParams| -> Result<f64> {
///     let x = p.scalar("x").unwrap_or(0.0);
///     Ok((x - 3.0).powi(2))
/// };
/// let initial = NestedParams::from_scalars([("x", 0.0)]).unwrap();
///
/// let fitter = Fitter::new(objective, initial).unwrap();
/// let optimal = fitter.fit(&LocalBoundedBackend::new()).unwrap();
/// assert!((optimal.scalar("x").unwrap() - 3.0).abs() < 1e-3);
/// ```
pub struct Fitter<O: ObjectiveFunction> {
    objective: O,
    initial_params: NestedParams,
    bounds: Option<NestedBounds>,
}

impl<O: ObjectiveFunction> Fitter<O> {
    /// Create a fitter.
    ///
    /// Objectives bound to a model are checked against its parameter
    /// surface here, so an unknown name fails before any fit starts.
    pub fn new(objective: O, initial_params: NestedParams) -> Result<Self> {
        if let Some(surface) = objective.parameter_surface() {
            surface.validate(&initial_params)?;
        }
        Ok(Self {
            objective,
            initial_params,
            bounds: None,
        })
    }

    /// Constrain the fit. Keys missing from `bounds` stay unbounded.
    pub fn with_bounds(mut self, bounds: NestedBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn initial_params(&self) -> &NestedParams {
        &self.initial_params
    }

    pub fn bounds(&self) -> Option<&NestedBounds> {
        self.bounds.as_ref()
    }

    /// Run a fit and return the optimal nested parameters.
    pub fn fit<B: OptimizationBackend>(&self, backend: &B) -> Result<NestedParams> {
        Ok(self.fit_with_diagnostics(backend)?.params)
    }

    /// Run a fit with a backend chosen at run time.
    pub fn fit_with_config(&self, config: &BackendConfig) -> Result<FitResult> {
        match config {
            BackendConfig::Local(c) => {
                self.fit_with_diagnostics(&LocalBoundedBackend::with_config(c.clone()))
            }
            BackendConfig::Global(c) => {
                self.fit_with_diagnostics(&GlobalDerivativeFreeBackend::with_config(c.clone()))
            }
        }
    }

    /// Run a fit and collect timing, evaluation history and backend diagnostics.
    #[instrument(skip_all, fields(backend = backend.name()))]
    pub fn fit_with_diagnostics<B: OptimizationBackend>(&self, backend: &B) -> Result<FitResult> {
        let start = Instant::now();

        info!(initial_params = %self.initial_params, "Initial parameters");
        match &self.bounds {
            Some(bounds) => info!(bounds = %bounds, "Bounds"),
            None => info!("No bounds"),
        }
        let initial_cost = self.objective.evaluate(&self.initial_params)?;
        info!(objective = initial_cost, "Initial objective");

        let (space, x0) = ParameterSpace::from_initial(&self.initial_params)?;
        let aligned = match &self.bounds {
            Some(bounds) if space.dimension() > 0 => {
                let (aligned, unmatched) = space.align_bounds(bounds)?;
                for key in &unmatched {
                    warn!(key = %key, "Ignoring bound without a matching parameter");
                }
                Some(aligned)
            }
            _ => None,
        };

        let history = Mutex::new(Vec::new());
        let adapter = |x: &ndarray::Array1<f64>| -> Result<f64> {
            let params = space.unflatten(x)?;
            let value = self.objective.evaluate(&params)?;
            history
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(value);
            Ok(value)
        };

        let result = backend.minimize(adapter, &x0, aligned.as_deref())?;
        let params = space.unflatten(&result.params)?;

        let final_cost = self.objective.evaluate(&params)?;
        let elapsed = start.elapsed();
        info!(objective = final_cost, "Final objective");
        info!(optimal_params = %params, "Optimal parameters");
        info!(elapsed = ?elapsed, "Time taken");

        Ok(FitResult {
            params,
            initial_cost,
            final_cost,
            elapsed,
            history: history.into_inner().unwrap_or_else(|e| e.into_inner()),
            backend: BackendReport::new(backend.name(), &result),
        })
    }
}
