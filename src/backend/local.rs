//! Bounded local search.
//!
//! The flat objective is exposed to `argmin` as a cost function with a
//! finite-difference gradient and minimized with L-BFGS and a More-Thuente
//! line search. Bounds are enforced by clamping every requested point before
//! the objective sees it; gradient components that push through an active
//! bound are zeroed. The best feasible point evaluated is the result.

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, Gradient, State, TerminationReason,
    TerminationStatus,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{FitError, Result};
use crate::parameters::Bounds;
use crate::utils::finite_difference::{self, project_gradient};

use super::convergence::ConvergenceStatus;
use super::{clip_to_bounds, resolve_bounds, BackendResult, OptimizationBackend};

type Param = Vec<f64>;
type LineSearch = MoreThuenteLineSearch<Param, Param, f64>;
type Solver = LBFGS<LineSearch, Param, Param, f64>;

/// Configuration options for the local bounded backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Maximum number of iterations. Default: 200
    pub max_iterations: usize,

    /// Tolerance for the change in the objective between iterations. Default: 2.2e-9
    pub ftol: f64,

    /// Tolerance for the L2 norm of the projected gradient. Default: 1e-5
    pub gtol: f64,

    /// Relative step of the finite-difference gradient. Default: 1e-6
    pub fd_step: f64,

    /// Number of correction pairs kept by L-BFGS. Default: 7
    pub history_size: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 2.2e-9,
            gtol: 1e-5,
            fd_step: finite_difference::DEFAULT_STEP,
            history_size: 7,
        }
    }
}

impl LocalConfig {
    /// Set the function-value and gradient tolerances together.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.ftol = tol;
        self.gtol = tol;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the finite-difference step.
    pub fn with_fd_step(mut self, step: f64) -> Self {
        self.fd_step = step;
        self
    }

    /// Set the number of correction pairs kept by L-BFGS.
    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    fn solver(&self) -> Result<Solver> {
        let invalid = |e: ArgminError| {
            FitError::InvalidConfig(format!("Invalid local backend tolerance: {}", e))
        };
        LBFGS::new(MoreThuenteLineSearch::new(), self.history_size.max(1))
            .with_tolerance_grad(self.gtol)
            .map_err(invalid)?
            .with_tolerance_cost(self.ftol)
            .map_err(invalid)
    }
}

/// Deterministic local search respecting per-coordinate bounds.
#[derive(Debug, Clone, Default)]
pub struct LocalBoundedBackend {
    config: LocalConfig,
}

impl LocalBoundedBackend {
    /// Create a backend with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with the given configuration.
    pub fn with_config(config: LocalConfig) -> Self {
        Self { config }
    }

    /// Set the function-value and gradient tolerances together.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.config = self.config.with_tolerance(tol);
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    fn status_of(
        &self,
        termination: &TerminationStatus,
        gradient: Option<&Param>,
    ) -> ConvergenceStatus {
        match termination {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {
                let norm = gradient.map(|g| g.iter().map(|v| v * v).sum::<f64>().sqrt());
                if norm.map_or(false, |n| n < self.config.gtol) {
                    ConvergenceStatus::GradientConvergence
                } else {
                    ConvergenceStatus::FunctionValueConvergence
                }
            }
            TerminationStatus::Terminated(TerminationReason::TargetCostReached) => {
                ConvergenceStatus::FunctionValueConvergence
            }
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                ConvergenceStatus::MaxIterationsReached
            }
            _ => ConvergenceStatus::LineSearchFailure,
        }
    }
}

/// Evaluation bookkeeping shared by the argmin problem and the backend.
#[derive(Default)]
struct EvalTracker {
    evals: AtomicUsize,
    non_finite: AtomicBool,
    best: Mutex<Option<(f64, Array1<f64>)>>,
    failure: Mutex<Option<FitError>>,
}

impl EvalTracker {
    fn record(&self, x: &Array1<f64>, cost: f64) {
        if !cost.is_finite() {
            self.non_finite.store(true, Ordering::Relaxed);
            return;
        }
        let mut best = self.best.lock().unwrap_or_else(|e| e.into_inner());
        if best.as_ref().map_or(true, |(c, _)| cost < *c) {
            *best = Some((cost, x.clone()));
        }
    }

    /// Keep the first objective error; argmin only gets its message.
    fn fail(&self, err: FitError) -> ArgminError {
        let message = err.to_string();
        self.failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert(err);
        ArgminError::msg(message)
    }

    fn take_failure(&self) -> Option<FitError> {
        self.failure.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn take_best(&self) -> Option<(f64, Array1<f64>)> {
        self.best.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// The flat objective seen through the bounds, as an argmin problem.
struct BoundedProblem<'a, F> {
    objective: &'a F,
    bounds: &'a [Bounds],
    fd_step: f64,
    tracker: &'a EvalTracker,
}

impl<F> BoundedProblem<'_, F>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    fn evaluate(&self, x: &Array1<f64>) -> Result<f64> {
        self.tracker.evals.fetch_add(1, Ordering::Relaxed);
        let cost = (self.objective)(x)?;
        self.tracker.record(x, cost);
        Ok(cost)
    }

    fn feasible(&self, param: &[f64]) -> Array1<f64> {
        param
            .iter()
            .zip(self.bounds.iter())
            .map(|(value, b)| b.clamp(*value))
            .collect()
    }
}

impl<F> CostFunction for BoundedProblem<'_, F>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    type Param = Param;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        let x = self.feasible(param);
        let cost = self.evaluate(&x).map_err(|e| self.tracker.fail(e))?;
        if !cost.is_finite() {
            return Err(ArgminError::msg(format!("Objective returned {}", cost)));
        }
        Ok(cost)
    }
}

impl<F> Gradient for BoundedProblem<'_, F>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    type Param = Param;
    type Gradient = Param;

    fn gradient(&self, param: &Self::Param) -> std::result::Result<Self::Gradient, ArgminError> {
        let x = self.feasible(param);
        let f0 = self.evaluate(&x).map_err(|e| self.tracker.fail(e))?;
        let grad =
            finite_difference::gradient(|p| self.evaluate(p), &x, f0, self.bounds, self.fd_step)
                .map_err(|e| self.tracker.fail(e))?;

        let projected = project_gradient(&x, &grad, self.bounds);
        if projected.iter().any(|g| !g.is_finite()) {
            return Err(ArgminError::msg("Non-finite gradient"));
        }
        Ok(projected.to_vec())
    }
}

impl OptimizationBackend for LocalBoundedBackend {
    fn name(&self) -> &'static str {
        "local-bounded"
    }

    fn minimize<F>(
        &self,
        objective: F,
        x0: &Array1<f64>,
        bounds: Option<&[Bounds]>,
    ) -> Result<BackendResult>
    where
        F: Fn(&Array1<f64>) -> Result<f64> + Sync,
    {
        let bounds = resolve_bounds(x0, bounds)?;
        let tracker = EvalTracker::default();
        let problem = BoundedProblem {
            objective: &objective,
            bounds: &bounds,
            fd_step: self.config.fd_step,
            tracker: &tracker,
        };

        let finish = |params: Array1<f64>,
                      cost: f64,
                      iterations: usize,
                      status: ConvergenceStatus,
                      detail: String| {
            let message = format!("{} ({})", status.description(), detail);
            if status.is_non_convergence() {
                warn!(?status, cost, iterations, "Fit did not converge: {}", message);
            }
            BackendResult {
                params,
                cost,
                iterations,
                func_evals: tracker.evals.load(Ordering::Relaxed),
                status,
                message,
            }
        };

        let start = clip_to_bounds(x0, &bounds);
        let start_cost = problem.evaluate(&start)?;
        if !start_cost.is_finite() {
            let detail = format!("objective returned {} at the start", start_cost);
            return Ok(finish(start, start_cost, 0, ConvergenceStatus::NumericalError, detail));
        }
        if start.is_empty() {
            let detail = "no free parameters".to_string();
            return Ok(finish(start, start_cost, 0, ConvergenceStatus::GradientConvergence, detail));
        }

        let solver = self.config.solver()?;
        let max_iters = self.config.max_iterations as u64;
        let outcome = Executor::new(problem, solver)
            .configure(|state| state.param(start.to_vec()).max_iters(max_iters))
            .run();

        if let Some(err) = tracker.take_failure() {
            return Err(err);
        }

        let (iterations, status, detail) = match outcome {
            Ok(res) => {
                let state = res.state();
                let termination = state.get_termination_status();
                let status = self.status_of(termination, state.get_gradient());
                (state.get_iter() as usize, status, termination.to_string())
            }
            Err(err) => {
                debug!(error = %err, "local search aborted");
                let status = if tracker.non_finite.load(Ordering::Relaxed) {
                    ConvergenceStatus::NumericalError
                } else {
                    ConvergenceStatus::LineSearchFailure
                };
                (0, status, err.to_string())
            }
        };

        let (cost, params) = tracker.take_best().unwrap_or((start_cost, start));
        debug!(iterations, cost, "local search finished");
        Ok(finish(params, cost, iterations, status, detail))
    }
}
