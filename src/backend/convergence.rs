//! Termination states reported by the optimization backends.

use serde::{Deserialize, Serialize};

/// Possible termination states of an optimization backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm has converged due to a small function value change.
    FunctionValueConvergence,

    /// The algorithm has converged due to a small projected gradient.
    GradientConvergence,

    /// The algorithm has terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// The line search could not find an acceptable step.
    LineSearchFailure,

    /// The evaluation budget was spent. Normal termination for budget-driven search.
    BudgetExhausted,

    /// The algorithm has terminated due to a numerical error.
    NumericalError,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::FunctionValueConvergence | ConvergenceStatus::GradientConvergence
        )
    }

    /// Returns true if the backend stopped short of its tolerance.
    ///
    /// The best iterate is still usable; callers only log a warning.
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::MaxIterationsReached
                | ConvergenceStatus::LineSearchFailure
                | ConvergenceStatus::NumericalError
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> String {
        match self {
            ConvergenceStatus::FunctionValueConvergence => {
                "Converged: small function value change".to_string()
            }
            ConvergenceStatus::GradientConvergence => {
                "Converged: small projected gradient".to_string()
            }
            ConvergenceStatus::MaxIterationsReached => {
                "Terminated: maximum iterations reached".to_string()
            }
            ConvergenceStatus::LineSearchFailure => {
                "Terminated: line search found no acceptable step".to_string()
            }
            ConvergenceStatus::BudgetExhausted => {
                "Terminated: evaluation budget exhausted".to_string()
            }
            ConvergenceStatus::NumericalError => "Terminated: numerical error".to_string(),
        }
    }
}
