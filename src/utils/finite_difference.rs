//! Finite difference methods for numerical differentiation.
//!
//! The backends only see a black-box scalar objective, so gradients are
//! approximated numerically. Differences never step outside the bounds.

use crate::error::Result;
use crate::parameters::Bounds;
use ndarray::Array1;

/// Default relative step size for finite differences.
pub const DEFAULT_STEP: f64 = 1e-6;

/// Compute the gradient of a scalar function with bound-aware finite differences.
///
/// Central differences are used where both perturbed points are feasible,
/// one-sided differences next to a bound.
///
/// # Arguments
///
/// * `f` - The function to differentiate
/// * `params` - The parameter values at which to evaluate the gradient
/// * `f0` - The function value at `params`
/// * `bounds` - Bounds aligned with `params`
/// * `step` - Relative step size
pub fn gradient<F>(
    f: F,
    params: &Array1<f64>,
    f0: f64,
    bounds: &[Bounds],
    step: f64,
) -> Result<Array1<f64>>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let n_params = params.len();
    let mut grad = Array1::zeros(n_params);

    for j in 0..n_params {
        let param_j = params[j];
        let h = step * param_j.abs().max(1.0);
        let b = bounds.get(j).copied().unwrap_or_default();

        let can_forward = b.contains(param_j + h);
        let can_backward = b.contains(param_j - h);

        let mut forward = params.clone();
        forward[j] += h;
        let mut backward = params.clone();
        backward[j] -= h;

        grad[j] = match (can_forward, can_backward) {
            (true, true) => (f(&forward)? - f(&backward)?) / (2.0 * h),
            (true, false) => (f(&forward)? - f0) / h,
            (false, true) => (f0 - f(&backward)?) / h,
            // Interval narrower than the step
            (false, false) => 0.0,
        };
    }

    Ok(grad)
}

/// Zero the gradient components that would push a coordinate through an active bound.
pub fn project_gradient(params: &Array1<f64>, grad: &Array1<f64>, bounds: &[Bounds]) -> Array1<f64> {
    let mut projected = grad.clone();
    for (j, b) in bounds.iter().enumerate().take(params.len()) {
        let at_lower = b.lower.map_or(false, |lo| params[j] <= lo);
        let at_upper = b.upper.map_or(false, |hi| params[j] >= hi);
        if (at_lower && grad[j] > 0.0) || (at_upper && grad[j] < 0.0) {
            projected[j] = 0.0;
        }
    }
    projected
}
