//! Parameter bounds implementation
//!
//! A bound is an optional `(lower, upper)` pair attached to a flattened
//! parameter key. A missing side means the parameter is unbounded in that
//! direction, and a missing bound entry means it is unbounded in both.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: lower ({lower}) must not exceed upper ({upper})")]
    InvalidBounds { lower: f64, upper: f64 },

    #[error("NaN is not a valid bound")]
    NanBound,
}

/// Represents the bounds constraints on a parameter
///
/// Serializes as a two-element array `[lower, upper]` where `null` marks an
/// open side, which is the natural way to write bounds in a JSON parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "(Option<f64>, Option<f64>)", into = "(Option<f64>, Option<f64>)")]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub lower: Option<f64>,

    /// Maximum allowed value for the parameter
    pub upper: Option<f64>,
}

impl TryFrom<(Option<f64>, Option<f64>)> for Bounds {
    type Error = BoundsError;

    fn try_from((lower, upper): (Option<f64>, Option<f64>)) -> Result<Self, Self::Error> {
        Self::from_options(lower, upper)
    }
}

impl From<Bounds> for (Option<f64>, Option<f64>) {
    fn from(bounds: Bounds) -> Self {
        (bounds.lower, bounds.upper)
    }
}

impl Bounds {
    /// Create a new closed interval `[lower, upper]`
    ///
    /// # Examples
    ///
    /// ```
    /// use paramfit_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.lower, Some(0.0));
    /// assert_eq!(bounds.upper, Some(10.0));
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(lower: f64, upper: f64) -> Result<Self, BoundsError> {
        Self::from_options(Some(lower), Some(upper))
    }

    /// Create bounds from optional sides, validating their order
    pub fn from_options(lower: Option<f64>, upper: Option<f64>) -> Result<Self, BoundsError> {
        if lower.map_or(false, f64::is_nan) || upper.map_or(false, f64::is_nan) {
            return Err(BoundsError::NanBound);
        }
        if let (Some(lower), Some(upper)) = (lower, upper) {
            if lower > upper {
                return Err(BoundsError::InvalidBounds { lower, upper });
            }
        }

        Ok(Self { lower, upper })
    }

    /// Create an unbounded constraint
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a bounds constraint with only a minimum value
    pub fn min_only(lower: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: None,
        }
    }

    /// Create a bounds constraint with only a maximum value
    pub fn max_only(upper: f64) -> Self {
        Self {
            lower: None,
            upper: Some(upper),
        }
    }

    /// Check if a value is within the bounds
    pub fn contains(&self, value: f64) -> bool {
        self.lower.map_or(true, |lo| value >= lo) && self.upper.map_or(true, |hi| value <= hi)
    }

    /// `true` if neither side is set
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// `true` if both sides are set
    pub fn is_finite(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// Lower side with an open side mapped to negative infinity
    pub fn lower_or_inf(&self) -> f64 {
        self.lower.unwrap_or(f64::NEG_INFINITY)
    }

    /// Upper side with an open side mapped to positive infinity
    pub fn upper_or_inf(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        let mut clamped = value;
        if let Some(lo) = self.lower {
            clamped = clamped.max(lo);
        }
        if let Some(hi) = self.upper {
            clamped = clamped.min(hi);
        }
        clamped
    }
}
