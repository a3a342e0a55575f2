//! Utility functions and helpers for the paramfit-rs library.

pub mod finite_difference;
