//! Tests for the objective hierarchy

pub mod model_tests;
