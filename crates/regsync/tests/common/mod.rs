//! Shared test utilities for regsync integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated test execution with temp directories
//! - Fake tag listers and transfers that record how they were called

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
