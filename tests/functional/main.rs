// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Functional tests for the policy evaluation engine.
//!
//! These tests drive complete policy evaluations WITHOUT any cluster
//! infrastructure: policies and resources are plain JSON documents, and
//! external context loading is disabled.
//!
//! ```bash
//! # Run all functional tests
//! cargo test --test functional
//!
//! # Run a specific test
//! cargo test --test functional test_required_label_pass
//! ```
//!
//! ## Test Categories
//!
//! - **Validate tests**: pattern, anyPattern, deny, pod security, and
//!   driver behavior (applyRules, namespaced policies, exceptions)
//! - **ForEach tests**: element iteration, scoping, nesting
//! - **Generate tests**: the read-only generate-rule filter
//! - **Invariant tests**: checkpoint balance, ordering, counters,
//!   idempotence, property-based checks

mod fixtures;
mod generate_tests;
mod invariant_tests;
mod validate_tests;

pub use fixtures::*;
