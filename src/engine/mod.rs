//! The policy evaluation core.
//!
//! Entry points are [`validation::validate`] for validation rules and
//! [`generation::filter_generate_rules`] for the read-only generate-rule
//! filter. Everything else is the shared machinery they run on: the
//! evaluation context, substitution, the pattern matcher, match/exclude
//! filtering, exceptions, and pod security checks.

pub mod anchor;
pub mod autogen;
pub mod context;
pub mod error;
pub mod exceptions;
pub mod generation;
pub mod loader;
pub mod match_filter;
pub mod operators;
pub mod pattern;
pub mod podsecurity;
pub mod policy_context;
pub mod resource;
pub mod substitution;
pub mod validation;

pub use context::EvalContext;
pub use error::{EngineError, Result};
pub use generation::{filter_generate_rules, UpdateRequest};
pub use loader::{ContextLoader, NoExternalLoader};
pub use pattern::{match_pattern, PatternError};
pub use podsecurity::PodSecurityCheckResult;
pub use policy_context::PolicyContext;
pub use validation::validate;
