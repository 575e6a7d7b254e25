//! Context entry loading.
//!
//! Named context entries are resolved before a rule evaluates. `variable`
//! entries are computed in-engine; config maps, API calls, and image
//! registry lookups go through the caller-supplied loader, which is the
//! only place the engine can block.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::policy::ContextEntry;
use crate::engine::context::EvalContext;
use crate::engine::error::{EngineError, Result};
use crate::engine::substitution::substitute_all;

/// Resolves external context entries (config maps, API calls, registry
/// metadata). Implementations live with the caller; the engine awaits
/// each load synchronously.
#[async_trait]
pub trait ContextLoader: Send + Sync {
    async fn load(&self, entry: &ContextEntry) -> Result<Value>;
}

/// A loader that rejects every external entry. Useful for evaluations
/// that must not touch the network and for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExternalLoader;

#[async_trait]
impl ContextLoader for NoExternalLoader {
    async fn load(&self, entry: &ContextEntry) -> Result<Value> {
        Err(EngineError::ContextLoad {
            entry: entry.name.clone(),
            message: "external context loading is disabled".to_string(),
        })
    }
}

/// Load all context entries of a rule into the evaluation context.
/// Cancellation is checked before each potentially blocking load.
pub(crate) async fn load_context(
    token: &CancellationToken,
    loader: &dyn ContextLoader,
    entries: &[ContextEntry],
    jctx: &mut EvalContext,
) -> Result<()> {
    for entry in entries {
        let value = if let Some(variable) = &entry.variable {
            resolve_variable(jctx, entry, variable)?
        } else {
            if token.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            loader.load(entry).await?
        };
        debug!(entry = %entry.name, "loaded context entry");
        jctx.add(entry.name.clone(), value);
    }
    Ok(())
}

/// Resolve a `variable` entry: substitute its literal value, apply the
/// optional query, and fall back to the default when the result is not
/// found.
fn resolve_variable(
    jctx: &EvalContext,
    entry: &ContextEntry,
    variable: &crate::api::policy::VariableEntry,
) -> Result<Value> {
    let result = match (&variable.value, &variable.jmes_path) {
        (Some(value), Some(path)) => {
            let substituted = substitute_all(jctx, value)?;
            query_value(&substituted, path)
        }
        (Some(value), None) => substitute_all(jctx, value),
        (None, Some(path)) => {
            let path = match substitute_all(jctx, &Value::String(path.clone()))? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            jctx.query(&path)
        }
        (None, None) => Err(EngineError::ContextLoad {
            entry: entry.name.clone(),
            message: "variable entry has neither value nor jmesPath".to_string(),
        }),
    };

    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_not_found() => match &variable.default {
            Some(default) => Ok(default.clone()),
            None => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// Apply a JMESPath expression to a standalone value
fn query_value(value: &Value, expression: &str) -> Result<Value> {
    let mut scratch = EvalContext::new();
    scratch.add("__value", value.clone());
    scratch.query(&format!("__value.{}", expression)).or_else(|e| {
        if e.is_not_found() {
            Err(EngineError::NotFound(expression.to_string()))
        } else {
            Err(e)
        }
    })
}
