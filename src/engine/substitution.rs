//! Variable substitution over JSON documents.
//!
//! Any string inside a document may contain `{{ expression }}` references
//! resolved against the evaluation context. An expression that spans the
//! whole string is replaced by the raw query result, preserving its type;
//! expressions embedded in a larger string are spliced in string form.
//! `\{{` suppresses substitution.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::engine::context::EvalContext;
use crate::engine::error::Result;

// Allows one level of nested braces so multiselect-hash expressions such
// as {{ request.object.{n: metadata.name} }} terminate correctly.
static VARIABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\\?\{\{((?:\{[^{}]*\}|[^{}])*)\}\}").expect("hard-coded regex")
});

/// Substitute all `{{ … }}` expressions in a document.
///
/// Returns an error when any referenced variable cannot be resolved; the
/// caller decides whether that is fatal (patterns, deny conditions) or
/// falls back to the raw template (messages).
pub fn substitute_all(ctx: &EvalContext, value: &Value) -> Result<Value> {
    match value {
        Value::String(s) => substitute_string(ctx, s),
        Value::Array(items) => items
            .iter()
            .map(|v| substitute_all(ctx, v))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let key = match substitute_string(ctx, k)? {
                    Value::String(s) => s,
                    other => stringify(&other),
                };
                out.insert(key, substitute_all(ctx, v)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Substitute expressions in a single string
fn substitute_string(ctx: &EvalContext, input: &str) -> Result<Value> {
    // Whole-string expression: replace with the raw typed value
    if let Some(caps) = VARIABLE_REGEX.captures(input) {
        if let Some(m) = caps.get(0) {
            if m.start() == 0 && m.end() == input.len() && !input.starts_with('\\') {
                if let Some(expr) = caps.get(1) {
                    return ctx.query(expr.as_str().trim());
                }
            }
        }
    }

    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in VARIABLE_REGEX.captures_iter(input) {
        let m = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        out.push_str(&input[last..m.start()]);
        last = m.end();

        if m.as_str().starts_with('\\') {
            // escaped: emit the braces literally, without the backslash
            out.push_str(&m.as_str()[1..]);
            continue;
        }

        let expr = caps.get(1).map(|e| e.as_str().trim()).unwrap_or_default();
        let resolved = ctx.query(expr)?;
        out.push_str(&stringify(&resolved));
    }
    out.push_str(&input[last..]);
    Ok(Value::String(out))
}

/// String form of a JSON value for splicing into messages
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
