//! Condition evaluation for preconditions and deny rules.
//!
//! Conditions compare a key (usually a substituted `{{ … }}` expression)
//! against a value with one of the declared operators. Evaluation errors on
//! an individual condition log a warning and count as false; only malformed
//! condition documents surface as rule errors.

use jiff::{Span, Unit};
use serde_json::Value;
use tracing::warn;
use wildmatch::WildMatch;

use crate::api::policy::{AnyAllConditions, Condition, ConditionOperator};
use crate::engine::context::EvalContext;
use crate::engine::error::{EngineError, Result};
use crate::engine::substitution::substitute_all;

/// Evaluate a rule's preconditions. Absent preconditions pass.
pub fn check_preconditions(
    ctx: &EvalContext,
    preconditions: Option<&AnyAllConditions>,
) -> Result<bool> {
    let conditions = match preconditions {
        Some(c) => c,
        None => return Ok(true),
    };
    let substituted = substitute_conditions(ctx, conditions)?;
    Ok(evaluate_conditions(&substituted))
}

/// Substitute variables in a condition tree
pub fn substitute_conditions(
    ctx: &EvalContext,
    conditions: &AnyAllConditions,
) -> Result<AnyAllConditions> {
    let raw = serde_json::to_value(conditions)?;
    let substituted = substitute_all(ctx, &raw)?;
    serde_json::from_value(substituted)
        .map_err(|e| EngineError::InvalidCondition(e.to_string()))
}

/// Evaluate a substituted condition tree.
///
/// `any` requires at least one passing condition, `all` requires every
/// condition to pass; both present means both must hold. A legacy bare
/// list is treated as `all`.
pub fn evaluate_conditions(conditions: &AnyAllConditions) -> bool {
    match conditions {
        AnyAllConditions::List(all) => all.iter().all(evaluate_condition),
        AnyAllConditions::AnyAll { any, all } => {
            let any_ok = any.is_empty() || any.iter().any(evaluate_condition);
            let all_ok = all.iter().all(evaluate_condition);
            any_ok && all_ok
        }
    }
}

/// Evaluate a single condition; errors count as false
pub fn evaluate_condition(condition: &Condition) -> bool {
    match apply_operator(&condition.key, condition.operator, &condition.value) {
        Ok(result) => result,
        Err(e) => {
            warn!(
                operator = ?condition.operator,
                error = %e,
                "failed to evaluate condition"
            );
            false
        }
    }
}

fn apply_operator(key: &Value, operator: ConditionOperator, value: &Value) -> Result<bool> {
    use ConditionOperator::*;
    match operator {
        Equals => Ok(values_equal(key, value)),
        NotEquals => Ok(!values_equal(key, value)),
        In => in_set(key, value),
        NotIn => in_set(key, value).map(|r| !r),
        AnyIn => set_op(key, value, SetOp::Any),
        AllIn => set_op(key, value, SetOp::All),
        AnyNotIn => set_op(key, value, SetOp::All).map(|r| !r),
        AllNotIn => set_op(key, value, SetOp::Any).map(|r| !r),
        GreaterThan => numeric_compare(key, value).map(|o| o == std::cmp::Ordering::Greater),
        GreaterThanOrEquals => {
            numeric_compare(key, value).map(|o| o != std::cmp::Ordering::Less)
        }
        LessThan => numeric_compare(key, value).map(|o| o == std::cmp::Ordering::Less),
        LessThanOrEquals => {
            numeric_compare(key, value).map(|o| o != std::cmp::Ordering::Greater)
        }
        DurationGreaterThan => {
            duration_compare(key, value).map(|o| o == std::cmp::Ordering::Greater)
        }
        DurationGreaterThanOrEquals => {
            duration_compare(key, value).map(|o| o != std::cmp::Ordering::Less)
        }
        DurationLessThan => duration_compare(key, value).map(|o| o == std::cmp::Ordering::Less),
        DurationLessThanOrEquals => {
            duration_compare(key, value).map(|o| o != std::cmp::Ordering::Greater)
        }
    }
}

/// Equality with wildcard support on strings and cross-representation
/// numeric comparison
pub(crate) fn values_equal(key: &Value, value: &Value) -> bool {
    match (key, value) {
        (Value::String(k), Value::String(v)) => WildMatch::new(v).matches(k),
        _ => match (parse_number(key), parse_number(value)) {
            (Some(k), Some(v)) => (k - v).abs() < f64::EPSILON,
            _ => key == value,
        },
    }
}

/// Scalar-in-list membership; a list key means every element must be in
/// the value list
fn in_set(key: &Value, value: &Value) -> Result<bool> {
    match key {
        Value::Array(_) => set_op(key, value, SetOp::All),
        _ => {
            let list = as_list(value)?;
            Ok(list.iter().any(|v| values_equal(key, v)))
        }
    }
}

#[derive(Clone, Copy)]
enum SetOp {
    Any,
    All,
}

fn set_op(key: &Value, value: &Value, op: SetOp) -> Result<bool> {
    let keys = as_list(key)?;
    let values = as_list(value)?;
    let contained = |k: &Value| values.iter().any(|v| values_equal(k, v));
    Ok(match op {
        SetOp::Any => keys.iter().any(contained),
        SetOp::All => keys.iter().all(contained),
    })
}

fn as_list(value: &Value) -> Result<&Vec<Value>> {
    value.as_array().ok_or_else(|| {
        EngineError::InvalidCondition(format!("expected a list operand, got {}", value))
    })
}

/// Compare two operands numerically. Accepts JSON numbers, numeric
/// strings, and Kubernetes quantity strings.
fn numeric_compare(key: &Value, value: &Value) -> Result<std::cmp::Ordering> {
    let k = parse_number(key).ok_or_else(|| {
        EngineError::InvalidCondition(format!("{} is not a number or quantity", key))
    })?;
    let v = parse_number(value).ok_or_else(|| {
        EngineError::InvalidCondition(format!("{} is not a number or quantity", value))
    })?;
    k.partial_cmp(&v)
        .ok_or_else(|| EngineError::InvalidCondition("incomparable operands".to_string()))
}

/// Compare two durations. Accepts numbers (seconds) and duration strings
/// such as `1h30m`.
fn duration_compare(key: &Value, value: &Value) -> Result<std::cmp::Ordering> {
    let k = parse_duration_seconds(key)?;
    let v = parse_duration_seconds(value)?;
    k.partial_cmp(&v)
        .ok_or_else(|| EngineError::InvalidCondition("incomparable durations".to_string()))
}

fn parse_duration_seconds(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            EngineError::InvalidCondition(format!("{} is not a valid duration", value))
        }),
        Value::String(s) => {
            let span: Span = s.parse().map_err(|e| {
                EngineError::InvalidCondition(format!("{} is not a valid duration: {}", s, e))
            })?;
            span.total(Unit::Second).map_err(|e| {
                EngineError::InvalidCondition(format!("{} is not a valid duration: {}", s, e))
            })
        }
        _ => Err(EngineError::InvalidCondition(format!(
            "{} is not a valid duration",
            value
        ))),
    }
}

/// Parse a value as a float: JSON numbers directly, strings as plain
/// numbers or Kubernetes quantities
pub(crate) fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<f64>().ok().or_else(|| parse_quantity(s))
        }
        _ => None,
    }
}

/// Parse a Kubernetes quantity string (`100Mi`, `2Gi`, `500m`, `3k`)
pub(crate) fn parse_quantity(input: &str) -> Option<f64> {
    const SUFFIXES: &[(&str, f64)] = &[
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("Ei", 1024.0_f64 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
        ("m", 0.001),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
    ];
    for (suffix, multiplier) in SUFFIXES {
        if let Some(numeric) = input.strip_suffix(suffix) {
            return numeric.trim().parse::<f64>().ok().map(|n| n * multiplier);
        }
    }
    None
}
