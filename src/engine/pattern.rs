//! Structural pattern matching of a policy pattern against a resource.
//!
//! Patterns are JSON documents whose object keys may carry anchors (see
//! [`crate::engine::anchor`]) and whose scalar strings may carry
//! comparison operators and wildcards. A mismatch reports the resource
//! path at which matching stopped; conditional-anchor mismatches report a
//! skip instead of a failure.

use serde_json::Value;

use crate::engine::anchor::{is_condition_anchor, Anchor};
use crate::engine::operators::parse_number;
use wildmatch::WildMatch;

/// A pattern mismatch.
///
/// `skip=true` means a conditional anchor did not select the resource and
/// the rule should report skip. An empty `path` marks a malformed pattern
/// rather than a resource violation.
#[derive(Clone, Debug)]
pub struct PatternError {
    pub path: String,
    pub skip: bool,
    pub message: String,
}

impl PatternError {
    fn fail(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            skip: false,
            message: message.into(),
        }
    }

    fn skip(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            skip: true,
            message: message.into(),
        }
    }

    fn into_skip(mut self) -> Self {
        self.skip = true;
        self
    }
}

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} at path {}", self.message, self.path)
        }
    }
}

impl std::error::Error for PatternError {}

/// Match a pattern document against a resource document
pub fn match_pattern(resource: &Value, pattern: &Value) -> Result<(), PatternError> {
    validate_element(resource, pattern, "/")
}

fn validate_element(resource: &Value, pattern: &Value, path: &str) -> Result<(), PatternError> {
    match pattern {
        Value::Object(pattern_map) => match resource.as_object() {
            Some(resource_map) => validate_map(resource_map, pattern_map, path),
            None => Err(PatternError::fail(path, "expected an object")),
        },
        Value::Array(pattern_items) => match resource.as_array() {
            Some(resource_items) => validate_array(resource_items, pattern_items, path),
            None => Err(PatternError::fail(path, "expected an array")),
        },
        scalar => {
            if match_scalar(resource, scalar) {
                Ok(())
            } else {
                Err(PatternError::fail(
                    path,
                    format!("value {} does not match pattern {}", resource, scalar),
                ))
            }
        }
    }
}

fn validate_map(
    resource: &serde_json::Map<String, Value>,
    pattern: &serde_json::Map<String, Value>,
    path: &str,
) -> Result<(), PatternError> {
    for (raw_key, pattern_value) in pattern {
        let anchor = Anchor::parse(raw_key);
        let key = anchor.key();
        let child = format!("{}{}/", path, key);

        match anchor {
            Anchor::Condition(_) | Anchor::Global(_) => match resource.get(key) {
                Some(value) => {
                    validate_element(value, pattern_value, &child)
                        .map_err(PatternError::into_skip)?;
                }
                None => {
                    return Err(PatternError::skip(
                        &child,
                        format!("conditional anchor key {} is not present", key),
                    ));
                }
            },
            Anchor::Equality(_) => match resource.get(key) {
                Some(value) if value == pattern_value => {}
                Some(_) => {
                    return Err(PatternError::fail(
                        &child,
                        format!("value of {} is not equal to the pattern value", key),
                    ));
                }
                None => {
                    return Err(PatternError::fail(&child, format!("{} is missing", key)));
                }
            },
            Anchor::Existence(_) => {
                if !resource.contains_key(key) {
                    return Err(PatternError::fail(&child, format!("{} is missing", key)));
                }
            }
            Anchor::Negation(_) => {
                if let Some(value) = resource.get(key) {
                    if validate_element(value, pattern_value, &child).is_ok() {
                        return Err(PatternError::fail(
                            &child,
                            format!("{} is not allowed", key),
                        ));
                    }
                }
            }
            Anchor::Plain(_) | Anchor::AddIfNotPresent(_) => {
                if pattern_value.is_null() {
                    // a null pattern matches only absence
                    match resource.get(key) {
                        None | Some(Value::Null) => {}
                        Some(_) => {
                            return Err(PatternError::fail(
                                &child,
                                format!("{} is not allowed", key),
                            ));
                        }
                    }
                } else {
                    match resource.get(key) {
                        Some(value) => validate_element(value, pattern_value, &child)?,
                        None => {
                            return Err(PatternError::fail(
                                &child,
                                format!("{} is missing", key),
                            ));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn validate_array(
    resource: &[Value],
    pattern: &[Value],
    path: &str,
) -> Result<(), PatternError> {
    for pattern_item in pattern {
        match pattern_item {
            Value::Object(pattern_map) => {
                let is_selector = pattern_map.keys().any(|k| is_condition_anchor(k));
                for (i, resource_item) in resource.iter().enumerate() {
                    let child = format!("{}{}/", path, i);
                    match validate_element(resource_item, pattern_item, &child) {
                        Ok(()) => {}
                        // an unselected element is ignored, not failed
                        Err(e) if is_selector && e.skip => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            other => {
                let matched = resource
                    .iter()
                    .enumerate()
                    .any(|(i, item)| {
                        let child = format!("{}{}/", path, i);
                        validate_element(item, other, &child).is_ok()
                    });
                if !matched {
                    return Err(PatternError::fail(
                        path,
                        format!("no element matches pattern {}", other),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Match a resource scalar against a scalar pattern
pub(crate) fn match_scalar(resource: &Value, pattern: &Value) -> bool {
    match pattern {
        Value::String(s) => s
            .split('|')
            .map(str::trim)
            .any(|alternative| match_string_pattern(resource, alternative)),
        Value::Number(_) => match (parse_number(resource), parse_number(pattern)) {
            (Some(r), Some(p)) => (r - p).abs() < f64::EPSILON,
            _ => false,
        },
        Value::Bool(b) => resource.as_bool() == Some(*b),
        Value::Null => resource.is_null(),
        _ => false,
    }
}

/// Match against a single string pattern, honoring a leading operator
fn match_string_pattern(resource: &Value, pattern: &str) -> bool {
    let numeric = |operand: &str, cmp: fn(std::cmp::Ordering) -> bool| {
        match (parse_number(resource), parse_number(&Value::String(operand.to_string()))) {
            (Some(r), Some(p)) => r.partial_cmp(&p).map(cmp).unwrap_or(false),
            _ => false,
        }
    };

    if let Some(operand) = pattern.strip_prefix(">=") {
        numeric(operand.trim(), |o| o != std::cmp::Ordering::Less)
    } else if let Some(operand) = pattern.strip_prefix("<=") {
        numeric(operand.trim(), |o| o != std::cmp::Ordering::Greater)
    } else if let Some(operand) = pattern.strip_prefix("!=") {
        !scalar_equal(resource, operand.trim())
    } else if let Some(operand) = pattern.strip_prefix('>') {
        numeric(operand.trim(), |o| o == std::cmp::Ordering::Greater)
    } else if let Some(operand) = pattern.strip_prefix('<') {
        numeric(operand.trim(), |o| o == std::cmp::Ordering::Less)
    } else if let Some(operand) = pattern.strip_prefix('!') {
        !scalar_equal(resource, operand.trim())
    } else if let Some(operand) = pattern.strip_prefix('=') {
        scalar_equal(resource, operand.trim())
    } else {
        scalar_equal(resource, pattern)
    }
}

/// Equality of a resource scalar with a string operand, with wildcards
fn scalar_equal(resource: &Value, operand: &str) -> bool {
    match resource {
        Value::String(s) => WildMatch::new(operand).matches(s),
        Value::Number(_) => match (parse_number(resource), operand.trim().parse::<f64>().ok()) {
            (Some(r), Some(p)) => (r - p).abs() < f64::EPSILON,
            _ => false,
        },
        Value::Bool(b) => operand == b.to_string(),
        _ => false,
    }
}
