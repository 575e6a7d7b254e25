//! Evaluation context: a checkpointable store of variable bindings.
//!
//! Bindings are kept in an append-only log; a checkpoint records the log
//! length, restore truncates back to it, and reset truncates without
//! popping. Queries are JMESPath expressions evaluated against the merged
//! view of all live bindings.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::api::policy::AdmissionInfo;
use crate::engine::error::{EngineError, Result};

/// A checkpoint/restore store of named JSON bindings
#[derive(Clone, Debug, Default)]
pub struct EvalContext {
    /// Append-only binding log; later entries shadow earlier ones
    bindings: Vec<(String, Value)>,
    /// Log offsets recorded by `checkpoint`
    checkpoints: Vec<usize>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable. Dotted names nest: `request.object` becomes the
    /// `object` field of the `request` document.
    pub fn add(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.push((name.into(), value));
    }

    /// Bind the resource under admission as `request.object`
    pub fn add_resource(&mut self, resource: Value) {
        self.add("request.object", resource);
    }

    /// Bind the prior state of the resource as `request.oldObject`
    pub fn add_old_resource(&mut self, resource: Value) {
        self.add("request.oldObject", resource);
    }

    /// Bind the admission user identity under `request.userInfo`,
    /// `request.roles`, and `request.clusterRoles`
    pub fn add_admission_info(&mut self, info: &AdmissionInfo) -> Result<()> {
        self.add(
            "request.userInfo",
            serde_json::to_value(&info.admission_user_info)?,
        );
        self.add("request.roles", serde_json::to_value(&info.roles)?);
        self.add(
            "request.clusterRoles",
            serde_json::to_value(&info.cluster_roles)?,
        );
        Ok(())
    }

    /// Bind the labels of the resource's namespace
    pub fn add_namespace_labels(&mut self, labels: &BTreeMap<String, String>) -> Result<()> {
        self.add("request.namespaceLabels", serde_json::to_value(labels)?);
        Ok(())
    }

    /// Bind the current foreach element at the given iteration depth.
    ///
    /// The element is visible both at the bare names (`element`,
    /// `elementIndex`) and at depth-suffixed names (`element0`,
    /// `elementIndex0`, ...) so outer bindings stay addressable from
    /// nested iterations.
    pub fn add_element(&mut self, element: Value, index: usize, nesting: usize) {
        self.add(format!("element{}", nesting), element.clone());
        self.add(format!("elementIndex{}", nesting), Value::from(index));
        self.add("element", element);
        self.add("elementIndex", Value::from(index));
    }

    /// Push a snapshot of the current binding set
    pub fn checkpoint(&mut self) {
        self.checkpoints.push(self.bindings.len());
    }

    /// Pop to the most recent snapshot
    pub fn restore(&mut self) {
        match self.checkpoints.pop() {
            Some(offset) => self.bindings.truncate(offset),
            None => warn!("restore called with no checkpoint"),
        }
    }

    /// Revert to the most recent snapshot without popping it
    pub fn reset(&mut self) {
        match self.checkpoints.last() {
            Some(&offset) => self.bindings.truncate(offset),
            None => warn!("reset called with no checkpoint"),
        }
    }

    /// Current checkpoint stack depth
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// Evaluate a JMESPath expression against the current bindings.
    ///
    /// A null result is reported as `EngineError::NotFound` (a soft error);
    /// an expression that fails to compile or evaluate is
    /// `EngineError::MalformedQuery`.
    pub fn query(&self, expression: &str) -> Result<Value> {
        let malformed = |e: &dyn std::fmt::Display| EngineError::MalformedQuery {
            expression: expression.to_string(),
            message: e.to_string(),
        };

        let compiled = jmespath::compile(expression).map_err(|e| malformed(&e))?;
        let root = jmespath::Variable::from_json(&serde_json::to_string(&self.root())?)
            .map_err(|e| malformed(&e))?;
        let result = compiled.search(root).map_err(|e| malformed(&e))?;
        if result.is_null() {
            return Err(EngineError::NotFound(expression.to_string()));
        }
        Ok(serde_json::to_value(&*result)?)
    }

    /// Merge the live bindings into a single document
    fn root(&self) -> Value {
        let mut root = Map::new();
        for (name, value) in &self.bindings {
            deep_set(&mut root, name, value.clone());
        }
        Value::Object(root)
    }
}

/// Set `value` at a dotted path, creating intermediate objects as needed
fn deep_set(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(map) => current = map,
            // unreachable: slot was just coerced to an object
            None => return,
        }
    }
}
