//! Per-evaluation context: the policy, the resource slots, and the
//! request metadata.
//!
//! The evaluation context (variable bindings) is deliberately not stored
//! here; it is owned by the caller and threaded through the evaluation as
//! an exclusive borrow, so cloning a policy context for a foreach element
//! never duplicates binding state.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::api::exception::PolicyException;
use crate::api::policy::{AdmissionInfo, ClusterPolicy};
use crate::engine::resource;

/// Everything a single policy evaluation needs besides the variable store
#[derive(Clone, Debug, Default)]
pub struct PolicyContext {
    policy: ClusterPolicy,
    new_resource: Value,
    old_resource: Value,
    admission_info: AdmissionInfo,
    namespace_labels: BTreeMap<String, String>,
    sub_resource: String,
    exclude_group_roles: Vec<String>,
    exceptions: Vec<PolicyException>,
    /// Current foreach element when iteration is element-scoped
    element: Value,
}

impl PolicyContext {
    pub fn new(policy: ClusterPolicy, new_resource: Value) -> Self {
        Self {
            policy,
            new_resource,
            ..Default::default()
        }
    }

    pub fn with_old_resource(mut self, old_resource: Value) -> Self {
        self.old_resource = old_resource;
        self
    }

    pub fn with_admission_info(mut self, admission_info: AdmissionInfo) -> Self {
        self.admission_info = admission_info;
        self
    }

    pub fn with_namespace_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.namespace_labels = labels;
        self
    }

    pub fn with_sub_resource(mut self, sub_resource: impl Into<String>) -> Self {
        self.sub_resource = sub_resource.into();
        self
    }

    pub fn with_exclude_group_roles(mut self, roles: Vec<String>) -> Self {
        self.exclude_group_roles = roles;
        self
    }

    pub fn with_exceptions(mut self, exceptions: Vec<PolicyException>) -> Self {
        self.exceptions = exceptions;
        self
    }

    pub fn policy(&self) -> &ClusterPolicy {
        &self.policy
    }

    pub fn new_resource(&self) -> &Value {
        &self.new_resource
    }

    pub fn old_resource(&self) -> &Value {
        &self.old_resource
    }

    pub fn admission_info(&self) -> &AdmissionInfo {
        &self.admission_info
    }

    pub fn namespace_labels(&self) -> &BTreeMap<String, String> {
        &self.namespace_labels
    }

    pub fn sub_resource(&self) -> &str {
        &self.sub_resource
    }

    pub fn exclude_group_roles(&self) -> &[String] {
        &self.exclude_group_roles
    }

    pub fn element(&self) -> &Value {
        &self.element
    }

    pub fn set_element(&mut self, element: Value) {
        self.element = element;
    }

    /// Exceptions that name the given rule of this context's policy
    pub fn find_exceptions(&self, rule_name: &str) -> Vec<&PolicyException> {
        self.exceptions
            .iter()
            .filter(|e| e.contains(self.policy.name(), rule_name))
            .collect()
    }

    /// A request with an empty new resource is a delete
    pub fn is_delete_request(&self) -> bool {
        resource::is_empty(&self.new_resource)
    }

    /// The resource an engine response should report on: the new resource,
    /// or the old one for delete requests
    pub fn reported_resource(&self) -> &Value {
        if self.is_delete_request() {
            &self.old_resource
        } else {
            &self.new_resource
        }
    }
}
