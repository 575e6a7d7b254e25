//! Test fixtures and builders for policy evaluations.

use std::collections::BTreeMap;

use k8s_openapi::api::authentication::v1::UserInfo;
use policy_engine::api::policy::AdmissionInfo;
use policy_engine::{
    validate, ClusterPolicy, Configuration, EngineResponse, EvalContext, NoExternalLoader,
    PolicyContext, PolicyException,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Builder for evaluation runs.
///
/// # Example
/// ```ignore
/// let response = Evaluation::new(policy, resource).run().await;
/// ```
pub struct Evaluation {
    policy: ClusterPolicy,
    new_resource: Value,
    old_resource: Value,
    admission_info: AdmissionInfo,
    namespace_labels: BTreeMap<String, String>,
    exceptions: Vec<PolicyException>,
    configuration: Configuration,
    token: CancellationToken,
}

impl Evaluation {
    pub fn new(policy: Value, new_resource: Value) -> Self {
        Self {
            policy: parse_policy(policy),
            new_resource,
            old_resource: Value::Null,
            admission_info: AdmissionInfo::default(),
            namespace_labels: BTreeMap::new(),
            exceptions: Vec::new(),
            configuration: Configuration::with_defaults(),
            token: CancellationToken::new(),
        }
    }

    pub fn old_resource(mut self, old_resource: Value) -> Self {
        self.old_resource = old_resource;
        self
    }

    pub fn username(mut self, username: &str) -> Self {
        self.admission_info = AdmissionInfo {
            admission_user_info: UserInfo {
                username: Some(username.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        self
    }

    pub fn exception(mut self, exception: Value) -> Self {
        self.exceptions.push(
            serde_json::from_value(exception).expect("invalid exception fixture"),
        );
        self
    }

    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn cancelled(mut self) -> Self {
        self.token = CancellationToken::new();
        self.token.cancel();
        self
    }

    pub fn policy_context(&self) -> PolicyContext {
        PolicyContext::new(self.policy.clone(), self.new_resource.clone())
            .with_old_resource(self.old_resource.clone())
            .with_admission_info(self.admission_info.clone())
            .with_namespace_labels(self.namespace_labels.clone())
            .with_exceptions(self.exceptions.clone())
    }

    pub async fn run(&self) -> EngineResponse {
        let mut jctx = EvalContext::new();
        self.run_with_context(&mut jctx).await
    }

    pub async fn run_with_context(&self, jctx: &mut EvalContext) -> EngineResponse {
        let ctx = self.policy_context();
        validate(&self.token, &NoExternalLoader, &ctx, jctx, &self.configuration).await
    }
}

pub fn parse_policy(policy: Value) -> ClusterPolicy {
    serde_json::from_value(policy).expect("invalid policy fixture")
}

/// A single-rule validation policy over Pod resources
pub fn pod_policy(rule_name: &str, validate_payload: Value) -> Value {
    json!({
        "metadata": {
            "name": "test-policy",
            "annotations": {"pod-policies.kyverno.io/autogen-controllers": "none"}
        },
        "spec": {"rules": [{
            "name": rule_name,
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": validate_payload
        }]}
    })
}

/// A pod resource with the given labels
pub fn pod_with_labels(labels: Value) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "nginx", "namespace": "default", "labels": labels},
        "spec": {"containers": [{"name": "app", "image": "nginx:1.25"}]}
    })
}

/// A pod resource with the given containers
pub fn pod_with_containers(containers: Value) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "nginx", "namespace": "default"},
        "spec": {"containers": containers}
    })
}
