//! Engine response types.
//!
//! An evaluation produces one `EngineResponse` per policy: the resource
//! identity, the ordered rule responses, and counters. Applied counts
//! cover passes and failures; skips and errors are tracked separately.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::policy::{PodSecurityLevel, ValidationFailureAction, ValidationFailureActionOverride};
use crate::engine::podsecurity::PodSecurityCheckResult;

/// Outcome of a single rule evaluation
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// The rule was applied and the resource satisfied it
    Pass,
    /// The rule was applied and the resource violated it
    Fail,
    /// A warning; reported but never blocks
    Warn,
    /// The rule did not apply (preconditions, exception, conditional anchor)
    Skip,
    /// The rule could not be evaluated
    Error,
}

impl std::fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleStatus::Pass => write!(f, "pass"),
            RuleStatus::Fail => write!(f, "fail"),
            RuleStatus::Warn => write!(f, "warn"),
            RuleStatus::Skip => write!(f, "skip"),
            RuleStatus::Error => write!(f, "error"),
        }
    }
}

/// The rule family a response belongs to
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum RuleType {
    Validation,
    Generation,
}

/// Timing of a single rule or policy evaluation
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    /// Wall-clock time spent, in milliseconds
    #[serde(with = "duration_ms")]
    pub processing_time: Duration,
    /// Unix timestamp of the evaluation start
    pub timestamp: i64,
}

/// Serialize a `Duration` as integer milliseconds
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Pod security check records attached to a pod-security rule response
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityChecks {
    pub level: PodSecurityLevel,
    pub version: String,
    pub checks: Vec<PodSecurityCheckResult>,
}

/// Response for one evaluated rule
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    pub name: String,
    #[serde(rename = "ruleType")]
    pub rule_type: RuleType,
    pub message: String,
    pub status: RuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security_checks: Option<PodSecurityChecks>,
    #[serde(flatten)]
    pub execution_stats: ExecutionStats,
}

impl RuleResponse {
    /// Create a rule response with zeroed stats; the driver fills timing in
    pub fn new(
        name: impl Into<String>,
        rule_type: RuleType,
        message: impl Into<String>,
        status: RuleStatus,
    ) -> Self {
        Self {
            name: name.into(),
            rule_type,
            message: message.into(),
            status,
            pod_security_checks: None,
            execution_stats: ExecutionStats::default(),
        }
    }

    /// Attach pod security check records
    pub fn with_pod_security_checks(mut self, checks: PodSecurityChecks) -> Self {
        self.pod_security_checks = Some(checks);
        self
    }
}

/// Identity of the evaluated policy
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRef {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

/// Identity of the evaluated resource
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

/// Per-policy accounting
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStats {
    /// Rules that passed or failed
    pub rules_applied_count: usize,
    /// Rules that errored
    pub rules_error_count: usize,
    #[serde(flatten)]
    pub execution_stats: ExecutionStats,
}

/// The policy-level portion of an engine response
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub policy: PolicyRef,
    pub resource: ResourceSpec,
    #[serde(flatten)]
    pub stats: PolicyStats,
    #[serde(default)]
    pub rules: Vec<RuleResponse>,
    #[serde(default)]
    pub validation_failure_action: ValidationFailureAction,
    #[serde(default)]
    pub validation_failure_action_overrides: Vec<ValidationFailureActionOverride>,
}

/// The complete result of evaluating one policy against one resource
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineResponse {
    /// For validation this is the resource under test (the old resource on
    /// delete requests)
    #[serde(default)]
    pub patched_resource: Value,
    /// Labels of the resource's namespace at evaluation time
    #[serde(default)]
    pub namespace_labels: BTreeMap<String, String>,
    pub policy_response: PolicyResponse,
}

impl EngineResponse {
    /// True when no rule failed or errored
    pub fn is_successful(&self) -> bool {
        !self
            .policy_response
            .rules
            .iter()
            .any(|r| matches!(r.status, RuleStatus::Fail | RuleStatus::Error))
    }

    /// Rule responses with the given status
    pub fn rules_with_status(&self, status: RuleStatus) -> Vec<&RuleResponse> {
        self.policy_response
            .rules
            .iter()
            .filter(|r| r.status == status)
            .collect()
    }
}
