//! Policy exception documents.
//!
//! An exception names one or more policy/rule pairs and carries its own
//! match block; when a matched rule has an applicable exception, the rule
//! reports skip instead of its normal outcome.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::policy::MatchResources;
use crate::engine::error::{EngineError, Result};

/// An exception that overrides matched rules to skip
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyException {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PolicyExceptionSpec,
}

/// Exception spec: the rules it overrides and the resources it covers
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyExceptionSpec {
    /// Policy/rule pairs this exception applies to
    #[serde(default)]
    pub exceptions: Vec<Exception>,
    /// Resources this exception covers
    #[serde(default, rename = "match")]
    pub match_resources: MatchResources,
}

/// One policy/rule pair named by an exception
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub policy_name: String,
    #[serde(default)]
    pub rule_names: Vec<String>,
}

impl PolicyException {
    /// Check whether this exception names the given policy and rule
    pub fn contains(&self, policy_name: &str, rule_name: &str) -> bool {
        self.spec.exceptions.iter().any(|e| {
            e.policy_name == policy_name && e.rule_names.iter().any(|r| r == rule_name)
        })
    }

    /// The `namespace/name` key identifying this exception
    pub fn key(&self) -> Result<String> {
        let name = self
            .metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| EngineError::Internal("policy exception has no name".to_string()))?;
        match self.metadata.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            Some(ns) => Ok(format!("{}/{}", ns, name)),
            None => Ok(name.to_string()),
        }
    }
}
