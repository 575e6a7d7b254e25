//! Cluster-wide engine configuration.
//!
//! Mirrors the settings an admission controller distributes to its engine:
//! group/role exclusions applied during subject matching, username patterns
//! that bypass policy, and resource filters that exempt whole resources
//! from generate-request filtering.

use serde::{Deserialize, Serialize};
use wildmatch::WildMatch;

/// A kind/namespace/name triple excluded from processing.
/// Empty fields match everything; non-empty fields are wildcards.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceFilterEntry {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceFilterEntry {
    fn matches(&self, kind: &str, namespace: &str, name: &str) -> bool {
        let field_matches = |pattern: &str, value: &str| {
            pattern.is_empty() || WildMatch::new(pattern).matches(value)
        };
        field_matches(&self.kind, kind)
            && field_matches(&self.namespace, namespace)
            && field_matches(&self.name, name)
    }
}

/// Cluster-wide settings consumed by the engine
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Group names ignored when matching rule subjects
    pub exclude_group_roles: Vec<String>,

    /// Username patterns whose requests bypass rule matching
    pub exclude_usernames: Vec<String>,

    /// Resources exempted from generate-request filtering
    pub filters: Vec<ResourceFilterEntry>,
}

impl Configuration {
    /// Create a configuration with the conventional system-group exclusions
    pub fn with_defaults() -> Self {
        Self {
            exclude_group_roles: vec![
                "system:serviceaccounts:kube-system".to_string(),
                "system:nodes".to_string(),
                "system:kube-scheduler".to_string(),
            ],
            ..Default::default()
        }
    }

    /// Check whether a resource is excluded by the configured filters
    pub fn is_excluded(&self, kind: &str, namespace: &str, name: &str) -> bool {
        self.filters.iter().any(|f| f.matches(kind, namespace, name))
    }

    /// Check whether a username bypasses policy matching
    pub fn is_excluded_username(&self, username: &str) -> bool {
        self.exclude_usernames
            .iter()
            .any(|p| WildMatch::new(p).matches(username))
    }
}
