//! Auto-generation of pod-controller rules.
//!
//! A rule that targets bare pods with a structural pattern is expanded
//! into sibling rules for the workload controllers, wrapping the pod
//! pattern under the controller's pod template path. The
//! `pod-policies.kyverno.io/autogen-controllers` annotation overrides the
//! controller list; `none` disables expansion.

use serde_json::{json, Value};

use crate::api::policy::{ClusterPolicy, Rule, POD_CONTROLLERS_ANNOTATION};

const DEFAULT_CONTROLLERS: &[&str] = &[
    "DaemonSet",
    "Deployment",
    "Job",
    "StatefulSet",
    "ReplicaSet",
    "ReplicationController",
    "CronJob",
];

/// Produce the final ordered rule list for a policy: each source rule
/// followed by its generated controller variants
pub fn compute_rules(policy: &ClusterPolicy) -> Vec<Rule> {
    let controllers = match policy.annotation(POD_CONTROLLERS_ANNOTATION) {
        Some("none") => Vec::new(),
        Some(list) => list.split(',').map(|c| c.trim().to_string()).collect(),
        None => DEFAULT_CONTROLLERS.iter().map(|c| c.to_string()).collect(),
    };

    let mut rules = Vec::new();
    for rule in &policy.spec.rules {
        rules.push(rule.clone());
        if controllers.is_empty() || !can_auto_gen(rule) {
            continue;
        }

        let workload_controllers: Vec<String> = controllers
            .iter()
            .filter(|c| c.as_str() != "CronJob")
            .cloned()
            .collect();
        if !workload_controllers.is_empty() {
            rules.push(generate_rule(
                rule,
                format!("autogen-{}", rule.name),
                workload_controllers,
                wrap_pod_pattern,
            ));
        }
        if controllers.iter().any(|c| c == "CronJob") {
            rules.push(generate_rule(
                rule,
                format!("autogen-cronjob-{}", rule.name),
                vec!["CronJob".to_string()],
                wrap_cronjob_pattern,
            ));
        }
    }
    rules
}

/// A rule qualifies for expansion when it targets exactly bare pods with
/// a structural pattern and carries no pod-specific pinning
fn can_auto_gen(rule: &Rule) -> bool {
    let m = &rule.match_resources;
    if m.resources.kinds != ["Pod"] {
        return false;
    }
    if m.resources.name.is_some()
        || !m.resources.names.is_empty()
        || m.resources.selector.is_some()
        || !m.resources.annotations.is_empty()
        || !m.any.is_empty()
        || !m.all.is_empty()
    {
        return false;
    }
    if !rule.exclude_resources.is_empty() {
        return false;
    }
    match &rule.validate {
        Some(v) => v.pattern.is_some() || v.any_pattern.is_some(),
        None => false,
    }
}

fn generate_rule(
    rule: &Rule,
    name: String,
    kinds: Vec<String>,
    wrap: fn(&Value) -> Value,
) -> Rule {
    let mut generated = rule.clone();
    generated.name = name;
    generated.match_resources.resources.kinds = kinds;
    if let Some(validation) = &mut generated.validate {
        if let Some(pattern) = &validation.pattern {
            validation.pattern = Some(wrap(pattern));
        }
        if let Some(Value::Array(patterns)) = &validation.any_pattern {
            validation.any_pattern =
                Some(Value::Array(patterns.iter().map(wrap).collect()));
        }
    }
    generated
}

fn wrap_pod_pattern(pattern: &Value) -> Value {
    json!({"spec": {"template": pattern}})
}

fn wrap_cronjob_pattern(pattern: &Value) -> Value {
    json!({"spec": {"jobTemplate": {"spec": {"template": pattern}}}})
}
