//! Match/exclude filtering: does a rule apply to a resource and request?
//!
//! A rule matches when its include predicates accept the resource (kinds,
//! names, namespaces, selectors, subjects, roles) and its exclude block,
//! if present, does not. Both the legacy inline block and the `any`/`all`
//! filter lists are supported.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde_json::Value;
use wildmatch::WildMatch;

use crate::api::policy::{AdmissionInfo, MatchResources, ResourceDescription, Subject};
use crate::engine::resource;

/// Context for one match evaluation
pub struct MatchInput<'a> {
    pub resource: &'a Value,
    pub admission_info: &'a AdmissionInfo,
    pub exclude_group_roles: &'a [String],
    pub namespace_labels: &'a BTreeMap<String, String>,
    pub sub_resource: &'a str,
}

/// Evaluate a rule's match and exclude blocks against one resource.
/// Returns the reasons the rule did not match, empty on success.
pub fn matches_resource_description(
    input: &MatchInput<'_>,
    match_resources: &MatchResources,
    exclude_resources: &MatchResources,
) -> Result<(), Vec<String>> {
    let mut reasons = check_match_block(input, match_resources);

    if !exclude_resources.is_empty() && check_match_block(input, exclude_resources).is_empty() {
        reasons.push("resource is excluded by the rule".to_string());
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(reasons)
    }
}

/// Evaluate one match block; empty result means the block accepts the
/// resource. An entirely empty block accepts everything.
fn check_match_block(input: &MatchInput<'_>, block: &MatchResources) -> Vec<String> {
    let mut reasons = Vec::new();

    if !block.any.is_empty() {
        let any_matched = block.any.iter().any(|f| {
            check_filter(
                input,
                &f.resources,
                &f.subjects,
                &f.roles,
                &f.cluster_roles,
            )
            .is_empty()
        });
        if !any_matched {
            reasons.push("no filter in the any block matched".to_string());
        }
    }

    for filter in &block.all {
        reasons.extend(check_filter(
            input,
            &filter.resources,
            &filter.subjects,
            &filter.roles,
            &filter.cluster_roles,
        ));
    }

    reasons.extend(check_filter(
        input,
        &block.resources,
        &block.subjects,
        &block.roles,
        &block.cluster_roles,
    ));

    reasons
}

fn check_filter(
    input: &MatchInput<'_>,
    description: &ResourceDescription,
    subjects: &[Subject],
    roles: &[String],
    cluster_roles: &[String],
) -> Vec<String> {
    let mut reasons = check_resource_description(input, description);

    // user info predicates are OR-ed: any of subjects/roles/clusterRoles
    // matching is enough
    if !subjects.is_empty() || !roles.is_empty() || !cluster_roles.is_empty() {
        let subject_ok = check_subjects(subjects, input.admission_info, input.exclude_group_roles);
        let roles_ok = match_any_wildcard(roles, &input.admission_info.roles);
        let cluster_roles_ok =
            match_any_wildcard(cluster_roles, &input.admission_info.cluster_roles);
        if !(subject_ok || roles_ok || cluster_roles_ok) {
            reasons.push("no subject, role, or cluster role matched".to_string());
        }
    }

    reasons
}

fn check_resource_description(
    input: &MatchInput<'_>,
    description: &ResourceDescription,
) -> Vec<String> {
    let mut reasons = Vec::new();
    let resource = input.resource;

    if !description.kinds.is_empty()
        && !description
            .kinds
            .iter()
            .any(|k| kind_matches(k, resource, input.sub_resource))
    {
        reasons.push(format!(
            "kind {} does not match rule kinds {:?}",
            resource::kind(resource),
            description.kinds
        ));
    }

    let resource_name = resource::name(resource);
    if let Some(name) = &description.name {
        if !WildMatch::new(name).matches(resource_name) {
            reasons.push(format!("name {} does not match {}", resource_name, name));
        }
    }
    if !description.names.is_empty()
        && !description
            .names
            .iter()
            .any(|n| WildMatch::new(n).matches(resource_name))
    {
        reasons.push(format!(
            "name {} does not match rule names",
            resource_name
        ));
    }

    if !description.namespaces.is_empty() {
        let ns = resource::namespace(resource);
        if !description
            .namespaces
            .iter()
            .any(|pattern| WildMatch::new(pattern).matches(ns))
        {
            reasons.push(format!("namespace {} does not match rule namespaces", ns));
        }
    }

    if !description.annotations.is_empty() {
        let annotations = resource::annotations(resource);
        for (key_pattern, value_pattern) in &description.annotations {
            let matched = annotations.iter().any(|(k, v)| {
                WildMatch::new(key_pattern).matches(k) && WildMatch::new(value_pattern).matches(v)
            });
            if !matched {
                reasons.push(format!("annotation {} does not match", key_pattern));
            }
        }
    }

    if let Some(selector) = &description.selector {
        if !label_selector_matches(selector, &resource::labels(resource)) {
            reasons.push("resource labels do not match the rule selector".to_string());
        }
    }

    if let Some(selector) = &description.namespace_selector {
        if !label_selector_matches(selector, input.namespace_labels) {
            reasons.push("namespace labels do not match the rule selector".to_string());
        }
    }

    reasons
}

/// Match one kind entry against a resource. Entries may be `kind`,
/// `kind/subresource`, `version/kind`, `group/version/kind`, or
/// `group/version/kind/subresource`; `*` matches any kind.
fn kind_matches(entry: &str, resource: &Value, sub_resource: &str) -> bool {
    let resource_kind = resource::kind(resource);
    let (group, version) = split_api_version(resource::api_version(resource));

    let parts: Vec<&str> = entry.split('/').collect();
    let (want_group, want_version, want_kind, want_sub) = match parts.as_slice() {
        [kind] => (None, None, *kind, None),
        [first, kind] => {
            // uppercase first segment means kind/subresource, otherwise a
            // version or group qualifier
            if first.chars().next().is_some_and(char::is_uppercase) {
                (None, None, *first, Some(*kind))
            } else {
                (None, Some(*first), *kind, None)
            }
        }
        [group, version, kind] => (Some(*group), Some(*version), *kind, None),
        [group, version, kind, sub] => (Some(*group), Some(*version), *kind, Some(*sub)),
        _ => return false,
    };

    if !(want_kind == "*" || WildMatch::new(want_kind).matches(resource_kind)) {
        return false;
    }
    if let Some(want_version) = want_version {
        // a bare qualifier may be either the version or the group
        if want_group.is_none() {
            if !(WildMatch::new(want_version).matches(version)
                || WildMatch::new(want_version).matches(group))
            {
                return false;
            }
        } else if !WildMatch::new(want_version).matches(version) {
            return false;
        }
    }
    if let Some(want_group) = want_group {
        if !WildMatch::new(want_group).matches(group) {
            return false;
        }
    }
    if let Some(want_sub) = want_sub {
        if !WildMatch::new(want_sub).matches(sub_resource) {
            return false;
        }
    }
    true
}

fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

fn check_subjects(
    subjects: &[Subject],
    admission_info: &AdmissionInfo,
    exclude_group_roles: &[String],
) -> bool {
    subjects.iter().any(|subject| match subject.kind.as_str() {
        "User" => WildMatch::new(&subject.name).matches(admission_info.username()),
        "Group" => admission_info.groups().iter().any(|g| {
            !exclude_group_roles.contains(g) && WildMatch::new(&subject.name).matches(g)
        }),
        "ServiceAccount" => {
            let ns = subject.namespace.as_deref().unwrap_or("default");
            let expected = format!("system:serviceaccount:{}:{}", ns, subject.name);
            admission_info.username() == expected
        }
        _ => false,
    })
}

fn match_any_wildcard(patterns: &[String], values: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        let matcher = WildMatch::new(pattern);
        values.iter().any(|v| matcher.matches(v))
    })
}

/// Evaluate a label selector (matchLabels + matchExpressions) against a
/// label set
pub fn label_selector_matches(
    selector: &LabelSelector,
    labels: &BTreeMap<String, String>,
) -> bool {
    if let Some(match_labels) = &selector.match_labels {
        for (k, v) in match_labels {
            if labels.get(k) != Some(v) {
                return false;
            }
        }
    }
    if let Some(expressions) = &selector.match_expressions {
        for requirement in expressions {
            let current = labels.get(&requirement.key);
            let values = requirement.values.as_deref().unwrap_or_default();
            let ok = match requirement.operator.as_str() {
                "In" => current.is_some_and(|v| values.contains(v)),
                "NotIn" => !current.is_some_and(|v| values.contains(v)),
                "Exists" => current.is_some(),
                "DoesNotExist" => current.is_none(),
                _ => false,
            };
            if !ok {
                return false;
            }
        }
    }
    true
}
