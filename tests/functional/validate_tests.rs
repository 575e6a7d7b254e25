//! Validation scenarios: patterns, anyPattern, deny, pod security, and
//! driver behavior.

use policy_engine::RuleStatus;
use serde_json::json;

use crate::{parse_policy, pod_policy, pod_with_labels, Evaluation};

#[tokio::test]
async fn test_required_label_pass() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({"app": "web"})))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "r1");
    assert_eq!(rules[0].status, RuleStatus::Pass);
    assert_eq!(response.policy_response.stats.rules_applied_count, 1);
}

#[tokio::test]
async fn test_missing_label_fails_with_path() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Fail);
    assert!(
        rules[0].message.contains("/metadata/labels/app"),
        "message should name the failing path: {}",
        rules[0].message
    );
}

#[tokio::test]
async fn test_conditional_anchor_skips_rule() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"spec": {
            "(containers)": [{"name": "sidecar"}],
            "replicas": ">=2"
        }}}),
    );
    let resource = json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "p", "namespace": "default"},
        "spec": {"containers": [{"name": "app"}], "replicas": 1}
    });
    let response = Evaluation::new(policy, resource).run().await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Skip);
    assert_eq!(response.policy_response.stats.rules_applied_count, 0);
}

#[tokio::test]
async fn test_deny_on_username() {
    let policy = pod_policy(
        "block-anonymous",
        json!({
            "message": "anonymous requests are not allowed",
            "deny": {"conditions": {"any": [{
                "key": "{{request.userInfo.username}}",
                "operator": "Equals",
                "value": "system:anonymous"
            }]}}
        }),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .username("system:anonymous")
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Fail);
    assert_eq!(rules[0].message, "anonymous requests are not allowed");
}

#[tokio::test]
async fn test_deny_passes_for_other_user() {
    let policy = pod_policy(
        "block-anonymous",
        json!({"deny": {"conditions": {"any": [{
            "key": "{{request.userInfo.username}}",
            "operator": "Equals",
            "value": "system:anonymous"
        }]}}}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .username("alice")
        .run()
        .await;

    assert_eq!(response.policy_response.rules[0].status, RuleStatus::Pass);
}

#[tokio::test]
async fn test_apply_one_short_circuits() {
    let rule = |name: &str| {
        json!({
            "name": name,
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": {"pattern": {"kind": "Pod"}}
        })
    };
    let policy = json!({
        "metadata": {"name": "apply-one"},
        "spec": {
            "applyRules": "One",
            "rules": [rule("r1"), rule("r2"), rule("r3")]
        }
    });
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "r1");
    assert_eq!(response.policy_response.stats.rules_applied_count, 1);
}

#[tokio::test]
async fn test_any_pattern_passes_on_first_match() {
    let policy = pod_policy(
        "r1",
        json!({"anyPattern": [
            {"metadata": {"labels": {"tier": "?*"}}},
            {"metadata": {"labels": {"app": "?*"}}}
        ]}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({"app": "web"})))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules[0].status, RuleStatus::Pass);
    assert!(rules[0].message.contains("anyPattern[1]"));
}

#[tokio::test]
async fn test_any_pattern_fail_aggregates_messages() {
    let policy = pod_policy(
        "r1",
        json!({
            "message": "a label is required",
            "anyPattern": [
                {"metadata": {"labels": {"tier": "?*"}}},
                {"metadata": {"labels": {"app": "?*"}}}
            ]
        }),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules[0].status, RuleStatus::Fail);
    assert!(rules[0].message.contains("a label is required"));
    assert!(rules[0].message.contains("r1[0]"));
    assert!(rules[0].message.contains("r1[1]"));
}

#[tokio::test]
async fn test_any_pattern_all_skipped_is_skip() {
    let policy = pod_policy(
        "r1",
        json!({"anyPattern": [
            {"spec": {"(initContainers)": [{"name": "init"}]}},
            {"spec": {"(ephemeralContainers)": [{"name": "debug"}]}}
        ]}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    assert_eq!(response.policy_response.rules[0].status, RuleStatus::Skip);
}

#[tokio::test]
async fn test_delete_request_skips_patterns_but_evaluates_deny() {
    let pattern_policy = pod_policy(
        "require-label",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let response = Evaluation::new(pattern_policy, serde_json::Value::Null)
        .old_resource(pod_with_labels(json!({})))
        .run()
        .await;
    // pattern rules do not run on deletes
    assert!(response.policy_response.rules.is_empty());

    let deny_policy = pod_policy(
        "block-anonymous-delete",
        json!({"deny": {"conditions": {"any": [{
            "key": "{{request.userInfo.username}}",
            "operator": "Equals",
            "value": "system:anonymous"
        }]}}}),
    );
    let response = Evaluation::new(deny_policy, serde_json::Value::Null)
        .old_resource(pod_with_labels(json!({})))
        .username("system:anonymous")
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Fail);
}

#[tokio::test]
async fn test_namespaced_policy_ignores_foreign_namespace() {
    let mut policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    policy["metadata"]["namespace"] = json!("apps");

    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;
    // the pod is in "default", the policy in "apps"
    assert!(response.policy_response.rules.is_empty());
}

#[tokio::test]
async fn test_preconditions_false_skips() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let mut policy = parse_policy(policy);
    policy.spec.rules[0].preconditions = Some(
        serde_json::from_value(json!({"all": [{
            "key": "{{request.object.metadata.namespace}}",
            "operator": "Equals",
            "value": "production"
        }]}))
        .unwrap(),
    );

    let response = Evaluation::new(
        serde_json::to_value(&policy).unwrap(),
        pod_with_labels(json!({})),
    )
    .run()
    .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Skip);
    assert_eq!(rules[0].message, "preconditions not met");
}

#[tokio::test]
async fn test_exception_skips_matched_rule() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .exception(json!({
            "metadata": {"name": "legacy-pods", "namespace": "default"},
            "spec": {
                "exceptions": [{"policyName": "test-policy", "ruleNames": ["r1"]}],
                "match": {"resources": {"namespaces": ["default"]}}
            }
        }))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Skip);
    assert!(rules[0].message.contains("default/legacy-pods"));
    assert_eq!(response.policy_response.stats.rules_applied_count, 0);
}

#[tokio::test]
async fn test_pod_security_baseline_fail() {
    let policy = pod_policy(
        "baseline",
        json!({"podSecurity": {"level": "baseline", "version": "latest"}}),
    );
    let resource = json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "p", "namespace": "default"},
        "spec": {"hostNetwork": true, "containers": [{"name": "app"}]}
    });
    let response = Evaluation::new(policy, resource).run().await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules[0].status, RuleStatus::Fail);
    assert!(rules[0].message.contains("PodSecurity \"baseline:latest\""));
    let checks = rules[0].pod_security_checks.as_ref().unwrap();
    assert!(checks.checks.iter().any(|c| !c.allowed));
}

#[tokio::test]
async fn test_pod_security_pass() {
    let policy = pod_policy("baseline", json!({"podSecurity": {"level": "baseline"}}));
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules[0].status, RuleStatus::Pass);
    assert!(rules[0].pod_security_checks.is_some());
}

#[tokio::test]
async fn test_pod_security_invalid_version_errors() {
    let policy = pod_policy(
        "baseline",
        json!({"podSecurity": {"level": "baseline", "version": "not-a-version"}}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules[0].status, RuleStatus::Error);
    assert_eq!(response.policy_response.stats.rules_error_count, 1);
}

#[tokio::test]
async fn test_message_substitution() {
    let policy = pod_policy(
        "r1",
        json!({
            "message": "pod {{request.object.metadata.name}} needs an app label",
            "pattern": {"metadata": {"labels": {"app": "?*"}}}
        }),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let message = &response.policy_response.rules[0].message;
    assert!(
        message.contains("pod nginx needs an app label"),
        "unexpected message: {}",
        message
    );
}

#[tokio::test]
async fn test_unresolvable_message_falls_back() {
    let policy = pod_policy(
        "r1",
        json!({
            "message": "value {{request.object.missing.field}} broken",
            "pattern": {"metadata": {"labels": {"app": "?*"}}}
        }),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    // render errors never change the outcome
    let rule = &response.policy_response.rules[0];
    assert_eq!(rule.status, RuleStatus::Fail);
    assert!(rule.message.contains("variables substitution error"));
}

#[tokio::test]
async fn test_excluded_username_bypasses_matching() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let cfg: policy_engine::Configuration = serde_json::from_value(json!({
        "excludeUsernames": ["system:serviceaccount:kube-system:*"]
    }))
    .unwrap();

    // the pod would fail the rule, but the request user is excluded
    let response = Evaluation::new(policy.clone(), pod_with_labels(json!({})))
        .username("system:serviceaccount:kube-system:replicaset-controller")
        .configuration(cfg.clone())
        .run()
        .await;
    assert!(response.policy_response.rules.is_empty());

    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .username("alice")
        .configuration(cfg)
        .run()
        .await;
    assert_eq!(response.policy_response.rules[0].status, RuleStatus::Fail);
}

#[tokio::test]
async fn test_cancellation_reports_error_and_stops() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let response = Evaluation::new(policy, pod_with_labels(json!({"app": "web"})))
        .cancelled()
        .run()
        .await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Error);
    assert_eq!(rules[0].message, "context cancelled");
    assert_eq!(response.policy_response.stats.rules_error_count, 1);
}

#[tokio::test]
async fn test_response_identity_and_action() {
    let mut policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    policy["spec"]["validationFailureAction"] = json!("enforce");

    let response = Evaluation::new(policy, pod_with_labels(json!({"app": "web"})))
        .run()
        .await;

    let pr = &response.policy_response;
    assert_eq!(pr.policy.name, "test-policy");
    assert_eq!(pr.resource.kind, "Pod");
    assert_eq!(pr.resource.name, "nginx");
    assert_eq!(pr.resource.namespace, "default");
    assert_eq!(
        serde_json::to_value(pr.validation_failure_action).unwrap(),
        json!("enforce")
    );
    assert!(response.is_successful());
}
