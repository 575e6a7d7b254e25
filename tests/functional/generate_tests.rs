//! The read-only generate-rule filter.

use policy_engine::{
    filter_generate_rules, Configuration, EvalContext, NoExternalLoader, PolicyContext,
    RuleStatus, RuleType, UpdateRequest,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::parse_policy;

fn generate_policy() -> Value {
    json!({
        "metadata": {"name": "add-network-policy"},
        "spec": {"rules": [{
            "name": "default-deny",
            "match": {"resources": {"kinds": ["Namespace"]}},
            "generate": {
                "apiVersion": "networking.k8s.io/v1",
                "kind": "NetworkPolicy",
                "name": "default-deny",
                "namespace": "{{request.object.metadata.name}}",
                "data": {"spec": {"podSelector": {}}}
            }
        }]}
    })
}

fn namespace_resource(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {"name": name}
    })
}

async fn run_filter(
    ctx: &PolicyContext,
    cfg: &Configuration,
) -> policy_engine::EngineResponse {
    let token = CancellationToken::new();
    let mut jctx = EvalContext::new();
    let request = UpdateRequest {
        policy: "add-network-policy".to_string(),
    };
    filter_generate_rules(&token, &NoExternalLoader, ctx, &mut jctx, cfg, &request).await
}

#[tokio::test]
async fn test_matching_generate_rule_reported() {
    let ctx = PolicyContext::new(parse_policy(generate_policy()), namespace_resource("team-a"));
    let response = run_filter(&ctx, &Configuration::with_defaults()).await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "default-deny");
    assert_eq!(rules[0].rule_type, RuleType::Generation);
    assert_eq!(rules[0].status, RuleStatus::Pass);
    assert_eq!(response.policy_response.policy.name, "add-network-policy");
    assert_eq!(response.policy_response.resource.kind, "Namespace");
}

#[tokio::test]
async fn test_non_matching_resource_reports_nothing() {
    let pod = json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "nginx", "namespace": "default"}
    });
    let ctx = PolicyContext::new(parse_policy(generate_policy()), pod);
    let response = run_filter(&ctx, &Configuration::with_defaults()).await;

    assert!(response.policy_response.rules.is_empty());
}

#[tokio::test]
async fn test_configured_filters_exclude_resource() {
    let cfg: Configuration = serde_json::from_value(json!({
        "filters": [{"kind": "Namespace", "name": "kube-*"}]
    }))
    .unwrap();
    let ctx = PolicyContext::new(
        parse_policy(generate_policy()),
        namespace_resource("kube-system"),
    );
    let response = run_filter(&ctx, &cfg).await;

    assert!(response.policy_response.rules.is_empty());
}

#[tokio::test]
async fn test_excluded_username_bypasses_filter() {
    use k8s_openapi::api::authentication::v1::UserInfo;
    use policy_engine::api::policy::AdmissionInfo;

    let cfg: Configuration = serde_json::from_value(json!({
        "excludeUsernames": ["system:serviceaccount:kube-system:*"]
    }))
    .unwrap();
    let info = AdmissionInfo {
        admission_user_info: UserInfo {
            username: Some("system:serviceaccount:kube-system:generate-controller".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let ctx = PolicyContext::new(parse_policy(generate_policy()), namespace_resource("team-a"))
        .with_admission_info(info);
    let response = run_filter(&ctx, &cfg).await;

    assert!(response.policy_response.rules.is_empty());
}

#[tokio::test]
async fn test_exception_skips_generate_rule() {
    let exception = serde_json::from_value(json!({
        "metadata": {"name": "skip-team-a", "namespace": "default"},
        "spec": {
            "exceptions": [{"policyName": "add-network-policy", "ruleNames": ["default-deny"]}],
            "match": {"resources": {"names": ["team-a"]}}
        }
    }))
    .unwrap();
    let ctx = PolicyContext::new(parse_policy(generate_policy()), namespace_resource("team-a"))
        .with_exceptions(vec![exception]);
    let response = run_filter(&ctx, &Configuration::with_defaults()).await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].status, RuleStatus::Skip);
}

#[tokio::test]
async fn test_validation_rules_ignored_by_filter() {
    let policy = json!({
        "metadata": {"name": "add-network-policy"},
        "spec": {"rules": [
            {
                "name": "check-label",
                "match": {"resources": {"kinds": ["Namespace"]}},
                "validate": {"pattern": {"metadata": {"labels": {"team": "?*"}}}}
            },
            {
                "name": "default-deny",
                "match": {"resources": {"kinds": ["Namespace"]}},
                "generate": {
                    "kind": "NetworkPolicy",
                    "name": "default-deny",
                    "data": {}
                }
            }
        ]}
    });
    let ctx = PolicyContext::new(parse_policy(policy), namespace_resource("team-a"));
    let response = run_filter(&ctx, &Configuration::with_defaults()).await;

    let rules = &response.policy_response.rules;
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "default-deny");
}
