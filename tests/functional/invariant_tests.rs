//! Structural invariants of the engine: checkpoint balance, ordering,
//! counters, and idempotence.

use policy_engine::engine::pattern::match_pattern;
use policy_engine::EvalContext;
use proptest::prelude::*;
use serde_json::json;

use crate::{pod_policy, pod_with_labels, Evaluation};

#[tokio::test]
async fn test_checkpoint_depth_unchanged_by_evaluation() {
    let policy = pod_policy(
        "r1",
        json!({"foreach": [{
            "list": "request.object.spec.containers",
            "pattern": {"image": "?*"}
        }]}),
    );
    let mut jctx = EvalContext::new();
    jctx.checkpoint();
    let depth_before = jctx.depth();

    Evaluation::new(policy, pod_with_labels(json!({"app": "web"})))
        .run_with_context(&mut jctx)
        .await;

    assert_eq!(jctx.depth(), depth_before);
}

#[tokio::test]
async fn test_evaluation_leaves_no_bindings_behind() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let mut jctx = EvalContext::new();
    jctx.add("caller", json!("binding"));

    Evaluation::new(policy, pod_with_labels(json!({"app": "web"})))
        .run_with_context(&mut jctx)
        .await;

    // the request document was bound inside the evaluation's checkpoint
    assert!(jctx.query("request.object").is_err());
    assert_eq!(jctx.query("caller").unwrap(), json!("binding"));
}

#[tokio::test]
async fn test_rule_responses_preserve_rule_order() {
    let rule = |name: &str, pattern: serde_json::Value| {
        json!({
            "name": name,
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": {"pattern": pattern}
        })
    };
    let policy = json!({
        "metadata": {
            "name": "ordered",
            "annotations": {"pod-policies.kyverno.io/autogen-controllers": "none"}
        },
        "spec": {"rules": [
            rule("a", json!({"kind": "Pod"})),
            rule("b", json!({"metadata": {"labels": {"missing": "?*"}}})),
            rule("c", json!({"kind": "Pod"}))
        ]}
    });
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let names: Vec<&str> = response
        .policy_response
        .rules
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_counters_match_statuses() {
    let rule = |name: &str, payload: serde_json::Value| {
        json!({
            "name": name,
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": payload
        })
    };
    let policy = json!({
        "metadata": {
            "name": "counters",
            "annotations": {"pod-policies.kyverno.io/autogen-controllers": "none"}
        },
        "spec": {"rules": [
            rule("passes", json!({"pattern": {"kind": "Pod"}})),
            rule("fails", json!({"pattern": {"metadata": {"labels": {"x": "?*"}}}})),
            rule("errors", json!({"podSecurity": {"level": "baseline", "version": "bogus"}}))
        ]}
    });
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    let stats = &response.policy_response.stats;
    assert_eq!(stats.rules_applied_count, 2);
    assert_eq!(stats.rules_error_count, 1);
    assert_eq!(response.policy_response.rules.len(), 3);
    assert!(stats.rules_applied_count + stats.rules_error_count <= 3);
}

#[tokio::test]
async fn test_evaluation_is_idempotent() {
    let policy = pod_policy(
        "r1",
        json!({"pattern": {"metadata": {"labels": {"app": "?*"}}}}),
    );
    let evaluation = Evaluation::new(policy, pod_with_labels(json!({})));
    let first = evaluation.run().await;
    let second = evaluation.run().await;

    let summary = |r: &policy_engine::EngineResponse| {
        r.policy_response
            .rules
            .iter()
            .map(|rule| (rule.name.clone(), rule.status, rule.message.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(summary(&first), summary(&second));
}

#[tokio::test]
async fn test_rule_with_no_payload_is_silently_skipped() {
    let policy = json!({
        "metadata": {"name": "empty-payload"},
        "spec": {"rules": [{
            "name": "no-op",
            "match": {"resources": {"kinds": ["Pod"]}},
            "validate": {"message": "nothing to do"}
        }]}
    });
    let response = Evaluation::new(policy, pod_with_labels(json!({})))
        .run()
        .await;

    assert!(response.policy_response.rules.is_empty());
}

proptest! {
    #[test]
    fn prop_checkpoint_restore_balances(names in proptest::collection::vec("[a-z]{1,8}", 1..20)) {
        let mut ctx = EvalContext::new();
        ctx.checkpoint();
        for name in &names {
            ctx.add(name.clone(), json!(1));
        }
        ctx.restore();
        prop_assert_eq!(ctx.depth(), 0);
        for name in &names {
            prop_assert!(ctx.query(name).is_err());
        }
    }

    #[test]
    fn prop_matching_survives_unrelated_fields(label in "[a-z]{1,12}", extra in "[a-z]{1,12}") {
        let pattern = json!({"metadata": {"labels": {"app": "?*"}}});
        let resource = json!({"metadata": {"labels": {"app": label, "unrelated": extra}}});
        prop_assert!(match_pattern(&resource, &pattern).is_ok());
    }

    #[test]
    fn prop_numeric_operators_consistent(n in 0i64..1_000_000) {
        let resource = json!({"spec": {"replicas": n}});
        let ge_pattern = format!(">={}", n);
        let le_pattern = format!("<={}", n);
        let ne_pattern = format!("!={}", n + 1);
        let ge_query = json!({"spec": {"replicas": ge_pattern}});
        let le_query = json!({"spec": {"replicas": le_pattern}});
        let ne_query = json!({"spec": {"replicas": ne_pattern}});
        prop_assert!(match_pattern(&resource, &ge_query).is_ok());
        prop_assert!(match_pattern(&resource, &le_query).is_ok());
        prop_assert!(match_pattern(&resource, &ne_query).is_ok());
    }
}
