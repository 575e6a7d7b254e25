//! Generate-rule filtering.
//!
//! A matching-only pass over a policy's generate rules: it reports which
//! rules apply to the resource of an update request without executing any
//! generation. The structure mirrors validation, restricted to match,
//! exclude, exceptions, context, and preconditions.

use std::time::Instant;

use jiff::Timestamp;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::policy::Rule;
use crate::api::response::{
    EngineResponse, ExecutionStats, PolicyRef, ResourceSpec, RuleResponse, RuleStatus, RuleType,
};
use crate::config::Configuration;
use crate::engine::autogen::compute_rules;
use crate::engine::context::EvalContext;
use crate::engine::error::EngineError;
use crate::engine::exceptions::{exception_rule_response, find_matched_exception};
use crate::engine::loader::{load_context, ContextLoader};
use crate::engine::match_filter::{matches_resource_description, MatchInput};
use crate::engine::operators::check_preconditions;
use crate::engine::policy_context::PolicyContext;
use crate::engine::resource;

/// A pending generate request naming its originating policy as a
/// `namespace/name` key
#[derive(Clone, Debug, Default)]
pub struct UpdateRequest {
    pub policy: String,
}

/// Report which generate rules of the policy apply to the resource in the
/// policy context. No resources are created or patched.
pub async fn filter_generate_rules(
    token: &CancellationToken,
    loader: &dyn ContextLoader,
    policy_ctx: &PolicyContext,
    jctx: &mut EvalContext,
    cfg: &Configuration,
    update_request: &UpdateRequest,
) -> EngineResponse {
    let start = Instant::now();
    let started_at = Timestamp::now();

    let (policy_namespace, policy_name) = split_policy_key(&update_request.policy);
    let new_resource = policy_ctx.new_resource();
    let mut resp = EngineResponse {
        patched_resource: new_resource.clone(),
        namespace_labels: policy_ctx.namespace_labels().clone(),
        ..Default::default()
    };
    resp.policy_response.policy = PolicyRef {
        name: policy_name.to_string(),
        namespace: policy_namespace.to_string(),
    };
    resp.policy_response.resource = ResourceSpec {
        api_version: resource::api_version(new_resource).to_string(),
        kind: resource::kind(new_resource).to_string(),
        namespace: resource::namespace(new_resource).to_string(),
        name: resource::name(new_resource).to_string(),
    };

    let kind = resource::kind(new_resource);
    let namespace = resource::namespace(new_resource);
    let name = resource::name(new_resource);
    if cfg.is_excluded(kind, namespace, name) {
        info!(kind, namespace, name, "resource excluded");
        finalize(&mut resp, start, &started_at);
        return resp;
    }

    jctx.checkpoint();
    for rule in compute_rules(policy_ctx.policy()) {
        if token.is_cancelled() {
            let rule_response = RuleResponse::new(
                &rule.name,
                RuleType::Generation,
                "context cancelled",
                RuleStatus::Error,
            );
            push_rule_response(&mut resp, rule_response, Instant::now());
            break;
        }
        if !rule.has_generate() {
            continue;
        }
        jctx.reset();
        let rule_start = Instant::now();
        if let Some(rule_response) =
            filter_rule(token, loader, &rule, policy_ctx, jctx, cfg).await
        {
            push_rule_response(&mut resp, rule_response, rule_start);
        }
    }
    jctx.restore();

    finalize(&mut resp, start, &started_at);
    resp
}

/// Evaluate one generate rule: match/exclude, exception, context, and
/// preconditions. Returns no response when the rule simply does not match.
async fn filter_rule(
    token: &CancellationToken,
    loader: &dyn ContextLoader,
    rule: &Rule,
    policy_ctx: &PolicyContext,
    jctx: &mut EvalContext,
    cfg: &Configuration,
) -> Option<RuleResponse> {
    let username = policy_ctx.admission_info().username();
    if cfg.is_excluded_username(username) {
        debug!(rule = %rule.name, username, "request user is excluded from policy matching");
        return None;
    }
    let exclude_group_roles = if policy_ctx.exclude_group_roles().is_empty() {
        &cfg.exclude_group_roles
    } else {
        policy_ctx.exclude_group_roles()
    };
    let input = MatchInput {
        resource: policy_ctx.new_resource(),
        admission_info: policy_ctx.admission_info(),
        exclude_group_roles,
        namespace_labels: policy_ctx.namespace_labels(),
        sub_resource: policy_ctx.sub_resource(),
    };
    if matches_resource_description(&input, &rule.match_resources, &rule.exclude_resources)
        .is_err()
    {
        debug!(rule = %rule.name, "resource does not match generate rule");
        return None;
    }

    if let Some(exception) = find_matched_exception(policy_ctx, rule) {
        return Some(exception_rule_response(rule, RuleType::Generation, exception));
    }

    if let Err(e) = load_context(token, loader, &rule.context, jctx).await {
        warn!(rule = %rule.name, error = %e, "failed to load context");
        return Some(error_response(rule, "failed to load context", &e));
    }
    match check_preconditions(jctx, rule.preconditions.as_ref()) {
        Err(e) => {
            return Some(error_response(rule, "failed to evaluate preconditions", &e));
        }
        Ok(false) => {
            debug!(rule = %rule.name, "preconditions not met");
            return None;
        }
        Ok(true) => {}
    }

    Some(RuleResponse::new(
        &rule.name,
        RuleType::Generation,
        format!("generate rule '{}' matched", rule.name),
        RuleStatus::Pass,
    ))
}

fn error_response(rule: &Rule, message: &str, error: &EngineError) -> RuleResponse {
    RuleResponse::new(
        &rule.name,
        RuleType::Generation,
        format!("{}: {}", message, error),
        RuleStatus::Error,
    )
}

fn push_rule_response(resp: &mut EngineResponse, mut rule_response: RuleResponse, start: Instant) {
    rule_response.execution_stats = ExecutionStats {
        processing_time: start.elapsed(),
        timestamp: Timestamp::now().as_second(),
    };
    match rule_response.status {
        RuleStatus::Pass | RuleStatus::Fail => {
            resp.policy_response.stats.rules_applied_count += 1;
        }
        RuleStatus::Error => {
            resp.policy_response.stats.rules_error_count += 1;
        }
        RuleStatus::Warn | RuleStatus::Skip => {}
    }
    resp.policy_response.rules.push(rule_response);
}

fn finalize(resp: &mut EngineResponse, start: Instant, started_at: &Timestamp) {
    resp.policy_response.stats.execution_stats = ExecutionStats {
        processing_time: start.elapsed(),
        timestamp: started_at.as_second(),
    };
}

/// Split a `namespace/name` policy key; a bare name is cluster-scoped
fn split_policy_key(key: &str) -> (&str, &str) {
    match key.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("", key),
    }
}
