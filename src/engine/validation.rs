//! Validation rule evaluation.
//!
//! The policy driver expands the policy's rules, filters each through
//! match/exclude and exceptions, and hands matched rules to the rule
//! validator: load context, check preconditions, then dispatch to the
//! deny / pattern / pod-security / foreach payload. Rule outcomes are
//! accumulated into the engine response with applied/error counters.

use std::time::Instant;

use jiff::Timestamp;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::policy::{
    AnyAllConditions, ApplyRulesType, ContextEntry, Deny, ForEachValidation, PodSecurity, Rule,
};
use crate::api::response::{
    EngineResponse, ExecutionStats, PodSecurityChecks, PolicyRef, ResourceSpec, RuleResponse,
    RuleStatus, RuleType,
};
use crate::config::Configuration;
use crate::engine::autogen::compute_rules;
use crate::engine::context::EvalContext;
use crate::engine::error::{EngineError, Result};
use crate::engine::exceptions::{exception_rule_response, find_matched_exception};
use crate::engine::loader::{load_context, ContextLoader};
use crate::engine::match_filter::{matches_resource_description, MatchInput};
use crate::engine::operators::{check_preconditions, evaluate_conditions, substitute_conditions};
use crate::engine::pattern::match_pattern;
use crate::engine::podsecurity::{evaluate_pod, extract_pod, format_checks, parse_version};
use crate::engine::policy_context::PolicyContext;
use crate::engine::resource;
use crate::engine::substitution::substitute_all;

/// Apply the validation rules of a policy to the resource in the policy
/// context.
///
/// The evaluation context is checkpointed on entry and restored before
/// returning, whatever the outcome. Cancellation is honored between
/// rules; the current rule reports an error and the accumulated response
/// is returned.
pub async fn validate(
    token: &CancellationToken,
    loader: &dyn ContextLoader,
    policy_ctx: &PolicyContext,
    jctx: &mut EvalContext,
    cfg: &Configuration,
) -> EngineResponse {
    let start = Instant::now();
    let started_at = Timestamp::now();
    debug!(policy = %policy_ctx.policy().name(), "start validate policy processing");

    jctx.checkpoint();
    let mut resp = evaluate_policy(token, loader, policy_ctx, jctx, cfg).await;
    jctx.restore();

    build_response(policy_ctx, &mut resp, start, &started_at);
    debug!(
        policy = %policy_ctx.policy().name(),
        rules_applied = resp.policy_response.stats.rules_applied_count,
        "finished policy processing"
    );
    resp
}

async fn evaluate_policy(
    token: &CancellationToken,
    loader: &dyn ContextLoader,
    policy_ctx: &PolicyContext,
    jctx: &mut EvalContext,
    cfg: &Configuration,
) -> EngineResponse {
    let mut resp = EngineResponse::default();
    let policy = policy_ctx.policy();

    // namespaced policies never evaluate foreign-namespace resources
    if policy.is_namespaced() {
        let policy_ns = policy.namespace();
        let new_resource = policy_ctx.new_resource();
        if !resource::is_empty(new_resource) && resource::namespace(new_resource) != policy_ns {
            return resp;
        }
        let old_resource = policy_ctx.old_resource();
        if !resource::is_empty(old_resource) && resource::namespace(old_resource) != policy_ns {
            return resp;
        }
    }

    if let Err(e) = seed_context(policy_ctx, jctx) {
        warn!(error = %e, "failed to seed the evaluation context");
    }

    let rules = compute_rules(policy);
    let apply_rules = policy.spec.apply_rules;

    for rule in &rules {
        if token.is_cancelled() {
            let rule_response = RuleResponse::new(
                &rule.name,
                RuleType::Validation,
                "context cancelled",
                RuleStatus::Error,
            );
            add_rule_response(&mut resp, rule_response, Instant::now(), unix_now());
            break;
        }
        if !rule.has_validate() {
            continue;
        }

        jctx.reset();
        let rule_start = Instant::now();
        let rule_timestamp = unix_now();

        if !matches(rule, policy_ctx, cfg) {
            continue;
        }

        let rule_response = match find_matched_exception(policy_ctx, rule) {
            Some(exception) => Some(exception_rule_response(rule, RuleType::Validation, exception)),
            None => {
                jctx.reset();
                let mut validator = Validator::new(rule, policy_ctx.clone(), loader);
                validator.validate(token, jctx).await
            }
        };

        if let Some(rule_response) = rule_response {
            add_rule_response(&mut resp, rule_response, rule_start, rule_timestamp);
            if apply_rules == ApplyRulesType::One
                && resp.policy_response.stats.rules_applied_count > 0
            {
                break;
            }
        }
    }

    resp
}

/// Bind the request documents into the evaluation context
fn seed_context(policy_ctx: &PolicyContext, jctx: &mut EvalContext) -> Result<()> {
    if !resource::is_empty(policy_ctx.new_resource()) {
        jctx.add_resource(policy_ctx.new_resource().clone());
    }
    if !resource::is_empty(policy_ctx.old_resource()) {
        jctx.add_old_resource(policy_ctx.old_resource().clone());
    }
    jctx.add_admission_info(policy_ctx.admission_info())?;
    jctx.add_namespace_labels(policy_ctx.namespace_labels())?;
    Ok(())
}

/// Check the rule's match and exclude blocks against the new resource,
/// falling back to the old resource so delete requests still match.
/// Requests from configured excluded usernames never match.
fn matches(rule: &Rule, policy_ctx: &PolicyContext, cfg: &Configuration) -> bool {
    let username = policy_ctx.admission_info().username();
    if cfg.is_excluded_username(username) {
        debug!(rule = %rule.name, username, "request user is excluded from policy matching");
        return false;
    }
    let exclude_group_roles = if policy_ctx.exclude_group_roles().is_empty() {
        &cfg.exclude_group_roles
    } else {
        policy_ctx.exclude_group_roles()
    };
    let check = |resource: &Value| {
        let input = MatchInput {
            resource,
            admission_info: policy_ctx.admission_info(),
            exclude_group_roles,
            namespace_labels: policy_ctx.namespace_labels(),
            sub_resource: policy_ctx.sub_resource(),
        };
        matches_resource_description(&input, &rule.match_resources, &rule.exclude_resources)
    };

    if check(policy_ctx.new_resource()).is_ok() {
        return true;
    }
    if !resource::is_empty(policy_ctx.old_resource())
        && check(policy_ctx.old_resource()).is_ok()
    {
        return true;
    }
    debug!(rule = %rule.name, "resource does not match rule");
    false
}

fn add_rule_response(
    resp: &mut EngineResponse,
    mut rule_response: RuleResponse,
    start: Instant,
    timestamp: i64,
) {
    rule_response.execution_stats = ExecutionStats {
        processing_time: start.elapsed(),
        timestamp,
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

fn build_response(
    policy_ctx: &PolicyContext,
    resp: &mut EngineResponse,
    start: Instant,
    started_at: &Timestamp,
) {
    if resource::is_empty(&resp.patched_resource) {
        resp.patched_resource = policy_ctx.reported_resource().clone();
    }

    let policy = policy_ctx.policy();
    let policy_response = &mut resp.policy_response;
    policy_response.policy = PolicyRef {
        name: policy.name().to_string(),
        namespace: policy.namespace().to_string(),
    };
    policy_response.resource = ResourceSpec {
        api_version: resource::api_version(&resp.patched_resource).to_string(),
        kind: resource::kind(&resp.patched_resource).to_string(),
        namespace: resource::namespace(&resp.patched_resource).to_string(),
        name: resource::name(&resp.patched_resource).to_string(),
    };
    policy_response.validation_failure_action = policy.spec.validation_failure_action;
    policy_response.validation_failure_action_overrides =
        policy.spec.validation_failure_action_overrides.clone();
    policy_response.stats.execution_stats = ExecutionStats {
        processing_time: start.elapsed(),
        timestamp: started_at.as_second(),
    };
    resp.namespace_labels = policy_ctx.namespace_labels().clone();
}

fn unix_now() -> i64 {
    Timestamp::now().as_second()
}

/// Evaluates one rule (or one foreach body) against the policy context
struct Validator<'a> {
    rule: &'a Rule,
    policy_ctx: PolicyContext,
    loader: &'a dyn ContextLoader,
    contexts: &'a [ContextEntry],
    preconditions: Option<&'a AnyAllConditions>,
    pattern: Option<Value>,
    any_pattern: Option<Value>,
    deny: Option<&'a Deny>,
    pod_security: Option<&'a PodSecurity>,
    foreach: &'a [ForEachValidation],
    message: &'a str,
    nesting: usize,
}

impl<'a> Validator<'a> {
    fn new(rule: &'a Rule, policy_ctx: PolicyContext, loader: &'a dyn ContextLoader) -> Self {
        let validation = rule.validate.as_ref();
        Self {
            rule,
            policy_ctx,
            loader,
            contexts: &rule.context,
            preconditions: rule.preconditions.as_ref(),
            pattern: validation.and_then(|v| v.pattern.clone()),
            any_pattern: validation.and_then(|v| v.any_pattern.clone()),
            deny: validation.and_then(|v| v.deny.as_ref()),
            pod_security: validation.and_then(|v| v.pod_security.as_ref()),
            foreach: validation.map(|v| v.foreach.as_slice()).unwrap_or_default(),
            message: validation.map(|v| v.message.as_str()).unwrap_or_default(),
            nesting: 0,
        }
    }

    /// Validator for one foreach body, one nesting level deeper
    fn for_each(
        foreach: &'a ForEachValidation,
        rule: &'a Rule,
        policy_ctx: PolicyContext,
        loader: &'a dyn ContextLoader,
        nesting: usize,
    ) -> Self {
        Self {
            rule,
            policy_ctx,
            loader,
            contexts: &foreach.context,
            preconditions: foreach.preconditions.as_ref(),
            pattern: foreach.pattern.clone(),
            any_pattern: foreach.any_pattern.clone(),
            deny: foreach.deny.as_ref(),
            pod_security: None,
            foreach: &foreach.foreach,
            message: rule
                .validate
                .as_ref()
                .map(|v| v.message.as_str())
                .unwrap_or_default(),
            nesting,
        }
    }

    async fn validate(
        &mut self,
        token: &CancellationToken,
        jctx: &mut EvalContext,
    ) -> Option<RuleResponse> {
        if let Err(e) = load_context(token, self.loader, self.contexts, jctx).await {
            if e.is_not_found() {
                debug!(rule = %self.rule.name, error = %e, "failed to load context");
            } else {
                warn!(rule = %self.rule.name, error = %e, "failed to load context");
            }
            return Some(self.error_response("failed to load context", &e));
        }

        match check_preconditions(jctx, self.preconditions) {
            Err(e) => {
                return Some(self.error_response("failed to evaluate preconditions", &e));
            }
            Ok(false) => {
                return Some(self.rule_response("preconditions not met", RuleStatus::Skip));
            }
            Ok(true) => {}
        }

        if self.deny.is_some() {
            return Some(self.validate_deny(jctx));
        }

        if self.pattern.is_some() || self.any_pattern.is_some() {
            if let Err(e) = self.substitute_patterns(jctx) {
                return Some(self.error_response("variable substitution failed", &e));
            }
            return self.validate_patterns(jctx);
        }

        if let Some(pod_security) = self.pod_security {
            if !self.policy_ctx.is_delete_request() {
                return Some(self.validate_pod_security(pod_security));
            }
            return None;
        }

        if !self.foreach.is_empty() {
            return self.validate_foreach(token, jctx).await;
        }

        debug!(rule = %self.rule.name, "invalid validation rule: podSecurity, patterns, or deny expected");
        None
    }

    async fn validate_foreach(
        &mut self,
        token: &CancellationToken,
        jctx: &mut EvalContext,
    ) -> Option<RuleResponse> {
        let mut apply_count = 0;
        for foreach in self.foreach {
            let elements = match evaluate_list(&foreach.list, jctx) {
                Ok(elements) => elements,
                Err(e) => {
                    debug!(list = %foreach.list, error = %e, "failed to evaluate list");
                    continue;
                }
            };
            let (response, count) = self
                .validate_elements(token, jctx, foreach, elements)
                .await;
            if response.status != RuleStatus::Pass {
                return Some(response);
            }
            apply_count += count;
        }
        if apply_count == 0 {
            return Some(self.rule_response("rule skipped", RuleStatus::Skip));
        }
        Some(self.rule_response("rule passed", RuleStatus::Pass))
    }

    async fn validate_elements(
        &self,
        token: &CancellationToken,
        jctx: &mut EvalContext,
        foreach: &'a ForEachValidation,
        elements: Vec<Value>,
    ) -> (RuleResponse, usize) {
        jctx.checkpoint();
        let result = self
            .validate_elements_inner(token, jctx, foreach, &elements)
            .await;
        jctx.restore();
        result
    }

    async fn validate_elements_inner(
        &self,
        token: &CancellationToken,
        jctx: &mut EvalContext,
        foreach: &'a ForEachValidation,
        elements: &[Value],
    ) -> (RuleResponse, usize) {
        let mut apply_count = 0;

        for (index, element) in elements.iter().enumerate() {
            if element.is_null() {
                continue;
            }
            jctx.reset();

            let mut element_ctx = self.policy_ctx.clone();
            if let Err(e) = bind_element(
                &mut element_ctx,
                jctx,
                element,
                index,
                self.nesting,
                foreach.element_scope,
            ) {
                warn!(rule = %self.rule.name, error = %e, "failed to add element to context");
                return (
                    self.error_response("failed to process foreach", &e),
                    apply_count,
                );
            }

            let mut nested = Validator::for_each(
                foreach,
                self.rule,
                element_ctx,
                self.loader,
                self.nesting + 1,
            );
            let response = match Box::pin(nested.validate(token, jctx)).await {
                Some(response) => response,
                None => {
                    debug!(rule = %self.rule.name, "skip element due to empty result");
                    continue;
                }
            };

            match response.status {
                RuleStatus::Skip => {
                    debug!(rule = %self.rule.name, reason = %response.message, "skip element");
                }
                RuleStatus::Pass => apply_count += 1,
                RuleStatus::Error => {
                    // a non-terminal element error is dropped; only the last
                    // element's error is reported
                    if index < elements.len() - 1 {
                        warn!(
                            rule = %self.rule.name,
                            element = index,
                            message = %response.message,
                            "dropping foreach element error"
                        );
                        continue;
                    }
                    return (
                        self.rule_response(
                            format!("validation failure: {}", response.message),
                            RuleStatus::Error,
                        ),
                        apply_count,
                    );
                }
                RuleStatus::Fail | RuleStatus::Warn => {
                    return (
                        self.rule_response(
                            format!("validation failure: {}", response.message),
                            RuleStatus::Fail,
                        ),
                        apply_count,
                    );
                }
            }
        }

        (self.rule_response("", RuleStatus::Pass), apply_count)
    }

    fn validate_deny(&self, jctx: &EvalContext) -> RuleResponse {
        let conditions = self
            .deny
            .and_then(|d| d.conditions.clone())
            .unwrap_or_default();
        let substituted = match substitute_conditions(jctx, &conditions) {
            Ok(conditions) => conditions,
            Err(e @ EngineError::InvalidCondition(_)) => {
                return self.error_response("invalid deny conditions", &e);
            }
            Err(e) => {
                return self.error_response(
                    "failed to substitute variables in deny conditions",
                    &e,
                );
            }
        };

        let denied = evaluate_conditions(&substituted);
        let message = self.deny_message(jctx, denied);
        if denied {
            self.rule_response(message, RuleStatus::Fail)
        } else {
            self.rule_response(message, RuleStatus::Pass)
        }
    }

    fn deny_message(&self, jctx: &EvalContext, denied: bool) -> String {
        if !denied {
            return format!("validation rule '{}' passed.", self.rule.name);
        }
        if self.message.is_empty() {
            return format!("validation error: rule {} failed", self.rule.name);
        }
        match substitute_all(jctx, &Value::String(self.message.to_string())) {
            Ok(Value::String(message)) => message,
            Ok(_) => {
                "the produced message didn't resolve to a string, check your policy definition."
                    .to_string()
            }
            Err(e) => {
                debug!(rule = %self.rule.name, error = %e, "failed to substitute variables in message");
                self.message.to_string()
            }
        }
    }

    fn validate_pod_security(&self, pod_security: &PodSecurity) -> RuleResponse {
        let version = match parse_version(pod_security) {
            Ok(version) => version,
            Err(e) => {
                return self.error_response("failed to parse pod security api version", &e);
            }
        };
        let pod = match extract_pod(self.policy_ctx.new_resource()) {
            Ok(pod) => pod,
            Err(e) => {
                return self.error_response("failed to extract the pod spec", &e);
            }
        };

        let (allowed, checks) = evaluate_pod(pod_security, &pod);
        let payload = PodSecurityChecks {
            level: pod_security.level,
            version: version.clone(),
            checks: checks.clone(),
        };
        if allowed {
            let message = format!("validation rule '{}' passed.", self.rule.name);
            self.rule_response(message, RuleStatus::Pass)
                .with_pod_security_checks(payload)
        } else {
            let message = format!(
                "validation rule '{}' failed. It violates PodSecurity \"{}:{}\": {}",
                self.rule.name,
                pod_security.level,
                version,
                format_checks(&checks)
            );
            self.rule_response(message, RuleStatus::Fail)
                .with_pod_security_checks(payload)
        }
    }

    fn substitute_patterns(&mut self, jctx: &EvalContext) -> Result<()> {
        if let Some(pattern) = &self.pattern {
            self.pattern = Some(substitute_all(jctx, pattern)?);
        }
        if let Some(any_pattern) = &self.any_pattern {
            self.any_pattern = Some(substitute_all(jctx, any_pattern)?);
        }
        Ok(())
    }

    /// Validate the pattern payloads against the resource under
    /// evaluation: the scoped foreach element when one is bound, the new
    /// resource otherwise. Pattern rules never run on delete requests.
    fn validate_patterns(&self, jctx: &EvalContext) -> Option<RuleResponse> {
        let element = self.policy_ctx.element();
        let target = if !resource::is_empty(element) {
            element.clone()
        } else if self.policy_ctx.is_delete_request() {
            debug!(rule = %self.rule.name, "skipping validation on deleted resource");
            return None;
        } else {
            self.policy_ctx.new_resource().clone()
        };

        if let Some(pattern) = &self.pattern {
            return Some(match match_pattern(&target, pattern) {
                Ok(()) => {
                    let message = format!("validation rule '{}' passed.", self.rule.name);
                    self.rule_response(message, RuleStatus::Pass)
                }
                Err(pattern_error) => {
                    debug!(
                        rule = %self.rule.name,
                        path = %pattern_error.path,
                        error = %pattern_error,
                        "validation error"
                    );
                    if pattern_error.skip {
                        self.rule_response(pattern_error.to_string(), RuleStatus::Skip)
                    } else if pattern_error.path.is_empty() {
                        let message =
                            self.pattern_error_message(jctx, &pattern_error.message, "");
                        self.rule_response(message, RuleStatus::Error)
                    } else {
                        let message = self.pattern_error_message(
                            jctx,
                            &pattern_error.message,
                            &pattern_error.path,
                        );
                        self.rule_response(message, RuleStatus::Fail)
                    }
                }
            });
        }

        if let Some(any_pattern) = &self.any_pattern {
            let patterns = match any_pattern.as_array() {
                Some(patterns) => patterns,
                None => {
                    return Some(self.rule_response(
                        "failed to deserialize anyPattern, expected type array",
                        RuleStatus::Error,
                    ));
                }
            };

            let mut skipped = Vec::new();
            let mut failed = Vec::new();
            for (index, pattern) in patterns.iter().enumerate() {
                match match_pattern(&target, pattern) {
                    Ok(()) => {
                        let message = format!(
                            "validation rule '{}' anyPattern[{}] passed.",
                            self.rule.name, index
                        );
                        return Some(self.rule_response(message, RuleStatus::Pass));
                    }
                    Err(pattern_error) => {
                        debug!(
                            rule = %self.rule.name,
                            index,
                            path = %pattern_error.path,
                            "anyPattern entry did not match"
                        );
                        if pattern_error.skip {
                            skipped.push(format!(
                                "rule {}[{}] skipped: {}",
                                self.rule.name, index, pattern_error
                            ));
                        } else if pattern_error.path.is_empty() {
                            failed.push(format!(
                                "rule {}[{}] failed: {}",
                                self.rule.name, index, pattern_error.message
                            ));
                        } else {
                            failed.push(format!(
                                "rule {}[{}] failed at path {}",
                                self.rule.name, index, pattern_error.path
                            ));
                        }
                    }
                }
            }

            if !skipped.is_empty() && failed.is_empty() {
                return Some(self.rule_response(skipped.join(" "), RuleStatus::Skip));
            }
            if !failed.is_empty() {
                let message = self.any_pattern_error_message(&failed);
                return Some(self.rule_response(message, RuleStatus::Fail));
            }
        }

        Some(self.rule_response(self.message, RuleStatus::Pass))
    }

    /// Failure message for a pattern mismatch, templated by the rule
    /// message when one is set; render errors fall back to a generic form
    fn pattern_error_message(&self, jctx: &EvalContext, error: &str, path: &str) -> String {
        if self.message.is_empty() {
            if !path.is_empty() {
                return format!(
                    "validation error: rule {} failed at path {}",
                    self.rule.name, path
                );
            }
            return format!(
                "validation error: rule {} execution error: {}",
                self.rule.name, error
            );
        }
        match substitute_all(jctx, &Value::String(self.message.to_string())) {
            Ok(rendered) => {
                let mut message = match rendered {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                if !message.ends_with('.') {
                    message.push('.');
                }
                if !path.is_empty() {
                    format!(
                        "validation error: {} rule {} failed at path {}",
                        message, self.rule.name, path
                    )
                } else {
                    format!(
                        "validation error: {} rule {} execution error: {}",
                        message, self.rule.name, error
                    )
                }
            }
            Err(e) => {
                debug!(rule = %self.rule.name, error = %e, "failed to substitute variables in message");
                format!(
                    "validation error: variables substitution error in rule {} execution error: {}",
                    self.rule.name, error
                )
            }
        }
    }

    fn any_pattern_error_message(&self, failures: &[String]) -> String {
        let errors = failures.join(" ");
        if self.message.is_empty() {
            return format!("validation error: {}", errors);
        }
        if self.message.ends_with('.') {
            format!("validation error: {} {}", self.message, errors)
        } else {
            format!("validation error: {}. {}", self.message, errors)
        }
    }

    fn rule_response(&self, message: impl Into<String>, status: RuleStatus) -> RuleResponse {
        RuleResponse::new(&self.rule.name, RuleType::Validation, message, status)
    }

    fn error_response(&self, message: &str, error: &EngineError) -> RuleResponse {
        RuleResponse::new(
            &self.rule.name,
            RuleType::Validation,
            format!("{}: {}", message, error),
            RuleStatus::Error,
        )
    }
}

/// Evaluate a foreach list expression into its elements
fn evaluate_list(expression: &str, jctx: &EvalContext) -> Result<Vec<Value>> {
    let trimmed = expression.trim();
    let trimmed = trimmed
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(trimmed);
    let value = jctx.query(trimmed)?;
    match value {
        Value::Array(elements) => Ok(elements),
        _ => Err(EngineError::NotAList(expression.to_string())),
    }
}

/// Bind a foreach element into both contexts. An element is scoped (bound
/// as the resource under evaluation) when it is an object, unless the
/// rule says otherwise; scoping a non-object is an error.
fn bind_element(
    policy_ctx: &mut PolicyContext,
    jctx: &mut EvalContext,
    element: &Value,
    index: usize,
    nesting: usize,
    element_scope: Option<bool>,
) -> Result<()> {
    jctx.add_element(element.clone(), index, nesting);

    let is_object = element.is_object();
    let scoped = match element_scope {
        Some(true) if !is_object => {
            return Err(EngineError::ElementScope(json_type_name(element).to_string()));
        }
        Some(explicit) => explicit,
        None => is_object,
    };
    if scoped {
        policy_ctx.set_element(element.clone());
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
