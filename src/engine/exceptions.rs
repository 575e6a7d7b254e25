//! Exception resolution.
//!
//! After a rule matches a resource, any policy exception naming that rule
//! gets a chance to override the outcome: the first exception whose match
//! block covers the resource turns the rule into a skip.

use tracing::{debug, error};

use crate::api::exception::PolicyException;
use crate::api::policy::{MatchResources, Rule};
use crate::api::response::{RuleResponse, RuleStatus, RuleType};
use crate::engine::match_filter::{matches_resource_description, MatchInput};
use crate::engine::policy_context::PolicyContext;

/// Find the first exception naming this rule whose match block covers the
/// resource under admission
pub(crate) fn find_matched_exception<'a>(
    ctx: &'a PolicyContext,
    rule: &Rule,
) -> Option<&'a PolicyException> {
    let input = MatchInput {
        resource: ctx.new_resource(),
        admission_info: ctx.admission_info(),
        exclude_group_roles: ctx.exclude_group_roles(),
        namespace_labels: ctx.namespace_labels(),
        sub_resource: ctx.sub_resource(),
    };
    ctx.find_exceptions(&rule.name).into_iter().find(|candidate| {
        matches_resource_description(
            &input,
            &candidate.spec.match_resources,
            &MatchResources::default(),
        )
        .is_ok()
    })
}

/// Build the rule response for a matched exception: skip, or error when
/// the exception key cannot be computed
pub(crate) fn exception_rule_response(
    rule: &Rule,
    rule_type: RuleType,
    exception: &PolicyException,
) -> RuleResponse {
    match exception.key() {
        Ok(key) => {
            debug!(rule = %rule.name, exception = %key, "rule skipped due to policy exception");
            RuleResponse::new(
                &rule.name,
                rule_type,
                format!("rule skipped due to policy exception {}", key),
                RuleStatus::Skip,
            )
        }
        Err(e) => {
            error!(rule = %rule.name, error = %e, "failed to compute policy exception key");
            RuleResponse::new(
                &rule.name,
                rule_type,
                "failed to compute policy exception key",
                RuleStatus::Error,
            )
        }
    }
}
