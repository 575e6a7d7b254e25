//! Policy document types.
//!
//! A policy is a named, optionally namespaced document carrying an ordered
//! list of rules. Each rule selects resources via match/exclude blocks and
//! carries at most one validation payload (pattern, anyPattern, deny,
//! podSecurity, or foreach) or a generate payload.

use std::collections::BTreeMap;

use k8s_openapi::api::authentication::v1::UserInfo;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Annotation that overrides the pod-controller list used by rule
/// auto-generation. A value of `none` disables expansion for the policy.
pub const POD_CONTROLLERS_ANNOTATION: &str = "pod-policies.kyverno.io/autogen-controllers";

/// A cluster policy: ordered rules plus spec-level evaluation options.
///
/// When `metadata.namespace` is set the policy is namespaced and only
/// applies to resources in that namespace.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPolicy {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PolicySpec,
}

impl ClusterPolicy {
    /// Policy name from metadata (empty when unset)
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    /// Policy namespace from metadata (empty when cluster-scoped)
    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("")
    }

    /// Check if the policy only applies within its own namespace
    pub fn is_namespaced(&self) -> bool {
        !self.namespace().is_empty()
    }

    /// Look up a policy annotation
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }
}

/// Policy spec: the rule list and evaluation options
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySpec {
    /// Ordered list of rules
    pub rules: Vec<Rule>,

    /// Whether a failed validation blocks admission or is only reported
    pub validation_failure_action: ValidationFailureAction,

    /// Per-namespace overrides of the failure action
    pub validation_failure_action_overrides: Vec<ValidationFailureActionOverride>,

    /// Stop after the first applied rule, or evaluate all rules
    pub apply_rules: ApplyRulesType,
}

/// Behavior when a validation rule fails
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ValidationFailureAction {
    /// Report the failure without blocking admission
    #[default]
    Audit,
    /// Block admission
    Enforce,
}

/// Per-namespace override of the validation failure action
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationFailureActionOverride {
    pub action: ValidationFailureAction,
    pub namespaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
}

/// Whether rule evaluation stops after the first applied rule
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ApplyRulesType {
    /// Evaluate every rule
    #[default]
    All,
    /// Stop after the first rule that passes or fails
    One,
}

/// A single policy rule
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,

    /// Resources and subjects this rule applies to
    #[serde(default, rename = "match")]
    pub match_resources: MatchResources,

    /// Resources and subjects carved out of the match
    #[serde(default, rename = "exclude")]
    pub exclude_resources: MatchResources,

    /// Named bindings fetched into the evaluation context before the rule runs
    #[serde(default)]
    pub context: Vec<ContextEntry>,

    /// Boolean gate evaluated after context loading; false skips the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<AnyAllConditions>,

    /// Validation payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Validation>,

    /// Generate payload (filtered, never executed by this engine)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<Generation>,
}

impl Rule {
    pub fn has_validate(&self) -> bool {
        self.validate.is_some()
    }

    pub fn has_generate(&self) -> bool {
        self.generate.is_some()
    }
}

/// Match/exclude selector block.
///
/// The legacy inline fields and the `any`/`all` filter lists are both
/// supported; an empty block matches everything.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchResources {
    /// At least one filter must match
    pub any: Vec<ResourceFilter>,
    /// Every filter must match
    pub all: Vec<ResourceFilter>,
    /// Inline resource description
    pub resources: ResourceDescription,
    /// Admission request subjects (users, groups, service accounts)
    pub subjects: Vec<Subject>,
    /// Namespaced role bindings, as `namespace:name`
    pub roles: Vec<String>,
    /// Cluster role bindings
    pub cluster_roles: Vec<String>,
}

impl MatchResources {
    /// Check if no selector of any sort is present
    pub fn is_empty(&self) -> bool {
        self.any.is_empty()
            && self.all.is_empty()
            && self.resources.is_empty()
            && self.subjects.is_empty()
            && self.roles.is_empty()
            && self.cluster_roles.is_empty()
    }
}

/// One entry of an any/all filter list
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceFilter {
    pub resources: ResourceDescription,
    pub subjects: Vec<Subject>,
    pub roles: Vec<String>,
    pub cluster_roles: Vec<String>,
}

/// Predicates on the resource under admission
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceDescription {
    /// Kinds, each `kind`, `kind/subresource`, `version/kind`,
    /// `group/version/kind`, or `group/version/kind/subresource`; `*` is any
    pub kinds: Vec<String>,

    /// Resource name glob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Resource name globs; any may match
    pub names: Vec<String>,

    /// Namespace globs
    pub namespaces: Vec<String>,

    /// Annotation key/value globs; all must match
    pub annotations: BTreeMap<String, String>,

    /// Label selector applied to the resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    /// Label selector applied to the resource's namespace labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
}

impl ResourceDescription {
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
            && self.name.is_none()
            && self.names.is_empty()
            && self.namespaces.is_empty()
            && self.annotations.is_empty()
            && self.selector.is_none()
            && self.namespace_selector.is_none()
    }
}

/// An admission request subject
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// `User`, `Group`, or `ServiceAccount`
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// User identity attached to the admission request
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionInfo {
    /// Authenticated user info from the admission request
    pub admission_user_info: UserInfo,
    /// Namespaced roles bound to the user, as `namespace:name`
    pub roles: Vec<String>,
    /// Cluster roles bound to the user
    pub cluster_roles: Vec<String>,
}

impl AdmissionInfo {
    pub fn username(&self) -> &str {
        self.admission_user_info.username.as_deref().unwrap_or("")
    }

    pub fn groups(&self) -> &[String] {
        self.admission_user_info
            .groups
            .as_deref()
            .unwrap_or_default()
    }
}

/// A named context binding resolved before rule evaluation.
/// Exactly one of the source fields should be set.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_call: Option<ApiCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_registry: Option<ImageRegistry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<VariableEntry>,
}

/// A config-map backed context entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// An API-server GET backed context entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiCall {
    pub url_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jmes_path: Option<String>,
}

/// An image-registry metadata backed context entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistry {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jmes_path: Option<String>,
}

/// An inline variable context entry, resolved without external I/O
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariableEntry {
    /// Literal value; variables inside it are substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Query applied to `value`, or to the whole context when `value` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jmes_path: Option<String>,
    /// Fallback when the query result is not found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// The validation payload of a rule
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Validation {
    /// Message reported on failure; may contain `{{ … }}` expressions
    pub message: String,

    /// Structural pattern the resource must satisfy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,

    /// Ordered alternative patterns; the first match passes the rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_pattern: Option<Value>,

    /// Deny conditions; the rule fails when they evaluate to true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deny: Option<Deny>,

    /// Pod Security Standard evaluation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_security: Option<PodSecurity>,

    /// Per-element sub-validations over a queried list
    pub foreach: Vec<ForEachValidation>,
}

/// Deny payload: a condition tree that rejects the resource when true
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deny {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<AnyAllConditions>,
}

/// A condition tree: either an explicit any/all pair, or a legacy bare
/// list (treated as all)
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum AnyAllConditions {
    AnyAll {
        #[serde(default)]
        any: Vec<Condition>,
        #[serde(default)]
        all: Vec<Condition>,
    },
    List(Vec<Condition>),
}

impl Default for AnyAllConditions {
    fn default() -> Self {
        AnyAllConditions::AnyAll {
            any: Vec::new(),
            all: Vec::new(),
        }
    }
}

/// A single boolean condition over the evaluation context
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Left operand; usually a `{{ … }}` expression
    #[serde(default)]
    pub key: Value,
    pub operator: ConditionOperator,
    /// Right operand
    #[serde(default)]
    pub value: Value,
}

/// Operators available in preconditions and deny conditions
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
    AnyIn,
    AllIn,
    AnyNotIn,
    AllNotIn,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    DurationGreaterThan,
    DurationGreaterThanOrEquals,
    DurationLessThan,
    DurationLessThanOrEquals,
}

impl Default for ConditionOperator {
    fn default() -> Self {
        ConditionOperator::Equals
    }
}

/// One element-producing block of a foreach validation
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForEachValidation {
    /// Query that must yield a JSON array
    pub list: String,

    /// Bind each element as the resource under evaluation.
    /// Defaults to true for object elements; true on a non-object is an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_scope: Option<bool>,

    /// Additional context entries loaded per element
    #[serde(default)]
    pub context: Vec<ContextEntry>,

    /// Per-element precondition gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<AnyAllConditions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_pattern: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Deny>,

    /// Nested iteration, one level deeper
    #[serde(default)]
    pub foreach: Vec<ForEachValidation>,
}

/// The generate payload of a rule. The engine only filters these rules;
/// execution belongs to the caller.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub synchronize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone: Option<CloneFrom>,
}

/// Source of a cloned generated resource
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloneFrom {
    pub namespace: String,
    pub name: String,
}

/// Pod Security Standard payload
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurity {
    pub level: PodSecurityLevel,
    /// `latest` or `v1.NN`; unset means latest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Controls exempted from the standard
    #[serde(default)]
    pub exclude: Vec<PodSecurityStandard>,
}

/// Pod Security Standard profile levels
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PodSecurityLevel {
    Privileged,
    #[default]
    Baseline,
    Restricted,
}

impl std::fmt::Display for PodSecurityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodSecurityLevel::Privileged => write!(f, "privileged"),
            PodSecurityLevel::Baseline => write!(f, "baseline"),
            PodSecurityLevel::Restricted => write!(f, "restricted"),
        }
    }
}

/// One exempted control, optionally narrowed to specific images
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityStandard {
    /// Control name, e.g. `Host Namespaces` or `Capabilities`
    pub control_name: String,
    /// Image globs the exemption applies to; empty exempts all containers
    #[serde(default)]
    pub images: Vec<String>,
}
