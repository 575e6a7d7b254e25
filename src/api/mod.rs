//! Policy, exception, and response types.

pub mod exception;
pub mod policy;
pub mod response;

pub use exception::{Exception, PolicyException, PolicyExceptionSpec};
pub use policy::{
    AdmissionInfo, AnyAllConditions, ApplyRulesType, ClusterPolicy, Condition, ConditionOperator,
    ContextEntry, Deny, ForEachValidation, Generation, MatchResources, PodSecurity,
    PodSecurityLevel, PodSecurityStandard, PolicySpec, ResourceDescription, Rule, Subject,
    Validation, ValidationFailureAction, ValidationFailureActionOverride,
};
pub use response::{
    EngineResponse, ExecutionStats, PodSecurityChecks, PolicyResponse, PolicyStats, RuleResponse,
    RuleStatus, RuleType,
};
