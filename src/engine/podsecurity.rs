//! Pod Security Standard evaluation.
//!
//! The standard is embedded as a registry of checks, each inspecting the
//! synthesized pod and reporting its offenders. `exclude` entries in the
//! rule exempt a control by name, optionally narrowed to the containers
//! whose image matches one of the listed globs.

use std::sync::LazyLock;

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wildmatch::WildMatch;

use crate::api::policy::{PodSecurity, PodSecurityLevel, PodSecurityStandard};
use crate::engine::error::{EngineError, Result};
use crate::engine::resource;

/// Outcome of a single pod security check
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityCheckResult {
    /// Stable check identifier, e.g. `host-namespaces`
    pub id: String,
    pub allowed: bool,
    /// Control name, set when the check failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_reason: Option<String>,
    /// Offending fields, set when the check failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_detail: Option<String>,
}

/// A pod-level or container-level violation found by one check
struct Offender {
    detail: String,
    /// Image of the offending container; none for pod-level violations
    image: Option<String>,
}

impl Offender {
    fn pod(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            image: None,
        }
    }

    fn container(container: &Container, detail: impl Into<String>) -> Self {
        Self {
            detail: format!("container {}: {}", container.name, detail.into()),
            image: container.image.clone(),
        }
    }
}

struct CheckDef {
    id: &'static str,
    name: &'static str,
    restricted: bool,
    run: fn(&Pod) -> Vec<Offender>,
}

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^v1\.\d+$").expect("hard-coded regex")
});

/// Validate the declared standard version, returning its canonical form
pub(crate) fn parse_version(security: &PodSecurity) -> Result<String> {
    match security.version.as_deref() {
        None | Some("latest") => Ok("latest".to_string()),
        Some(v) if VERSION_REGEX.is_match(v) => Ok(v.to_string()),
        Some(v) => Err(EngineError::PodSecurity(format!(
            "invalid pod security standard version {}",
            v
        ))),
    }
}

/// Synthesize the pod under evaluation from the admitted resource.
///
/// Workload controllers carry their pod under `spec.template`, CronJob
/// under `spec.jobTemplate.spec.template`; a Pod is taken as-is. Any
/// other kind cannot be evaluated.
pub(crate) fn extract_pod(res: &Value) -> Result<Pod> {
    let kind = resource::kind(res);
    let template = match kind {
        "Pod" => return Ok(serde_json::from_value(res.clone())?),
        "DaemonSet" | "Deployment" | "Job" | "StatefulSet" | "ReplicaSet"
        | "ReplicationController" => res.pointer("/spec/template"),
        "CronJob" => res.pointer("/spec/jobTemplate/spec/template"),
        other => {
            return Err(EngineError::PodSecurity(format!(
                "kind {} does not carry a pod spec",
                other
            )))
        }
    };
    let template = template.ok_or_else(|| {
        EngineError::PodSecurity(format!("resource of kind {} has no pod template", kind))
    })?;
    let template: k8s_openapi::api::core::v1::PodTemplateSpec =
        serde_json::from_value(template.clone())?;
    Ok(Pod {
        metadata: template.metadata.unwrap_or_default(),
        spec: template.spec,
        status: None,
    })
}

/// Run the standard against a pod.
///
/// Returns whether the pod is allowed together with the per-check
/// records. The privileged level runs no checks.
pub(crate) fn evaluate_pod(
    security: &PodSecurity,
    pod: &Pod,
) -> (bool, Vec<PodSecurityCheckResult>) {
    let include_restricted = security.level == PodSecurityLevel::Restricted;
    let mut results = Vec::new();
    let mut allowed = true;

    if security.level == PodSecurityLevel::Privileged {
        return (true, results);
    }

    for check in CHECKS.iter() {
        if check.restricted && !include_restricted {
            continue;
        }
        let offenders: Vec<Offender> = (check.run)(pod)
            .into_iter()
            .filter(|o| !is_exempt(&security.exclude, check.name, o))
            .collect();
        if offenders.is_empty() {
            results.push(PodSecurityCheckResult {
                id: check.id.to_string(),
                allowed: true,
                forbidden_reason: None,
                forbidden_detail: None,
            });
        } else {
            allowed = false;
            let detail = offenders
                .iter()
                .map(|o| o.detail.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            results.push(PodSecurityCheckResult {
                id: check.id.to_string(),
                allowed: false,
                forbidden_reason: Some(check.name.to_string()),
                forbidden_detail: Some(detail),
            });
        }
    }

    (allowed, results)
}

/// Render the failing checks for a rule failure message
pub(crate) fn format_checks(checks: &[PodSecurityCheckResult]) -> String {
    checks
        .iter()
        .filter(|c| !c.allowed)
        .map(|c| {
            format!(
                "{} ({})",
                c.forbidden_reason.as_deref().unwrap_or(&c.id),
                c.forbidden_detail.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_exempt(exclusions: &[PodSecurityStandard], control: &str, offender: &Offender) -> bool {
    exclusions.iter().any(|e| {
        if e.control_name != control {
            return false;
        }
        if e.images.is_empty() {
            return true;
        }
        match &offender.image {
            Some(image) => e.images.iter().any(|p| WildMatch::new(p).matches(image)),
            None => false,
        }
    })
}

fn spec(pod: &Pod) -> Option<&PodSpec> {
    pod.spec.as_ref()
}

/// All containers of the pod, init containers included
fn containers(pod: &Pod) -> Vec<&Container> {
    let mut out = Vec::new();
    if let Some(spec) = spec(pod) {
        out.extend(spec.containers.iter());
        if let Some(init) = &spec.init_containers {
            out.extend(init.iter());
        }
    }
    out
}

const BASELINE_CAPABILITIES: &[&str] = &[
    "AUDIT_WRITE",
    "CHOWN",
    "DAC_OVERRIDE",
    "FOWNER",
    "FSETID",
    "KILL",
    "MKNOD",
    "NET_BIND_SERVICE",
    "SETFCAP",
    "SETGID",
    "SETPCAP",
    "SETUID",
    "SYS_CHROOT",
];

const ALLOWED_SYSCTLS: &[&str] = &[
    "kernel.shm_rmid_forced",
    "net.ipv4.ip_local_port_range",
    "net.ipv4.ip_unprivileged_port_start",
    "net.ipv4.ping_group_range",
    "net.ipv4.tcp_syncookies",
];

const RESTRICTED_VOLUME_TYPES: &[&str] = &[
    "configMap",
    "csi",
    "downwardAPI",
    "emptyDir",
    "ephemeral",
    "persistentVolumeClaim",
    "projected",
    "secret",
];

static CHECKS: LazyLock<Vec<CheckDef>> = LazyLock::new(|| {
    vec![
        CheckDef {
            id: "host-namespaces",
            name: "Host Namespaces",
            restricted: false,
            run: check_host_namespaces,
        },
        CheckDef {
            id: "privileged",
            name: "Privileged Containers",
            restricted: false,
            run: check_privileged,
        },
        CheckDef {
            id: "capabilities-baseline",
            name: "Capabilities",
            restricted: false,
            run: check_capabilities_baseline,
        },
        CheckDef {
            id: "host-path-volumes",
            name: "HostPath Volumes",
            restricted: false,
            run: check_host_path_volumes,
        },
        CheckDef {
            id: "host-ports",
            name: "Host Ports",
            restricted: false,
            run: check_host_ports,
        },
        CheckDef {
            id: "sysctls",
            name: "Sysctls",
            restricted: false,
            run: check_sysctls,
        },
        CheckDef {
            id: "privilege-escalation",
            name: "Privilege Escalation",
            restricted: true,
            run: check_privilege_escalation,
        },
        CheckDef {
            id: "run-as-non-root",
            name: "Running as Non-root",
            restricted: true,
            run: check_run_as_non_root,
        },
        CheckDef {
            id: "seccomp-profile",
            name: "Seccomp",
            restricted: true,
            run: check_seccomp,
        },
        CheckDef {
            id: "restricted-volumes",
            name: "Volume Types",
            restricted: true,
            run: check_volume_types,
        },
        CheckDef {
            id: "capabilities-restricted",
            name: "Capabilities",
            restricted: true,
            run: check_capabilities_restricted,
        },
    ]
});

fn check_host_namespaces(pod: &Pod) -> Vec<Offender> {
    let mut out = Vec::new();
    if let Some(spec) = spec(pod) {
        if spec.host_network == Some(true) {
            out.push(Offender::pod("hostNetwork=true"));
        }
        if spec.host_pid == Some(true) {
            out.push(Offender::pod("hostPID=true"));
        }
        if spec.host_ipc == Some(true) {
            out.push(Offender::pod("hostIPC=true"));
        }
    }
    out
}

fn check_privileged(pod: &Pod) -> Vec<Offender> {
    containers(pod)
        .into_iter()
        .filter(|c| {
            c.security_context
                .as_ref()
                .and_then(|sc| sc.privileged)
                == Some(true)
        })
        .map(|c| Offender::container(c, "privileged=true"))
        .collect()
}

fn check_capabilities_baseline(pod: &Pod) -> Vec<Offender> {
    let mut out = Vec::new();
    for container in containers(pod) {
        let added: Vec<&str> = container
            .security_context
            .as_ref()
            .and_then(|sc| sc.capabilities.as_ref())
            .and_then(|caps| caps.add.as_ref())
            .map(|add| {
                add.iter()
                    .map(String::as_str)
                    .filter(|c| !BASELINE_CAPABILITIES.contains(c))
                    .collect()
            })
            .unwrap_or_default();
        if !added.is_empty() {
            out.push(Offender::container(
                container,
                format!("adds forbidden capabilities {}", added.join(", ")),
            ));
        }
    }
    out
}

fn check_host_path_volumes(pod: &Pod) -> Vec<Offender> {
    spec(pod)
        .and_then(|s| s.volumes.as_ref())
        .map(|volumes| {
            volumes
                .iter()
                .filter(|v| v.host_path.is_some())
                .map(|v| Offender::pod(format!("volume {} uses hostPath", v.name)))
                .collect()
        })
        .unwrap_or_default()
}

fn check_host_ports(pod: &Pod) -> Vec<Offender> {
    let mut out = Vec::new();
    for container in containers(pod) {
        if let Some(ports) = &container.ports {
            for port in ports {
                if port.host_port.is_some_and(|p| p != 0) {
                    out.push(Offender::container(
                        container,
                        format!("uses hostPort {}", port.host_port.unwrap_or_default()),
                    ));
                }
            }
        }
    }
    out
}

fn check_sysctls(pod: &Pod) -> Vec<Offender> {
    spec(pod)
        .and_then(|s| s.security_context.as_ref())
        .and_then(|sc| sc.sysctls.as_ref())
        .map(|sysctls| {
            sysctls
                .iter()
                .filter(|s| !ALLOWED_SYSCTLS.contains(&s.name.as_str()))
                .map(|s| Offender::pod(format!("forbidden sysctl {}", s.name)))
                .collect()
        })
        .unwrap_or_default()
}

fn check_privilege_escalation(pod: &Pod) -> Vec<Offender> {
    containers(pod)
        .into_iter()
        .filter(|c| {
            c.security_context
                .as_ref()
                .and_then(|sc| sc.allow_privilege_escalation)
                != Some(false)
        })
        .map(|c| Offender::container(c, "allowPrivilegeEscalation is not false"))
        .collect()
}

fn check_run_as_non_root(pod: &Pod) -> Vec<Offender> {
    let pod_level = spec(pod)
        .and_then(|s| s.security_context.as_ref())
        .and_then(|sc| sc.run_as_non_root);
    containers(pod)
        .into_iter()
        .filter(|c| {
            let effective = c
                .security_context
                .as_ref()
                .and_then(|sc| sc.run_as_non_root)
                .or(pod_level);
            effective != Some(true)
        })
        .map(|c| Offender::container(c, "runAsNonRoot is not true"))
        .collect()
}

fn check_seccomp(pod: &Pod) -> Vec<Offender> {
    let allowed = |profile: Option<&str>| matches!(profile, Some("RuntimeDefault" | "Localhost"));
    let pod_level = spec(pod)
        .and_then(|s| s.security_context.as_ref())
        .and_then(|sc| sc.seccomp_profile.as_ref())
        .map(|p| p.type_.as_str());
    containers(pod)
        .into_iter()
        .filter(|c| {
            let container_level = c
                .security_context
                .as_ref()
                .and_then(|sc| sc.seccomp_profile.as_ref())
                .map(|p| p.type_.as_str());
            !allowed(container_level.or(pod_level))
        })
        .map(|c| Offender::container(c, "seccompProfile.type is not RuntimeDefault or Localhost"))
        .collect()
}

fn check_volume_types(pod: &Pod) -> Vec<Offender> {
    let volumes = match spec(pod).and_then(|s| s.volumes.as_ref()) {
        Some(v) => v,
        None => return Vec::new(),
    };
    let mut out = Vec::new();
    for volume in volumes {
        // inspect the serialized form so every volume source is covered
        let serialized = match serde_json::to_value(volume) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let sources: Vec<String> = serialized
            .as_object()
            .map(|map| {
                map.keys()
                    .filter(|k| *k != "name")
                    .filter(|k| !RESTRICTED_VOLUME_TYPES.contains(&k.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for source in sources {
            out.push(Offender::pod(format!(
                "volume {} uses restricted type {}",
                volume.name, source
            )));
        }
    }
    out
}

fn check_capabilities_restricted(pod: &Pod) -> Vec<Offender> {
    let mut out = Vec::new();
    for container in containers(pod) {
        let capabilities = container
            .security_context
            .as_ref()
            .and_then(|sc| sc.capabilities.as_ref());
        let drops_all = capabilities
            .and_then(|caps| caps.drop.as_ref())
            .is_some_and(|drop| drop.iter().any(|c| c == "ALL"));
        if !drops_all {
            out.push(Offender::container(container, "must drop ALL capabilities"));
        }
        let forbidden_adds: Vec<&str> = capabilities
            .and_then(|caps| caps.add.as_ref())
            .map(|add| {
                add.iter()
                    .map(String::as_str)
                    .filter(|c| *c != "NET_BIND_SERVICE")
                    .collect()
            })
            .unwrap_or_default();
        if !forbidden_adds.is_empty() {
            out.push(Offender::container(
                container,
                format!("may only add NET_BIND_SERVICE, adds {}", forbidden_adds.join(", ")),
            ));
        }
    }
    out
}
