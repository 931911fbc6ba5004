//! Resource identifier classification
//!
//! Turns a raw resource identifier into a typed remediation target once, so
//! downstream code matches on the variant instead of re-parsing strings.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static COMPUTE_INSTANCE_RE: OnceLock<Regex> = OnceLock::new();
static MANAGED_SERVICE_RE: OnceLock<Regex> = OnceLock::new();

fn compute_instance_re() -> &'static Regex {
    COMPUTE_INSTANCE_RE.get_or_init(|| {
        Regex::new(r"^i-[0-9a-fA-F]+$").expect("compute instance pattern is valid")
    })
}

// Each segment is either a bare name or a full ARN of the matching type. The
// cluster ARN tail is lazy so a service ARN is never swallowed into it.
fn managed_service_re() -> &'static Regex {
    MANAGED_SERVICE_RE.get_or_init(|| {
        Regex::new(
            r"^ecs-service/(?P<cluster>[^/]+|arn:aws:ecs:[^:]+:\d+:cluster/.+?)/(?P<service>[^/]+|arn:aws:ecs:[^:]+:\d+:service/.+)$",
        )
        .expect("managed service pattern is valid")
    })
}

/// Remediation target derived from a resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedTarget {
    /// A compute instance, restarted in place
    ComputeInstance { instance_id: String },
    /// A service on a container cluster, redeployed
    ManagedService { cluster: String, service: String },
    /// Anything else; never auto-remediated
    Unrecognized,
}

impl ClassifiedTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedTarget::ComputeInstance { .. } => "compute_instance",
            ClassifiedTarget::ManagedService { .. } => "managed_service",
            ClassifiedTarget::Unrecognized => "unrecognized",
        }
    }

    pub fn is_remediable(&self) -> bool {
        !matches!(self, ClassifiedTarget::Unrecognized)
    }
}

impl std::fmt::Display for ClassifiedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifiedTarget::ComputeInstance { instance_id } => {
                write!(f, "compute instance {}", instance_id)
            }
            ClassifiedTarget::ManagedService { cluster, service } => {
                write!(f, "service {} on cluster {}", service, cluster)
            }
            ClassifiedTarget::Unrecognized => write!(f, "unrecognized resource"),
        }
    }
}

/// Classify a resource identifier; first matching rule wins
pub fn classify(resource_id: &str) -> ClassifiedTarget {
    if compute_instance_re().is_match(resource_id) {
        return ClassifiedTarget::ComputeInstance {
            instance_id: resource_id.to_string(),
        };
    }

    if let Some(caps) = managed_service_re().captures(resource_id) {
        return ClassifiedTarget::ManagedService {
            cluster: caps["cluster"].to_string(),
            service: caps["service"].to_string(),
        };
    }

    ClassifiedTarget::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_instance() {
        assert_eq!(
            classify("i-0a1b2c3d"),
            ClassifiedTarget::ComputeInstance {
                instance_id: "i-0a1b2c3d".to_string()
            }
        );
        assert_eq!(classify("i-1234").kind(), "compute_instance");
        assert_eq!(classify("i-ABCDEF0123").kind(), "compute_instance");
    }

    #[test]
    fn test_compute_instance_rejects_non_hex() {
        assert_eq!(classify("i-"), ClassifiedTarget::Unrecognized);
        assert_eq!(classify("i-xyz"), ClassifiedTarget::Unrecognized);
        assert_eq!(classify("i-1234 "), ClassifiedTarget::Unrecognized);
        assert_eq!(classify("ai-1234"), ClassifiedTarget::Unrecognized);
    }

    #[test]
    fn test_managed_service_by_name() {
        assert_eq!(
            classify("ecs-service/prod/api"),
            ClassifiedTarget::ManagedService {
                cluster: "prod".to_string(),
                service: "api".to_string()
            }
        );
    }

    #[test]
    fn test_managed_service_by_arn() {
        let id = "ecs-service/arn:aws:ecs:us-east-1:123456789012:cluster/prod/arn:aws:ecs:us-east-1:123456789012:service/prod/api";
        assert_eq!(
            classify(id),
            ClassifiedTarget::ManagedService {
                cluster: "arn:aws:ecs:us-east-1:123456789012:cluster/prod".to_string(),
                service: "arn:aws:ecs:us-east-1:123456789012:service/prod/api".to_string()
            }
        );
    }

    #[test]
    fn test_managed_service_mixed_forms() {
        let id = "ecs-service/arn:aws:ecs:eu-west-1:1:cluster/blue/web";
        assert_eq!(
            classify(id),
            ClassifiedTarget::ManagedService {
                cluster: "arn:aws:ecs:eu-west-1:1:cluster/blue".to_string(),
                service: "web".to_string()
            }
        );
    }

    #[test]
    fn test_managed_service_rejects_extra_segments() {
        assert_eq!(classify("ecs-service/prod/api/extra"), ClassifiedTarget::Unrecognized);
        assert_eq!(classify("ecs-service/prod"), ClassifiedTarget::Unrecognized);
        assert_eq!(classify("ecs-service//api"), ClassifiedTarget::Unrecognized);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(classify("weird-thing"), ClassifiedTarget::Unrecognized);
        assert_eq!(classify(""), ClassifiedTarget::Unrecognized);
        assert!(!classify("unknown-resource").is_remediable());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(classify("ecs-service/prod/api")).unwrap();
        assert_eq!(json["kind"], "managed_service");
        assert_eq!(json["cluster"], "prod");
        assert_eq!(json["service"], "api");
    }
}
