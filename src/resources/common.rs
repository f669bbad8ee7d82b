//! Naming, labeling, and shared builder helpers.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

use crate::constants::{self, labels, ports, values};
use crate::crds::KafkaCluster;
use crate::error::OperatorError;

/// Canonical name for a resource derived from a cluster:
/// `{cluster}-kafka{suffixes...}`. Distinct suffixes keep the object kinds
/// of one cluster collision-free.
pub fn resource_name(cluster_name: &str, suffixes: &[&str]) -> String {
    format!("{cluster_name}{}{}", constants::NAME_SUFFIX, suffixes.concat())
}

/// The fixed two-key label set stamped on every derived object and used as
/// the selector for observing them.
pub fn resource_labels(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::CLUSTER.into(), cluster_name.into()),
        (labels::APP.into(), values::CLUSTER_SIGN.into()),
    ])
}

/// Label selector string for listing the cluster's pods.
pub fn label_selector(cluster_name: &str) -> String {
    format!(
        "{}={cluster_name},{}={}",
        labels::CLUSTER,
        labels::APP,
        values::CLUSTER_SIGN
    )
}

/// Fully qualified DNS name of the client Service.
pub fn full_service_name(cluster: &KafkaCluster) -> String {
    let namespace = cluster.namespace().unwrap_or_else(|| "default".into());
    format!(
        "{}.{namespace}.svc.{}",
        resource_name(&cluster.name_any(), &[]),
        cluster.spec.cluster_domain()
    )
}

/// Build an OwnerReference so the platform garbage-collects sub-resources
/// when the cluster is deleted.
pub fn owner_reference(cluster: &KafkaCluster) -> OwnerReference {
    OwnerReference {
        api_version: KafkaCluster::api_version(&()).to_string(),
        kind: KafkaCluster::kind(&()).to_string(),
        name: cluster.name_any(),
        uid: cluster.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Downward-API identity fields plus the fixed log/port environment the
/// broker entrypoint expects.
pub fn broker_env() -> Vec<EnvVar> {
    let field = |name: &str, path: &str| EnvVar {
        name: name.into(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: path.into(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };
    let plain = |name: &str, value: String| EnvVar {
        name: name.into(),
        value: Some(value),
        ..Default::default()
    };

    vec![
        field("POD_IP", "status.podIP"),
        field("POD_NAME", "metadata.name"),
        field("NAMESPACE", "metadata.namespace"),
        field("POD_UID", "metadata.uid"),
        field("HOST_IP", "status.hostIP"),
        plain(
            "KAFKA_LOG4J_OPTS",
            format!(
                "-Dlog4j.configuration=file:{}/{}",
                constants::CONF_PATH,
                constants::LOG_CONFIG_FILE
            ),
        ),
        plain("INTERNAL_PORT_NAME", ports::INTERNAL_NAME.into()),
        plain("EXTERNAL_PORT_NAME", ports::EXTERNAL_NAME.into()),
        plain("INTERNAL_PORT", ports::INTERNAL.to_string()),
        plain("EXTERNAL_PORT", ports::EXTERNAL.to_string()),
    ]
}

/// Validate a Kubernetes quantity string such as `50Gi`, `500m`, or `2`.
///
/// The API server would reject a malformed quantity at admission; failing
/// here surfaces the problem as a build error before any object is sent.
pub fn validate_quantity(value: &str) -> Result<(), OperatorError> {
    const SUFFIXES: [&str; 14] = [
        "", "m", "k", "M", "G", "T", "P", "E", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei",
    ];

    let digits = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(value.len());
    let (number, suffix) = value.split_at(digits);

    let numeric_ok = !number.is_empty() && number.parse::<f64>().is_ok();
    let suffix_ok = SUFFIXES.contains(&suffix)
        || (suffix.starts_with('e') && suffix[1..].parse::<i32>().is_ok());

    if numeric_ok && suffix_ok {
        Ok(())
    } else {
        Err(OperatorError::Config(format!(
            "invalid quantity {value:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_name_suffixes() {
        assert_eq!(resource_name("demo", &[]), "demo-kafka");
        assert_eq!(resource_name("demo", &["-config"]), "demo-kafka-config");
        assert_eq!(resource_name("demo", &["-headless"]), "demo-kafka-headless");
    }

    #[test]
    fn test_resource_names_are_collision_free() {
        let names = [
            resource_name("demo", &[]),
            resource_name("demo", &["-config"]),
            resource_name("demo", &["-headless"]),
        ];
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_resource_labels() {
        let labels = resource_labels("demo");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["cluster"], "demo");
        assert_eq!(labels["app"], "kafka");
    }

    #[test]
    fn test_label_selector_format() {
        assert_eq!(label_selector("demo"), "cluster=demo,app=kafka");
    }

    #[test]
    fn test_broker_env_contains_identity_and_ports() {
        let env = broker_env();
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"POD_NAME"));
        assert!(names.contains(&"HOST_IP"));

        let port = env.iter().find(|e| e.name == "INTERNAL_PORT").unwrap();
        assert_eq!(port.value.as_deref(), Some("9092"));

        let opts = env.iter().find(|e| e.name == "KAFKA_LOG4J_OPTS").unwrap();
        assert_eq!(
            opts.value.as_deref(),
            Some("-Dlog4j.configuration=file:/opt/kafka/conf/log4j.properties")
        );
    }

    #[test]
    fn test_validate_quantity() {
        for ok in ["50Gi", "5Gi", "500m", "2", "1.5", "100M", "1e3"] {
            assert!(validate_quantity(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "Gi", "50Zi", "abc", "50 Gi"] {
            assert!(validate_quantity(bad).is_err(), "{bad} should be invalid");
        }
    }
}
