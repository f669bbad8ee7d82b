use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

use crate::config_generator;
use crate::constants::{BROKER_CONFIG_FILE, CONFIG_NAME_SUFFIX, LOG_CONFIG_FILE};
use crate::crds::KafkaCluster;
use crate::resources::common;

/// Build the ConfigMap holding `server.properties` and `log4j.properties`
/// for every broker in the cluster.
pub fn build_config_map(cluster: &KafkaCluster) -> ConfigMap {
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_else(|| "default".into());

    let data = BTreeMap::from([
        (
            BROKER_CONFIG_FILE.to_string(),
            config_generator::broker_properties(&cluster.spec),
        ),
        (
            LOG_CONFIG_FILE.to_string(),
            config_generator::log_properties(),
        ),
    ]);

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(common::resource_name(&name, &[CONFIG_NAME_SUFFIX])),
            namespace: Some(namespace),
            labels: Some(common::resource_labels(&name)),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cluster() -> KafkaCluster {
        let mut cluster: KafkaCluster = serde_json::from_value(serde_json::json!({
            "apiVersion": "kafka.nineinfra.tech/v1",
            "kind": "KafkaCluster",
            "metadata": { "name": "demo", "namespace": "ns", "uid": "uid-1" },
            "spec": {
                "version": "3.6.1",
                "image": { "repository": "bitnami/kafka" },
                "resource": { "disks": 2 }
            }
        }))
        .unwrap();
        cluster.metadata.uid = Some("uid-1".into());
        cluster
    }

    #[test]
    fn test_build_config_map_names_and_keys() {
        let cm = build_config_map(&test_cluster());

        assert_eq!(cm.metadata.name.as_deref(), Some("demo-kafka-config"));
        assert_eq!(cm.metadata.namespace.as_deref(), Some("ns"));
        assert_eq!(cm.metadata.labels.as_ref().unwrap()["app"], "kafka");

        let data = cm.data.as_ref().unwrap();
        assert!(data.contains_key("server.properties"));
        assert!(data.contains_key("log4j.properties"));
        assert!(data["server.properties"]
            .contains("log.dirs=/opt/kafka/data/disk0,/opt/kafka/data/disk1"));
    }

    #[test]
    fn test_config_map_has_owner_reference() {
        let cm = build_config_map(&test_cluster());
        let refs = cm.metadata.owner_references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "KafkaCluster");
        assert_eq!(refs[0].controller, Some(true));
    }
}
