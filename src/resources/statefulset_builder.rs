use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Affinity, ConfigMapVolumeSource, Container, ContainerPort, KeyToPath, LocalObjectReference,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PodAffinityTerm, PodAntiAffinity, PodSpec,
    PodTemplateSpec, Probe, ResourceRequirements, TCPSocketAction, Volume, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::constants::{self, defaults, ports, probes, CONFIG_NAME_SUFFIX, HEADLESS_SVC_NAME_SUFFIX};
use crate::crds::{KafkaCluster, ResourceValues};
use crate::error::OperatorError;
use crate::resources::common;

/// Build the broker StatefulSet, including pod template, probes, and PVC
/// templates. Fails when the spec carries a malformed storage quantity.
pub fn build_stateful_set(cluster: &KafkaCluster) -> Result<StatefulSet, OperatorError> {
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_else(|| "default".into());
    let labels = common::resource_labels(&name);

    Ok(StatefulSet {
        metadata: ObjectMeta {
            name: Some(common::resource_name(&name, &[])),
            namespace: Some(namespace),
            labels: Some(labels.clone()),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            // Pods need per-member DNS records for peer discovery, which
            // only the headless Service provides.
            service_name: common::resource_name(&name, &[HEADLESS_SVC_NAME_SUFFIX]),
            replicas: Some(cluster.spec.effective_replicas()),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(build_pod_spec(cluster)),
            },
            volume_claim_templates: Some(build_pvc_templates(cluster)?),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn build_pod_spec(cluster: &KafkaCluster) -> PodSpec {
    let name = cluster.name_any();
    let image = cluster.spec.resolved_image();

    let image_pull_secrets = if image.pull_secret.is_empty() {
        None
    } else {
        Some(vec![LocalObjectReference {
            name: Some(image.pull_secret.clone()),
        }])
    };

    let container = Container {
        name: name.clone(),
        image: Some(image.reference()),
        image_pull_policy: Some(image.pull_policy),
        ports: Some(container_ports()),
        env: Some(common::broker_env()),
        resources: build_container_resources(cluster),
        readiness_probe: Some(readiness_probe()),
        liveness_probe: Some(liveness_probe()),
        volume_mounts: Some(build_volume_mounts(cluster)),
        ..Default::default()
    };

    PodSpec {
        containers: vec![container],
        image_pull_secrets,
        restart_policy: Some("Always".into()),
        termination_grace_period_seconds: Some(defaults::TERMINATION_GRACE_SECS),
        volumes: Some(vec![config_volume(&name)]),
        // One broker per host, as a hard scheduling constraint.
        affinity: Some(Affinity {
            pod_anti_affinity: Some(PodAntiAffinity {
                required_during_scheduling_ignored_during_execution: Some(vec![PodAffinityTerm {
                    topology_key: "kubernetes.io/hostname".into(),
                    label_selector: Some(LabelSelector {
                        match_labels: Some(common::resource_labels(&name)),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn container_ports() -> Vec<ContainerPort> {
    vec![
        ContainerPort {
            name: Some(ports::INTERNAL_NAME.into()),
            container_port: ports::INTERNAL,
            ..Default::default()
        },
        ContainerPort {
            name: Some(ports::EXTERNAL_NAME.into()),
            container_port: ports::EXTERNAL,
            ..Default::default()
        },
    ]
}

/// Both configuration files mount from distinct keys of the one shared
/// ConfigMap, then the log-scratch volume and one mount per data disk.
fn build_volume_mounts(cluster: &KafkaCluster) -> Vec<VolumeMount> {
    let name = cluster.name_any();
    let config_volume = common::resource_name(&name, &[CONFIG_NAME_SUFFIX]);

    let mut mounts = vec![
        VolumeMount {
            name: config_volume.clone(),
            mount_path: format!("{}/{}", constants::CONF_PATH, constants::BROKER_CONFIG_FILE),
            sub_path: Some(constants::BROKER_CONFIG_FILE.into()),
            ..Default::default()
        },
        VolumeMount {
            name: config_volume,
            mount_path: format!("{}/{}", constants::CONF_PATH, constants::LOG_CONFIG_FILE),
            sub_path: Some(constants::LOG_CONFIG_FILE.into()),
            ..Default::default()
        },
        VolumeMount {
            name: constants::LOG_VOLUME_NAME.into(),
            mount_path: constants::LOG_PATH.into(),
            ..Default::default()
        },
    ];
    for i in 0..cluster.spec.disk_count() {
        let volume_name = format!("{}{i}", constants::DISK_PREFIX);
        mounts.push(VolumeMount {
            mount_path: format!("{}/{volume_name}", constants::DATA_PATH),
            name: volume_name,
            ..Default::default()
        });
    }
    mounts
}

/// The ConfigMap-backed volume. The log and disk volumes come from the PVC
/// templates, so the pod spec only declares the config volume itself.
fn config_volume(cluster_name: &str) -> Volume {
    let config_name = common::resource_name(cluster_name, &[CONFIG_NAME_SUFFIX]);
    Volume {
        name: config_name.clone(),
        config_map: Some(ConfigMapVolumeSource {
            name: Some(config_name),
            items: Some(vec![
                KeyToPath {
                    key: constants::BROKER_CONFIG_FILE.into(),
                    path: constants::BROKER_CONFIG_FILE.into(),
                    ..Default::default()
                },
                KeyToPath {
                    key: constants::LOG_CONFIG_FILE.into(),
                    path: constants::LOG_CONFIG_FILE.into(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// One fixed-size claim for the log-scratch volume plus one claim per data
/// disk, all ReadWriteOnce on the resolved storage class.
fn build_pvc_templates(
    cluster: &KafkaCluster,
) -> Result<Vec<PersistentVolumeClaim>, OperatorError> {
    let name = cluster.name_any();
    let storage_class = cluster.spec.storage_class();
    let disk_size = cluster.spec.storage_request();

    common::validate_quantity(&disk_size)?;

    let claim = |claim_name: String, size: &str| PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(claim_name),
            labels: Some(common::resource_labels(&name)),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            storage_class_name: Some(storage_class.clone()),
            access_modes: Some(vec!["ReadWriteOnce".into()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(size.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    let mut pvcs = vec![claim(
        constants::LOG_VOLUME_NAME.to_string(),
        defaults::LOG_VOLUME_SIZE,
    )];
    for i in 0..cluster.spec.disk_count() {
        pvcs.push(claim(format!("{}{i}", constants::DISK_PREFIX), &disk_size));
    }
    Ok(pvcs)
}

fn build_container_resources(cluster: &KafkaCluster) -> Option<ResourceRequirements> {
    let to_map = |values: &ResourceValues| {
        let mut map = BTreeMap::new();
        if let Some(cpu) = &values.cpu {
            map.insert("cpu".to_string(), Quantity(cpu.clone()));
        }
        if let Some(memory) = &values.memory {
            map.insert("memory".to_string(), Quantity(memory.clone()));
        }
        map
    };

    let requests = cluster.spec.resource.requests.as_ref().map(to_map);
    let limits = cluster.spec.resource.limits.as_ref().map(to_map);
    if requests.is_none() && limits.is_none() {
        return None;
    }
    Some(ResourceRequirements {
        requests: requests.filter(|m| !m.is_empty()),
        limits: limits.filter(|m| !m.is_empty()),
        ..Default::default()
    })
}

fn tcp_probe_handler() -> TCPSocketAction {
    TCPSocketAction {
        port: IntOrString::Int(ports::INTERNAL),
        ..Default::default()
    }
}

fn readiness_probe() -> Probe {
    Probe {
        tcp_socket: Some(tcp_probe_handler()),
        initial_delay_seconds: Some(probes::READINESS_INITIAL_DELAY_SECS),
        period_seconds: Some(probes::READINESS_PERIOD_SECS),
        timeout_seconds: Some(probes::READINESS_TIMEOUT_SECS),
        failure_threshold: Some(probes::READINESS_FAILURE_THRESHOLD),
        success_threshold: Some(probes::READINESS_SUCCESS_THRESHOLD),
        ..Default::default()
    }
}

fn liveness_probe() -> Probe {
    Probe {
        tcp_socket: Some(tcp_probe_handler()),
        initial_delay_seconds: Some(probes::LIVENESS_INITIAL_DELAY_SECS),
        period_seconds: Some(probes::LIVENESS_PERIOD_SECS),
        timeout_seconds: Some(probes::LIVENESS_TIMEOUT_SECS),
        failure_threshold: Some(probes::LIVENESS_FAILURE_THRESHOLD),
        success_threshold: Some(probes::LIVENESS_SUCCESS_THRESHOLD),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cluster(resource: serde_json::Value) -> KafkaCluster {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "kafka.nineinfra.tech/v1",
            "kind": "KafkaCluster",
            "metadata": { "name": "demo", "namespace": "ns", "uid": "uid-1" },
            "spec": {
                "version": "3.6.1",
                "image": { "repository": "bitnami/kafka" },
                "resource": resource
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_stateful_set_shape() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({ "replicas": 5 }))).unwrap();

        assert_eq!(sts.metadata.name.as_deref(), Some("demo-kafka"));
        let spec = sts.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(5));
        assert_eq!(spec.service_name, "demo-kafka-headless");
        assert_eq!(
            spec.selector.match_labels.as_ref().unwrap()["cluster"],
            "demo"
        );
    }

    #[test]
    fn test_even_replicas_normalize_in_workload() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({ "replicas": 4 }))).unwrap();
        assert_eq!(sts.spec.as_ref().unwrap().replicas, Some(3));
    }

    #[test]
    fn test_container_image_ports_and_grace() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({}))).unwrap();
        let pod = sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        assert_eq!(pod.termination_grace_period_seconds, Some(30));

        let container = &pod.containers[0];
        assert_eq!(container.name, "demo");
        assert_eq!(container.image.as_deref(), Some("bitnami/kafka:3.6.1"));
        assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));

        let ports = container.ports.as_ref().unwrap();
        assert_eq!(ports[0].container_port, 9092);
        assert_eq!(ports[1].container_port, 9093);
    }

    #[test]
    fn test_anti_affinity_is_required_per_host() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({}))).unwrap();
        let pod = sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let terms = pod
            .affinity
            .as_ref()
            .unwrap()
            .pod_anti_affinity
            .as_ref()
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .as_ref()
            .unwrap();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].topology_key, "kubernetes.io/hostname");
    }

    #[test]
    fn test_volume_mounts_cover_config_log_and_disks() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({ "disks": 2 }))).unwrap();
        let pod = sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let mounts = pod.containers[0].volume_mounts.as_ref().unwrap();

        // 2 config files + log + 2 disks
        assert_eq!(mounts.len(), 5);
        assert_eq!(
            mounts[0].mount_path,
            "/opt/kafka/conf/server.properties"
        );
        assert_eq!(mounts[0].sub_path.as_deref(), Some("server.properties"));
        assert_eq!(mounts[2].name, "log");
        assert_eq!(mounts[2].mount_path, "/opt/kafka/logs");
        assert_eq!(mounts[3].name, "disk0");
        assert_eq!(mounts[3].mount_path, "/opt/kafka/data/disk0");
        assert_eq!(mounts[4].name, "disk1");
    }

    #[test]
    fn test_config_volume_items() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({}))).unwrap();
        let pod = sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let volumes = pod.volumes.as_ref().unwrap();
        assert_eq!(volumes.len(), 1);

        let cm = volumes[0].config_map.as_ref().unwrap();
        assert_eq!(cm.name.as_deref(), Some("demo-kafka-config"));
        let items = cm.items.as_ref().unwrap();
        assert_eq!(items[0].key, "server.properties");
        assert_eq!(items[1].key, "log4j.properties");
    }

    #[test]
    fn test_pvc_templates_per_disk() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({
            "disks": 3,
            "storageClass": "fast-ssd",
            "requests": { "storage": "100Gi" }
        })))
        .unwrap();

        let pvcs = sts
            .spec
            .as_ref()
            .unwrap()
            .volume_claim_templates
            .as_ref()
            .unwrap();
        assert_eq!(pvcs.len(), 4);

        let log = &pvcs[0];
        assert_eq!(log.metadata.name.as_deref(), Some("log"));
        let log_spec = log.spec.as_ref().unwrap();
        assert_eq!(log_spec.storage_class_name.as_deref(), Some("fast-ssd"));
        assert_eq!(
            log_spec.resources.as_ref().unwrap().requests.as_ref().unwrap()["storage"].0,
            "5Gi"
        );

        for (i, pvc) in pvcs[1..].iter().enumerate() {
            assert_eq!(pvc.metadata.name.as_deref(), Some(format!("disk{i}").as_str()));
            let spec = pvc.spec.as_ref().unwrap();
            assert_eq!(spec.access_modes.as_ref().unwrap(), &["ReadWriteOnce"]);
            assert_eq!(
                spec.resources.as_ref().unwrap().requests.as_ref().unwrap()["storage"].0,
                "100Gi"
            );
        }
    }

    #[test]
    fn test_malformed_storage_quantity_is_a_build_error() {
        let result = build_stateful_set(&test_cluster(serde_json::json!({
            "requests": { "storage": "fifty gigs" }
        })));
        assert!(matches!(result, Err(OperatorError::Config(_))));
    }

    #[test]
    fn test_container_resources_from_spec() {
        let sts = build_stateful_set(&test_cluster(serde_json::json!({
            "requests": { "cpu": "500m", "memory": "2Gi" },
            "limits": { "memory": "4Gi" }
        })))
        .unwrap();
        let pod = sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let resources = pod.containers[0].resources.as_ref().unwrap();
        assert_eq!(resources.requests.as_ref().unwrap()["cpu"].0, "500m");
        assert_eq!(resources.limits.as_ref().unwrap()["memory"].0, "4Gi");

        let sts = build_stateful_set(&test_cluster(serde_json::json!({}))).unwrap();
        let pod = sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        assert!(pod.containers[0].resources.is_none());
    }

    #[test]
    fn test_pull_secret_propagates() {
        let mut cluster = test_cluster(serde_json::json!({}));
        cluster.spec.image.pull_secret = "registry-creds".into();
        let sts = build_stateful_set(&cluster).unwrap();
        let pod = sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let secrets = pod.image_pull_secrets.as_ref().unwrap();
        assert_eq!(secrets[0].name.as_deref(), Some("registry-creds"));
    }
}
