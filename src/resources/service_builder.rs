use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

use crate::constants::{ports, HEADLESS_SVC_NAME_SUFFIX};
use crate::crds::KafkaCluster;
use crate::resources::common;

fn service_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.into()),
        port,
        ..Default::default()
    }
}

/// Build the client-facing Service. External port first, then internal.
pub fn build_client_service(cluster: &KafkaCluster) -> Service {
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_else(|| "default".into());

    Service {
        metadata: ObjectMeta {
            name: Some(common::resource_name(&name, &[])),
            namespace: Some(namespace),
            labels: Some(common::resource_labels(&name)),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![
                service_port(ports::EXTERNAL_NAME, ports::EXTERNAL),
                service_port(ports::INTERNAL_NAME, ports::INTERNAL),
            ]),
            selector: Some(common::resource_labels(&name)),
            type_: Some("ClusterIP".into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the headless Service used for broker peer discovery. Internal port
/// first, then external; no cluster IP is assigned so each pod gets its own
/// DNS record.
pub fn build_headless_service(cluster: &KafkaCluster) -> Service {
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_else(|| "default".into());

    Service {
        metadata: ObjectMeta {
            name: Some(common::resource_name(&name, &[HEADLESS_SVC_NAME_SUFFIX])),
            namespace: Some(namespace),
            labels: Some(common::resource_labels(&name)),
            owner_references: Some(vec![common::owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![
                service_port(ports::INTERNAL_NAME, ports::INTERNAL),
                service_port(ports::EXTERNAL_NAME, ports::EXTERNAL),
            ]),
            selector: Some(common::resource_labels(&name)),
            cluster_ip: Some("None".into()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cluster() -> KafkaCluster {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "kafka.nineinfra.tech/v1",
            "kind": "KafkaCluster",
            "metadata": { "name": "demo", "namespace": "ns", "uid": "uid-1" },
            "spec": {
                "version": "3.6.1",
                "image": { "repository": "bitnami/kafka" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_client_service_port_order() {
        let svc = build_client_service(&test_cluster());
        assert_eq!(svc.metadata.name.as_deref(), Some("demo-kafka"));

        let spec = svc.spec.as_ref().unwrap();
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        let ports = spec.ports.as_ref().unwrap();
        assert_eq!(ports[0].name.as_deref(), Some("external"));
        assert_eq!(ports[0].port, 9093);
        assert_eq!(ports[1].name.as_deref(), Some("internal"));
        assert_eq!(ports[1].port, 9092);
    }

    #[test]
    fn test_headless_service_has_no_cluster_ip() {
        let svc = build_headless_service(&test_cluster());
        assert_eq!(svc.metadata.name.as_deref(), Some("demo-kafka-headless"));

        let spec = svc.spec.as_ref().unwrap();
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        let ports = spec.ports.as_ref().unwrap();
        assert_eq!(ports[0].name.as_deref(), Some("internal"));
        assert_eq!(ports[1].name.as_deref(), Some("external"));
    }

    #[test]
    fn test_services_select_cluster_labels() {
        let svc = build_client_service(&test_cluster());
        let selector = svc.spec.as_ref().unwrap().selector.as_ref().unwrap();
        assert_eq!(selector["cluster"], "demo");
        assert_eq!(selector["app"], "kafka");
    }
}
