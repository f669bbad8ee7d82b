use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::KafkaClusterStatus;
use crate::constants::{self, defaults};

/// Spec for a managed Kafka cluster.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kafka.nineinfra.tech",
    version = "v1",
    kind = "KafkaCluster",
    namespaced,
    status = "KafkaClusterStatus",
    shortname = "kc",
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".status.currentVersion"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaClusterSpec {
    /// Version of the cluster. Also the default image tag.
    pub version: String,

    /// Container image configuration.
    pub image: ImageConfig,

    /// Replica, disk, and storage sizing.
    #[serde(default)]
    pub resource: ResourceConfig,

    /// Free-form k/v overrides for `server.properties`.
    #[serde(default)]
    pub conf: BTreeMap<String, String>,

    /// Free-form k/v platform configuration, such as the cluster domain.
    #[serde(default)]
    pub k8s_conf: BTreeMap<String, String>,
}

/// Container image configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// Image repository.
    pub repository: String,

    /// Image tag. Defaults to the cluster version when empty.
    #[serde(default)]
    pub tag: String,

    /// Image pull policy. One of `Always`, `Never`, `IfNotPresent`.
    /// Defaults to `IfNotPresent` when empty.
    #[serde(default)]
    pub pull_policy: String,

    /// Secret name for image pull.
    #[serde(default)]
    pub pull_secret: String,
}

/// Replica, disk, and storage sizing for the cluster workload.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Number of broker replicas. Zero or even values fall back to the
    /// quorum-friendly default of 3.
    #[serde(default)]
    pub replicas: i32,

    /// Number of data disks per broker. Zero falls back to 1.
    #[serde(default)]
    pub disks: i32,

    /// StorageClass for data and log volumes.
    #[serde(default)]
    pub storage_class: String,

    /// Resource requests per broker.
    #[serde(default)]
    pub requests: Option<ResourceValues>,

    /// Resource limits per broker.
    #[serde(default)]
    pub limits: Option<ResourceValues>,
}

/// CPU, memory, and storage values.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResourceValues {
    /// CPU (e.g., "500m", "2").
    #[serde(default)]
    pub cpu: Option<String>,

    /// Memory (e.g., "1Gi", "4Gi").
    #[serde(default)]
    pub memory: Option<String>,

    /// Storage per data disk (e.g., "50Gi").
    #[serde(default)]
    pub storage: Option<String>,
}

/// Image config with tag and pull policy defaults applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedImage {
    pub repository: String,
    pub tag: String,
    pub pull_policy: String,
    pub pull_secret: String,
}

impl ResolvedImage {
    /// Full image reference, `repository:tag`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

impl KafkaClusterSpec {
    /// Effective replica count. Nonzero odd values are honored; anything
    /// else normalizes to the default so brokers can form a quorum.
    pub fn effective_replicas(&self) -> i32 {
        if self.resource.replicas != 0 && self.resource.replicas % 2 != 0 {
            self.resource.replicas
        } else {
            defaults::REPLICAS
        }
    }

    /// Effective disk count, at least 1.
    pub fn disk_count(&self) -> i32 {
        if self.resource.disks != 0 {
            self.resource.disks
        } else {
            defaults::DISKS
        }
    }

    /// StorageClass name, user override or the platform default.
    pub fn storage_class(&self) -> String {
        if self.resource.storage_class.is_empty() {
            defaults::STORAGE_CLASS.to_string()
        } else {
            self.resource.storage_class.clone()
        }
    }

    /// Storage request per data disk, user value or the fixed default.
    pub fn storage_request(&self) -> String {
        self.resource
            .requests
            .as_ref()
            .and_then(|r| r.storage.clone())
            .unwrap_or_else(|| defaults::DATA_VOLUME_SIZE.to_string())
    }

    /// Image config with defaults applied: tag falls back to the cluster
    /// version, pull policy to `IfNotPresent`.
    pub fn resolved_image(&self) -> ResolvedImage {
        let tag = if self.image.tag.is_empty() {
            self.version.clone()
        } else {
            self.image.tag.clone()
        };
        let pull_policy = if self.image.pull_policy.is_empty() {
            "IfNotPresent".to_string()
        } else {
            self.image.pull_policy.clone()
        };
        ResolvedImage {
            repository: self.image.repository.clone(),
            tag,
            pull_policy,
            pull_secret: self.image.pull_secret.clone(),
        }
    }

    /// Cluster DNS domain, from the platform overlay or the default.
    pub fn cluster_domain(&self) -> String {
        self.k8s_conf
            .get(constants::defaults::CLUSTER_DOMAIN_KEY)
            .cloned()
            .unwrap_or_else(|| defaults::CLUSTER_DOMAIN.to_string())
    }
}
