use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reason set on the Upgrading condition while an upgrade is in flight.
pub const UPDATING_CLUSTER_REASON: &str = "Updating Cluster";

/// Reason set on the Error condition when an upgrade step fails.
pub const UPGRADE_ERROR_REASON: &str = "Upgrade Error";

/// Error-condition reason marking a cluster as unrecoverably failed.
pub const UPGRADE_FAILED_REASON: &str = "UpgradeFailed";

/// Condition types tracked for every cluster. All three are created on
/// status init and persist for the cluster's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ClusterConditionType {
    PodsReady,
    Upgrading,
    Error,
}

/// Condition status, following the Kubernetes convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A named health/progress signal with reason, message, and transition
/// bookkeeping. Mutated only through [`KafkaClusterStatus`]; read-only
/// everywhere else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    /// Type of cluster condition.
    #[serde(rename = "type")]
    pub type_: ClusterConditionType,

    /// Status of the condition, one of True, False, Unknown.
    pub status: ConditionStatus,

    /// The reason for the condition's last transition.
    #[serde(default)]
    pub reason: String,

    /// A human-readable message indicating details about the transition.
    #[serde(default)]
    pub message: String,

    /// The last time this condition was updated (RFC 3339).
    #[serde(default)]
    pub last_update_time: String,

    /// Last time the condition transitioned from one status to another
    /// (RFC 3339).
    #[serde(default)]
    pub last_transition_time: String,
}

impl ClusterCondition {
    fn new(
        type_: ClusterConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) -> Self {
        ClusterCondition {
            type_,
            status,
            reason: reason.to_string(),
            message: message.to_string(),
            last_update_time: String::new(),
            last_transition_time: String::new(),
        }
    }
}

/// Membership of the cluster, split into ready and unready pod names.
/// Recomputed in full on every status pass, never patched incrementally.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MembersStatus {
    #[serde(default)]
    pub ready: Vec<String>,

    #[serde(default)]
    pub unready: Vec<String>,
}

/// Observed state of a KafkaCluster.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaClusterStatus {
    /// Members currently in the cluster.
    #[serde(default)]
    pub members: MembersStatus,

    /// Desired number of replicas.
    #[serde(default)]
    pub replicas: i32,

    /// Number of ready replicas.
    #[serde(default)]
    pub ready_replicas: i32,

    /// Internal client endpoint, `host:port`.
    #[serde(default)]
    pub internal_client_endpoint: String,

    /// External client endpoint, `host:port`.
    #[serde(default)]
    pub external_client_endpoint: String,

    /// Version the cluster is currently running. Latched from the image tag
    /// the first time the cluster becomes ready.
    #[serde(default)]
    pub current_version: String,

    /// Version the spec is asking for.
    #[serde(default)]
    pub target_version: String,

    /// All applied conditions.
    #[serde(default)]
    pub conditions: Vec<ClusterCondition>,
}

impl KafkaClusterStatus {
    /// Insert any missing condition types with status False and empty
    /// reason/message. No transition timestamp is recorded yet.
    pub fn init(&mut self) {
        for type_ in [
            ClusterConditionType::PodsReady,
            ClusterConditionType::Upgrading,
            ClusterConditionType::Error,
        ] {
            if self.condition(type_).is_none() {
                self.conditions.push(ClusterCondition::new(
                    type_,
                    ConditionStatus::False,
                    "",
                    "",
                ));
            }
        }
    }

    /// Look up a condition by type.
    pub fn condition(&self, type_: ClusterConditionType) -> Option<&ClusterCondition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn set_pods_ready(&mut self, ready: bool) {
        let status = if ready {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        };
        self.set_condition(ClusterCondition::new(
            ClusterConditionType::PodsReady,
            status,
            "",
            "",
        ));
    }

    pub fn set_upgrading(&mut self, reason: &str, message: &str) {
        self.set_condition(ClusterCondition::new(
            ClusterConditionType::Upgrading,
            ConditionStatus::True,
            reason,
            message,
        ));
    }

    pub fn clear_upgrading(&mut self) {
        self.set_condition(ClusterCondition::new(
            ClusterConditionType::Upgrading,
            ConditionStatus::False,
            "",
            "",
        ));
    }

    pub fn set_error(&mut self, reason: &str, message: &str) {
        self.set_condition(ClusterCondition::new(
            ClusterConditionType::Error,
            ConditionStatus::True,
            reason,
            message,
        ));
    }

    pub fn clear_error(&mut self) {
        self.set_condition(ClusterCondition::new(
            ClusterConditionType::Error,
            ConditionStatus::False,
            "",
            "",
        ));
    }

    /// Refresh the Upgrading condition's progress message while an upgrade
    /// is in flight. No-op otherwise.
    pub fn update_progress(&mut self, reason: &str, updated_replicas: &str) {
        if self.is_upgrading() {
            self.set_upgrading(reason, updated_replicas);
        }
    }

    /// True iff the PodsReady condition is True.
    pub fn is_ready(&self) -> bool {
        self.condition(ClusterConditionType::PodsReady)
            .map(|c| c.status == ConditionStatus::True)
            .unwrap_or(false)
    }

    /// True iff the Upgrading condition is True.
    pub fn is_upgrading(&self) -> bool {
        self.condition(ClusterConditionType::Upgrading)
            .map(|c| c.status == ConditionStatus::True)
            .unwrap_or(false)
    }

    /// True iff the Error condition is True with the upgrade-failed reason.
    pub fn is_upgrade_failed(&self) -> bool {
        self.condition(ClusterConditionType::Error)
            .map(|c| c.status == ConditionStatus::True && c.reason == UPGRADE_FAILED_REASON)
            .unwrap_or(false)
    }

    fn set_condition(&mut self, incoming: ClusterCondition) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.set_condition_at(incoming, &now);
    }

    /// Apply a condition update with an explicit timestamp.
    ///
    /// A status change refreshes both timestamps; a reason/message change
    /// alone refreshes only the update time; an identical update mutates
    /// nothing.
    pub fn set_condition_at(&mut self, incoming: ClusterCondition, now: &str) {
        let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.type_ == incoming.type_)
        else {
            self.conditions.push(incoming);
            return;
        };

        if existing.status != incoming.status {
            existing.status = incoming.status;
            existing.last_transition_time = now.to_string();
            existing.last_update_time = now.to_string();
        }

        if existing.reason != incoming.reason || existing.message != incoming.message {
            existing.reason = incoming.reason;
            existing.message = incoming.message;
            existing.last_update_time = now.to_string();
        }
    }
}
