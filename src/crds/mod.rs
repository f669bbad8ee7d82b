pub mod cluster;
pub mod status;

pub use cluster::{
    ImageConfig, KafkaCluster, KafkaClusterSpec, ResolvedImage, ResourceConfig, ResourceValues,
};
pub use status::{
    ClusterCondition, ClusterConditionType, ConditionStatus, KafkaClusterStatus, MembersStatus,
    UPDATING_CLUSTER_REASON, UPGRADE_ERROR_REASON, UPGRADE_FAILED_REASON,
};
