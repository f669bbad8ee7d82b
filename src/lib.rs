//! Kubernetes operator for managed Kafka clusters.
//!
//! The operator watches `KafkaCluster` custom resources and converges each
//! one into a ConfigMap of broker configuration, a StatefulSet of brokers,
//! and a pair of client/headless Services, then reflects the observed pod
//! state back into the resource status.

pub mod config_generator;
pub mod constants;
pub mod controllers;
pub mod crds;
pub mod error;
pub mod metrics;
pub mod resources;
pub mod telemetry;
