pub mod common;
pub mod configmap_builder;
pub mod service_builder;
pub mod statefulset_builder;
