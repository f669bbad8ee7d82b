//! Print the KafkaCluster CRD manifest as YAML, for installation via
//! `kubectl apply -f`.

use kube::CustomResourceExt;

use kafka_operator::crds::KafkaCluster;

fn main() -> anyhow::Result<()> {
    let crd = KafkaCluster::crd();
    println!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
