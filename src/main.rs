use anyhow::Context;
use kube::Client;
use tracing::info;

use kafka_operator::{controllers, metrics, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info");

    let client = Client::try_default()
        .await
        .context("failed to build Kubernetes client")?;

    let metrics_addr =
        std::env::var("METRICS_ADDR").unwrap_or_else(|_| "0.0.0.0:9090".to_string());
    tokio::spawn(async move {
        if let Err(err) = metrics::serve(&metrics_addr).await {
            tracing::error!(%err, "metrics server exited");
        }
    });

    info!("kafka-operator starting");
    controllers::cluster_controller::run(client).await;
    info!("controller stream ended, shutting down");
    Ok(())
}
