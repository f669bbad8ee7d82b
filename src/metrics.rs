use std::sync::LazyLock;

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{error, info};

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "kafka_operator_reconciliations_total",
        "Reconciliation attempts, partitioned by outcome",
        &["outcome"]
    )
    .unwrap()
});

static RECONCILE_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "kafka_operator_reconcile_errors_total",
        "Reconciliations that ended in an error"
    )
    .unwrap()
});

static RECONCILE_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "kafka_operator_reconcile_duration_seconds",
        "Wall-clock time spent in a single reconcile pass",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

pub fn record_reconciliation(outcome: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
    if outcome == "error" {
        RECONCILE_ERRORS_TOTAL.inc();
    }
}

pub fn observe_reconcile_duration(seconds: f64) {
    RECONCILE_DURATION_SECONDS.observe(seconds);
}

/// Render all registered metrics in the Prometheus text format.
pub fn encode() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(%err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Serve `/metrics` and `/healthz` over plain HTTP for the lifetime of the
/// process.
pub async fn serve(addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "metrics endpoint listening");

    loop {
        let (mut socket, _) = listener.accept().await?;
        tokio::spawn(async move {
            let mut request = [0u8; 1024];
            let read = match socket.read(&mut request).await {
                Ok(n) => n,
                Err(_) => return,
            };
            let request_line = String::from_utf8_lossy(&request[..read]);

            let body = if request_line.starts_with("GET /healthz") {
                "ok\n".to_string()
            } else {
                encode()
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            if let Err(err) = socket.write_all(response.as_bytes()).await {
                error!(%err, "failed to write metrics response");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_encode() {
        record_reconciliation("apply");
        record_reconciliation("error");
        observe_reconcile_duration(0.2);

        let output = encode();
        assert!(output.contains("kafka_operator_reconciliations_total"));
        assert!(output.contains("kafka_operator_reconcile_errors_total"));
        assert!(output.contains("kafka_operator_reconcile_duration_seconds"));
    }
}
