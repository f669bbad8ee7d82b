use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing for the operator process.
///
/// `RUST_LOG` wins when set; otherwise the given default directive applies
/// to every target. Output is compact single-line, which suits the one
/// info-line-per-reconcile logging the controller emits.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt().with_env_filter(filter).with_target(false).compact().init();
}
