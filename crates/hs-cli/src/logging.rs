use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `HS_LOG`, then `RUST_LOG`, then `warn`. Logs go to stderr so
/// stdout only carries the result protocol.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("HS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "warn".into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
