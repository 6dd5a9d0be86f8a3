//! Remote control for Naim Uniti devices over their local HTTP control API,
//! with optional dispatch through an MQTT broker to a worker process.

pub mod config;
pub mod device;
pub mod dispatch;
pub mod mqtt;
pub mod worker;

/// Log to stderr, filtered by `RUST_LOG` or `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}
