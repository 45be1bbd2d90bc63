use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Installs the global subscriber: formatted output filtered by `RUST_LOG`,
/// `info` when unset.
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    tracing::subscriber::set_global_default(subscriber)
}
