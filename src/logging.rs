// Tracing setup for binaries and tests embedding the crate

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "media_downloader=info";

/// Install a fmt subscriber filtered by `RUST_LOG`
/// (default `media_downloader=info`).
///
/// Returns `false` when a global subscriber was already set, which is
/// not an error: the first one wins.
pub fn init() -> bool {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}
