use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_DIRECTIVE: &str = "omnibus=warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default level;
/// output goes to stderr so it never interleaves with build output.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
