use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise the tracing subscriber once per process.
///
/// `RUST_LOG` wins when set; otherwise the verbosity flag picks the
/// default filter for this binary's own events.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let default_filter = if verbose { "lapse=debug" } else { "lapse=info" };
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    });
}
