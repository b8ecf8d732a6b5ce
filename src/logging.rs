//! Subscriber setup for hosts and tools embedding the node.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `houdini_asset_node=debug`.
pub const LOG_ENV: &str = "HOUDINI_ASSET_LOG";

/// Install a fmt subscriber filtered by [`LOG_ENV`], `warn` when unset.
///
/// Returns false if a global subscriber was already installed.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
