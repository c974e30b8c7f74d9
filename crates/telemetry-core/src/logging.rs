//! Logging setup for host processes

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Environment variable controlling the log filter, e.g.
/// `TELEMETRY_LOG=telemetry_core=debug`.
pub const LOG_ENV_VAR: &str = "TELEMETRY_LOG";

/// Install the global tracing subscriber: compact stderr output, INFO by
/// default, filter overridable through [`LOG_ENV_VAR`].
///
/// Host processes that install their own subscriber skip this.
pub fn init() {
    let env_filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(fmt_layer).init();
}
