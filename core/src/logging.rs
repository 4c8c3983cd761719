//! Diagnostic logging. Goes to stderr so stdout keeps only status lines
//! and payload.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Variable holding the log filter, e.g. `SCRIPTKIT_LOG=scriptkit_core=debug`.
pub const LOG_ENV: &str = "SCRIPTKIT_LOG";

pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (e.g. the launcher embedding a script) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
