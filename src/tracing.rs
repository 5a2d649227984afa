use tracing_subscriber::{fmt, EnvFilter};

use crate::util::env::env_flag;

/// Install the process-wide subscriber for the ingest binary.
///
/// `RUST_LOG` wins over `default_filter`. `LOG_ANSI=0` turns colours off for
/// log collectors, and `LOG_SOURCE=1` adds file and line to every event.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| anyhow::anyhow!("invalid log filter {default_filter:?}: {e}"))?;
    let with_source = env_flag("LOG_SOURCE", false);

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(env_flag("LOG_ANSI", true))
        .with_file(with_source)
        .with_line_number(with_source)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}
