use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the stderr log subscriber. `RUST_LOG` wins over `level`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init()
        .ok();
}

/// Default filter for the binary: quiet unless `--verbose`.
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "risk_score=debug,info"
    } else {
        "warn"
    }
}
