use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Picks the `RUST_LOG` directive, falling back to `info` when unset or blank.
fn log_directive(raw: Option<&str>) -> &str {
    raw.map(str::trim)
        .filter(|directive| !directive.is_empty())
        .unwrap_or(DEFAULT_LOG_DIRECTIVE)
}

/// Installs compact stderr logging. An unparsable `RUST_LOG` falls back to `info`.
pub(crate) fn init_tracing() {
    let raw = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = EnvFilter::try_new(log_directive(raw.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
