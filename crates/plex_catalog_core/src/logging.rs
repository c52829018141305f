use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr so tables and summaries
/// on stdout stay clean.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` and
/// `default_level` applies.
pub fn init_logging(verbose: bool, default_level: &str) {
    let level = if verbose { "debug" } else { default_level };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
