use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber writing to stderr, filtered by `RUST_LOG`
/// or, failing that, `level`.
///
/// Stdout stays free for the fetched body and JSON reports.
pub fn setup_logging(level: Option<&str>) {
    let default = level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();

    if installed.is_ok() {
        debug!("logging initialized with log level: {:?}", level);
    }
}
