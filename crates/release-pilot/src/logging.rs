use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Filter for `verbose` repetitions of `-v`; `None` defers to `RUST_LOG`.
fn verbosity_filter(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        _ => Some("debug"),
    }
}

/// Installs the stderr log subscriber.
pub(crate) fn init(verbose: u8) {
    let filter = match verbosity_filter(verbose) {
        Some(level) => EnvFilter::new(level),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
