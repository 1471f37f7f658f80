use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level implied by `-v`/`-q` when `RUST_LOG` is not set.
pub fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug,asmdb_core=debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the flags.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}
