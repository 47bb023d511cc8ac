use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "pawhub=info";

/// Sends `tracing` output to `log_file`; the terminal belongs to the UI.
///
/// `RUST_LOG` overrides the default filter. Returns `Ok(false)` when a global
/// subscriber was already installed, which leaves the existing one in place.
pub fn init_logging(log_file: &Path) -> io::Result<bool> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .is_ok())
}
