//! Logging setup
//!
//! Logs go to stderr, or to `log_file` when configured. `RUST_LOG` picks the
//! filter unless `-v` was given.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use alki_core::Config;

const DEFAULT_FILTER: &str = "alki_core=warn,alki_cli=warn";
const VERBOSE_FILTER: &str = "alki_core=debug,alki_cli=debug";
const TRACE_FILTER: &str = "alki_core=trace,alki_cli=trace";

fn env_filter(verbose: u8) -> EnvFilter {
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        1 => EnvFilter::new(VERBOSE_FILTER),
        _ => EnvFilter::new(TRACE_FILTER),
    }
}

/// Install the global subscriber (ignored if one is already set)
pub fn init(config: &Config, verbose: u8) {
    if let Some(ref path) = config.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(env_filter(verbose))
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                debug!("Logging to {:?}", path);
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

