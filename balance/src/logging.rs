use std::{env, io};

use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout is reserved for the report.
/// Quiet unless `-v` was given or `RUST_LOG` is set.
pub fn init_tracing(verbosity: u8) {
    if verbosity == 0 && env::var_os("RUST_LOG").is_none() {
        return;
    }

    let level = match verbosity {
        0 | 1 => "info",
        _ => "debug",
    };

    let fallback = format!("ore_balance={level},ore_rewards={level}");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}
