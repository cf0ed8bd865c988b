//! `dtxctl`: offline inspection of 2PC recovery state.
//!
//! Loads CSV exports of the redo and distributed-transaction tables and runs the recovery reads
//! against them, so an operator can see what a coordinator would recover without touching a
//! live shard.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod error;
mod output;
mod store;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use store::SnapshotStore;

/// Logs to stderr, filtered by `RUST_LOG` and defaulting to warnings.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}
