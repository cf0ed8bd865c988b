use std::process::Command;

use insta_cmd::get_cargo_bin;

pub const REDO_CSV: &str = "tests/fixtures/redo.csv";
pub const TRANSACTIONS_CSV: &str = "tests/fixtures/transactions.csv";

/// `dtxctl` with a fixed help width and plain-text error reports.
pub fn run_cli() -> Command {
    let mut cmd = Command::new(get_cargo_bin("dtxctl"));
    cmd.env("COLUMNS", "100")
        .env("NO_GRAPHICS", "1")
        .env_remove("RUST_LOG");
    cmd
}

/// `dtxctl` reading the sample redo and transaction exports.
pub fn run_with_snapshots() -> Command {
    let mut cmd = run_cli();
    cmd.args(["--redo", REDO_CSV, "--transactions", TRANSACTIONS_CSV]);
    cmd
}
