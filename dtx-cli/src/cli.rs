use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use dtx_common::time::instant_from_micros;
use dtx_recovery::queries::Queries;
use dtx_recovery::{Consistency, Context, Grouping, RecoveryConfig, TwoPc};
use miette::Result;

use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, Render};
use crate::store::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupingArg {
    Consecutive,
    Merged,
}

impl From<GroupingArg> for Grouping {
    fn from(arg: GroupingArg) -> Self {
        match arg {
            GroupingArg::Consecutive => Grouping::Consecutive,
            GroupingArg::Merged => Grouping::Merged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConsistencyArg {
    Strict,
    Permissive,
}

impl From<ConsistencyArg> for Consistency {
    fn from(arg: ConsistencyArg) -> Self {
        match arg {
            ConsistencyArg::Strict => Consistency::Strict,
            ConsistencyArg::Permissive => Consistency::Permissive,
        }
    }
}

/// Inspect the 2PC recovery state held in CSV exports of the sidecar tables.
#[derive(Debug, Parser)]
#[command(name = "dtxctl", version)]
pub struct Cli {
    /// Export of the redo tables.
    #[arg(long, global = true, value_name = "CSV")]
    redo: Option<PathBuf>,

    /// Export of the distributed transaction tables.
    #[arg(long, global = true, value_name = "CSV")]
    transactions: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[arg(long, global = true, value_enum, default_value = "consecutive")]
    grouping: GroupingArg,

    #[arg(long, global = true, value_enum, default_value = "strict")]
    consistency: ConsistencyArg,

    /// Largest number of rows a single read may return.
    #[arg(long, global = true)]
    max_rows: Option<usize>,

    /// Database the exported tables were read from.
    #[arg(long, global = true, value_name = "DB")]
    sidecar_db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List redo logs, prepared first, then failed.
    Redo,
    /// List distributed transactions and their participants.
    Transactions,
    /// List transactions created before a threshold, as sent to a resolver.
    Unresolved {
        /// Threshold in microseconds since the Unix epoch.
        #[arg(long)]
        older_than: i64,
    },
    /// Show one distributed transaction.
    Show {
        dtid: String,
        /// Print the form sent to a resolver instead.
        #[arg(long)]
        metadata: bool,
    },
    /// Count prepared redo logs created before a threshold.
    CountRedo {
        /// Threshold in microseconds since the Unix epoch.
        #[arg(long)]
        older_than: i64,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let output = self.execute()?;
        println!("{output}");
        Ok(())
    }

    fn config(&self) -> RecoveryConfig {
        let mut config = RecoveryConfig::default()
            .with_grouping(self.grouping.into())
            .with_consistency(self.consistency.into());
        if let Some(max_rows) = self.max_rows {
            config = config.with_max_rows(max_rows);
        }
        if let Some(sidecar_db) = &self.sidecar_db {
            config = config.with_sidecar_db(sidecar_db);
        }
        config
    }

    fn require(&self, store: &SnapshotStore) -> CliResult<()> {
        match self.command {
            Command::Redo | Command::CountRedo { .. } if !store.has_redo() => {
                Err(CliError::MissingSnapshot { flag: "--redo" })
            }
            Command::Transactions | Command::Unresolved { .. } | Command::Show { .. }
                if !store.has_transactions() =>
            {
                Err(CliError::MissingSnapshot {
                    flag: "--transactions",
                })
            }
            _ => Ok(()),
        }
    }

    fn execute(&self) -> CliResult<String> {
        let config = self.config();
        let store = SnapshotStore::load(
            self.redo.as_deref(),
            self.transactions.as_deref(),
            Queries::new(&config.sidecar_db),
        )?;
        self.require(&store)?;
        let twopc = TwoPc::new(Arc::new(store), config);
        let ctx = Context::background();

        match &self.command {
            Command::Redo => twopc.read_all_redo(&ctx)?.render(self.format),
            Command::Transactions => twopc.read_all_transactions(&ctx)?.render(self.format),
            Command::Unresolved { older_than } => {
                let threshold = threshold(*older_than)?;
                twopc
                    .unresolved_transactions(&ctx, threshold)?
                    .render(self.format)
            }
            Command::Show { dtid, metadata } => match twopc.read_transaction(&ctx, dtid)? {
                Some(tx) if *metadata => vec![tx.to_metadata()].render(self.format),
                Some(tx) => vec![tx].render(self.format),
                None => Ok(format!("no distributed transaction {dtid}")),
            },
            Command::CountRedo { older_than } => {
                let threshold = threshold(*older_than)?;
                let count = twopc.count_unresolved_redo(&ctx, threshold)?;
                match self.format {
                    OutputFormat::Table => Ok(count.to_string()),
                    OutputFormat::Json => Ok(serde_json::json!({ "count": count }).to_string()),
                }
            }
        }
    }
}

fn threshold(micros: i64) -> CliResult<chrono::DateTime<chrono::Utc>> {
    instant_from_micros("--older-than", micros).map_err(CliError::Threshold)
}
