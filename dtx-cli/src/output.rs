use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use dtx_recovery::RedoLogs;
use dtx_transaction::{DistributedTx, Participant, PreparedTx, RedoState, TransactionMetadata};
use itertools::Itertools;
use serde::Serialize;
use strum::Display;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::error::CliResult;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Renders one command's result either as a table or as pretty JSON of `value`.
pub trait Render: Serialize {
    fn header() -> Vec<String>;

    fn records(&self) -> Vec<Vec<String>>;

    fn render(&self, format: OutputFormat) -> CliResult<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Table => {
                let mut builder = Builder::new();
                builder.push_record(Self::header());
                for record in self.records() {
                    builder.push_record(record);
                }
                let mut table = builder.build();
                table.with(Style::sharp());
                Ok(table.to_string())
            }
        }
    }
}

fn instant(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn participants(participants: &[Participant]) -> String {
    participants.iter().join("\n")
}

fn header(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn redo_record(state: RedoState, tx: &PreparedTx) -> Vec<String> {
    vec![
        tx.dtid.clone(),
        state.to_string(),
        instant(&tx.time),
        tx.queries.join("\n"),
    ]
}

impl Render for RedoLogs {
    fn header() -> Vec<String> {
        header(&["dtid", "state", "time_created", "statements"])
    }

    fn records(&self) -> Vec<Vec<String>> {
        let prepared = self
            .prepared
            .iter()
            .map(|tx| redo_record(RedoState::Prepared, tx));
        let failed = self
            .failed
            .iter()
            .map(|tx| redo_record(RedoState::Failed, tx));
        prepared.chain(failed).collect()
    }
}

impl Render for Vec<DistributedTx> {
    fn header() -> Vec<String> {
        header(&["dtid", "state", "time_created", "participants"])
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.iter()
            .map(|tx| {
                vec![
                    tx.dtid.clone(),
                    tx.state.to_string(),
                    instant(&tx.created),
                    participants(&tx.participants),
                ]
            })
            .collect()
    }
}

impl Render for Vec<TransactionMetadata> {
    fn header() -> Vec<String> {
        header(&["dtid", "state", "participants"])
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.iter()
            .map(|meta| {
                vec![
                    meta.dtid.clone(),
                    meta.state.to_string(),
                    participants(&meta.participants),
                ]
            })
            .collect()
    }
}
