use std::path::PathBuf;

use dtx_common::error::DecodeError;
use dtx_recovery::RecoveryError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read snapshot {}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("command needs the {flag} snapshot")]
    #[diagnostic(help("pass {flag} <csv>"))]
    MissingSnapshot { flag: &'static str },

    #[error("invalid threshold")]
    Threshold(
        #[source]
        #[diagnostic_source]
        DecodeError,
    ),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Recovery(#[from] RecoveryError),

    #[error("failed to encode output")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
