// crates/clipflux-core/src/error.rs

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage}: could not parse {column} at row {row}: {message}")]
    Parse {
        stage: &'static str,
        column: &'static str,
        row: usize,
        message: String,
    },

    #[error("{stage}: required column '{column}' is missing")]
    Schema {
        stage: &'static str,
        column: &'static str,
    },

    #[error("'{file}' not found in {}; run '{hint}' first", .root.display())]
    InputMissing {
        file: &'static str,
        root: PathBuf,
        hint: &'static str,
    },

    #[error("daily totals for {day} are inconsistent: difference {difference} != {without} - {with}")]
    Invariant {
        day: NaiveDate,
        without: f64,
        with: f64,
        difference: f64,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PipelineError {
    pub(crate) fn parse(
        stage: &'static str,
        column: &'static str,
        row: usize,
        message: impl Into<String>,
    ) -> Self {
        PipelineError::Parse {
            stage,
            column,
            row,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
