use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Fails with a schema error naming the first column `df` lacks.
pub fn require_columns(df: &DataFrame, stage: &'static str, columns: &[&'static str]) -> Result<()> {
    match columns.iter().copied().find(|name| df.column(name).is_err()) {
        Some(column) => Err(PipelineError::Schema { stage, column }),
        None => Ok(()),
    }
}

/// Reads a column as `f64`, casting when the CSV reader inferred another type.
/// Cells that do not convert become null.
pub fn float_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.clone())
}

pub fn string_column(df: &DataFrame, name: &str) -> Result<StringChunked> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.clone())
}

pub fn parse_date(
    stage: &'static str,
    column: &'static str,
    row: usize,
    text: Option<&str>,
    format: &str,
) -> Result<NaiveDate> {
    let text = text.ok_or_else(|| PipelineError::parse(stage, column, row, "value is missing"))?;
    NaiveDate::parse_from_str(text.trim(), format).map_err(|err| {
        PipelineError::parse(
            stage,
            column,
            row,
            format!("'{text}' does not match {format}: {err}"),
        )
    })
}

pub fn format_date(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}
