//! Read-side views over the analysed and calculated tables: typed daily rows,
//! month selection and the per-interval energy curve of a single day.

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::frame::{float_column, parse_date, require_columns, string_column};
use crate::schema::{self, ISO_DATE_FORMAT};

const STAGE: &str = "report";
const MONTH_FORMAT: &str = "%B %Y";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub day: NaiveDate,
    pub loss_without_clipping_total: f64,
    pub loss_with_clipping_total: f64,
    pub loss_difference_total: f64,
}

impl DailyAggregate {
    /// Label such as `January 2023`.
    pub fn month(&self) -> String {
        self.day.format(MONTH_FORMAT).to_string()
    }
}

pub fn daily_aggregates(daily: &DataFrame) -> Result<Vec<DailyAggregate>> {
    require_columns(daily, STAGE, &schema::ANALYSED_COLUMNS)?;

    let day = string_column(daily, schema::DAY)?;
    let without = float_column(daily, schema::LOSS_WITHOUT_CLIPPING_TOTAL)?;
    let with = float_column(daily, schema::LOSS_WITH_CLIPPING_TOTAL)?;
    let difference = float_column(daily, schema::LOSS_DIFFERENCE_TOTAL)?;

    (0..daily.height())
        .map(|idx| {
            Ok(DailyAggregate {
                day: parse_date(STAGE, schema::DAY, idx, day.get(idx), ISO_DATE_FORMAT)?,
                loss_without_clipping_total: total(
                    schema::LOSS_WITHOUT_CLIPPING_TOTAL,
                    idx,
                    without.get(idx),
                )?,
                loss_with_clipping_total: total(
                    schema::LOSS_WITH_CLIPPING_TOTAL,
                    idx,
                    with.get(idx),
                )?,
                loss_difference_total: total(
                    schema::LOSS_DIFFERENCE_TOTAL,
                    idx,
                    difference.get(idx),
                )?,
            })
        })
        .collect()
}

/// Aggregated totals are never null; a missing one means the table was edited or truncated.
fn total(column: &'static str, row: usize, value: Option<f64>) -> Result<f64> {
    value.ok_or_else(|| PipelineError::parse(STAGE, column, row, "daily total is missing"))
}

/// Distinct month labels in first-seen order.
pub fn months(rows: &[DailyAggregate]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for row in rows {
        let label = row.month();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

pub fn filter_month(rows: &[DailyAggregate], month: &str) -> Vec<DailyAggregate> {
    rows.iter()
        .filter(|row| row.month().eq_ignore_ascii_case(month.trim()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    pub time_interval: String,
    pub energy: Option<f64>,
    pub incremented_energy: Option<f64>,
    pub clipping_line: f64,
}

/// Intraday energy and projected energy for `day`, with the clipping threshold
/// repeated at each interval for plotting.
pub fn day_curve(
    calculated: &DataFrame,
    day: NaiveDate,
    threshold: f64,
) -> Result<Vec<CurvePoint>> {
    require_columns(
        calculated,
        STAGE,
        &[
            schema::DATE,
            schema::TIME_INTERVAL,
            schema::ENERGY,
            schema::INCREMENTED_ENERGY,
        ],
    )?;

    let date = string_column(calculated, schema::DATE)?;
    let interval = string_column(calculated, schema::TIME_INTERVAL)?;
    let energy = float_column(calculated, schema::ENERGY)?;
    let incremented = float_column(calculated, schema::INCREMENTED_ENERGY)?;

    let mut points = Vec::new();
    for idx in 0..calculated.height() {
        if parse_date(STAGE, schema::DATE, idx, date.get(idx), ISO_DATE_FORMAT)? != day {
            continue;
        }
        points.push(CurvePoint {
            time_interval: interval.get(idx).unwrap_or_default().to_string(),
            energy: energy.get(idx),
            incremented_energy: incremented.get(idx),
            clipping_line: threshold,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(y: i32, m: u32, d: u32) -> DailyAggregate {
        DailyAggregate {
            day: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            loss_without_clipping_total: 1.0,
            loss_with_clipping_total: 0.5,
            loss_difference_total: 0.5,
        }
    }

    #[test]
    fn missing_total_is_a_parse_error() {
        let daily = polars::df!(
            "day" => &["2023-01-01", "2023-01-02"],
            "loss_without_clipping_total" => &[Some(1.0f64), Some(2.0)],
            "loss_with_clipping_total" => &[Some(0.5f64), None],
            "loss_difference_total" => &[Some(0.5f64), Some(2.0)],
        )
        .unwrap();

        match daily_aggregates(&daily) {
            Err(PipelineError::Parse { column, row, .. }) => {
                assert_eq!(column, "loss_with_clipping_total");
                assert_eq!(row, 1);
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn months_are_distinct_and_ordered() {
        let rows = vec![row(2023, 1, 30), row(2023, 1, 31), row(2023, 2, 1)];
        assert_eq!(months(&rows), vec!["January 2023", "February 2023"]);
        assert_eq!(filter_month(&rows, "february 2023").len(), 1);
    }
}
