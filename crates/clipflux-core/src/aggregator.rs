use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::frame::{float_column, format_date, parse_date, require_columns, string_column};
use crate::schema::{self, ISO_DATE_FORMAT};

const STAGE: &str = "aggregate";

/// Relative slack allowed between the summed differences and the difference of sums.
const INVARIANT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct DayTotals {
    without: f64,
    with: f64,
    difference: f64,
    rows: usize,
}

impl DayTotals {
    fn add(&mut self, without: Option<f64>, with: Option<f64>, difference: Option<f64>) {
        self.without += without.unwrap_or(0.0);
        self.with += with.unwrap_or(0.0);
        self.difference += difference.unwrap_or(0.0);
        self.rows += 1;
    }

    fn check(&self, day: NaiveDate) -> Result<()> {
        let expected = self.without - self.with;
        let scale = self.without.abs().max(self.with.abs()).max(1.0);
        if (self.difference - expected).abs() > INVARIANT_TOLERANCE * scale {
            return Err(PipelineError::Invariant {
                day,
                without: self.without,
                with: self.with,
                difference: self.difference,
            });
        }
        Ok(())
    }
}

/// Groups the loss table by `date` and sums each loss column independently.
///
/// Output is one row per day, sorted ascending, with columns
/// `day, loss_without_clipping_total, loss_with_clipping_total, loss_difference_total`.
/// Null losses contribute nothing to a day's totals.
pub fn aggregate_daily(losses: &DataFrame) -> Result<DataFrame> {
    require_columns(
        losses,
        STAGE,
        &[
            schema::DATE,
            schema::LOSS_WITHOUT_CLIPPING,
            schema::LOSS_WITH_CLIPPING,
            schema::LOSS_DIFFERENCE,
        ],
    )?;

    let date = string_column(losses, schema::DATE)?;
    let without = float_column(losses, schema::LOSS_WITHOUT_CLIPPING)?;
    let with = float_column(losses, schema::LOSS_WITH_CLIPPING)?;
    let difference = float_column(losses, schema::LOSS_DIFFERENCE)?;

    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for idx in 0..losses.height() {
        let day = parse_date(STAGE, schema::DATE, idx, date.get(idx), ISO_DATE_FORMAT)?;
        days.entry(day).or_default().add(
            without.get(idx),
            with.get(idx),
            difference.get(idx),
        );
    }

    let mut labels = Vec::with_capacity(days.len());
    let mut without_totals = Vec::with_capacity(days.len());
    let mut with_totals = Vec::with_capacity(days.len());
    let mut difference_totals = Vec::with_capacity(days.len());

    for (day, totals) in &days {
        totals.check(*day)?;
        debug!(day = %day, rows = totals.rows, "aggregated day");
        labels.push(format_date(*day, ISO_DATE_FORMAT));
        without_totals.push(totals.without);
        with_totals.push(totals.with);
        difference_totals.push(totals.difference);
    }

    let daily = DataFrame::new(vec![
        Series::new(schema::DAY.into(), labels).into(),
        Series::new(schema::LOSS_WITHOUT_CLIPPING_TOTAL.into(), without_totals).into(),
        Series::new(schema::LOSS_WITH_CLIPPING_TOTAL.into(), with_totals).into(),
        Series::new(schema::LOSS_DIFFERENCE_TOTAL.into(), difference_totals).into(),
    ])?;

    Ok(daily)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inconsistent_difference_is_rejected() {
        let df = df!(
            schema::DATE => &["2023-01-01"],
            schema::LOSS_WITHOUT_CLIPPING => &[1.0f64],
            schema::LOSS_WITH_CLIPPING => &[0.25f64],
            schema::LOSS_DIFFERENCE => &[0.5f64],
        )
        .unwrap();
        assert!(matches!(
            aggregate_daily(&df),
            Err(PipelineError::Invariant { .. })
        ));
    }

    #[test]
    fn days_come_out_sorted() {
        let df = df!(
            schema::DATE => &["2023-01-03", "2023-01-01", "2023-01-03"],
            schema::LOSS_WITHOUT_CLIPPING => &[1.0f64, 2.0, 3.0],
            schema::LOSS_WITH_CLIPPING => &[0.0f64, 0.0, 1.0],
            schema::LOSS_DIFFERENCE => &[1.0f64, 2.0, 2.0],
        )
        .unwrap();
        let daily = aggregate_daily(&df).unwrap();
        let days = daily.column(schema::DAY).unwrap().str().unwrap();
        assert_eq!(days.get(0), Some("2023-01-01"));
        assert_eq!(days.get(1), Some("2023-01-03"));

        let without = daily
            .column(schema::LOSS_WITHOUT_CLIPPING_TOTAL)
            .unwrap()
            .f64()
            .unwrap();
        assert_eq!(without.get(1), Some(4.0));
    }
}
