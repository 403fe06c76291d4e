use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::frame::{float_column, format_date, parse_date, require_columns, string_column};
use crate::schema::{self, CLEANED_DATE_FORMAT, ISO_DATE_FORMAT};

const STAGE: &str = "project";

pub const DEFAULT_CAPACITY_BASIS: f64 = 140.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParams {
    pub increment_pct: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Denominator of the increment ratio.
    pub capacity_basis: f64,
}

impl ProjectionParams {
    pub fn new(increment_pct: i32, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            increment_pct,
            start_date,
            end_date,
            capacity_basis: DEFAULT_CAPACITY_BASIS,
        }
    }

    pub fn with_capacity_basis(mut self, capacity_basis: f64) -> Self {
        self.capacity_basis = capacity_basis;
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn incremented(&self, energy: f64) -> f64 {
        energy * (self.capacity_basis + f64::from(self.increment_pct)) / self.capacity_basis
    }
}

/// Parses an operator-supplied range bound in the `dd-mm-yyyy` layout.
pub fn parse_range_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), CLEANED_DATE_FORMAT).map_err(|err| {
        PipelineError::Config(format!("range date '{text}' is not dd-mm-yyyy: {err}"))
    })
}

/// Keeps cleaned rows dated inside the inclusive range and appends
/// `incremented_energy`. An empty range yields an empty table.
pub fn project(cleaned: &DataFrame, params: &ProjectionParams) -> Result<DataFrame> {
    require_columns(cleaned, STAGE, &schema::CLEANED_COLUMNS)?;

    let len = cleaned.height();
    let date = string_column(cleaned, schema::DATE)?;
    let interval = string_column(cleaned, schema::TIME_INTERVAL)?;
    let power = float_column(cleaned, schema::POWER)?;
    let energy = float_column(cleaned, schema::ENERGY)?;

    let mut dates = Vec::new();
    let mut intervals: Vec<Option<&str>> = Vec::new();
    let mut powers = Vec::new();
    let mut energies = Vec::new();
    let mut incremented = Vec::new();

    for idx in 0..len {
        let day = parse_date(STAGE, schema::DATE, idx, date.get(idx), CLEANED_DATE_FORMAT)?;
        if !params.contains(day) {
            continue;
        }

        let energy_mwh = energy.get(idx);
        dates.push(format_date(day, ISO_DATE_FORMAT));
        intervals.push(interval.get(idx));
        powers.push(power.get(idx));
        energies.push(energy_mwh);
        incremented.push(energy_mwh.map(|value| params.incremented(value)));
    }

    if params.start_date > params.end_date {
        debug!(
            start = %params.start_date,
            end = %params.end_date,
            "projection range is inverted; no rows kept"
        );
    }

    let projected = DataFrame::new(vec![
        Series::new(schema::DATE.into(), dates).into(),
        Series::new(schema::TIME_INTERVAL.into(), intervals).into(),
        Series::new(schema::POWER.into(), powers).into(),
        Series::new(schema::ENERGY.into(), energies).into(),
        Series::new(schema::INCREMENTED_ENERGY.into(), incremented).into(),
    ])?;

    Ok(projected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn incremented_matches_ratio() {
        let params = ProjectionParams::new(10, day(1), day(1));
        assert!((params.incremented(10.0) - 10.0 * 150.0 / 140.0).abs() < 1e-12);
        assert_eq!(ProjectionParams::new(0, day(1), day(1)).incremented(7.25), 7.25);
    }

    #[test]
    fn custom_capacity_basis() {
        let params = ProjectionParams::new(50, day(1), day(1)).with_capacity_basis(100.0);
        assert!((params.incremented(2.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn range_dates_use_day_first_layout() {
        assert_eq!(parse_range_date("05-01-2023").unwrap(), day(5));
        assert!(parse_range_date("2023-01-05").is_err());
    }

    fn cleaned(date: &str) -> DataFrame {
        df!(
            "date" => &[date],
            "time_interval" => &["00:15"],
            "power" => &[40.0f64],
            "energy" => &[10.0f64],
        )
        .unwrap()
    }

    #[test]
    fn cleaned_date_in_another_layout_is_a_parse_error() {
        let params = ProjectionParams::new(10, day(1), day(31));
        for date in ["2023-01-01", "garbage"] {
            match project(&cleaned(date), &params) {
                Err(PipelineError::Parse { column, row, .. }) => {
                    assert_eq!(column, "date");
                    assert_eq!(row, 0);
                }
                other => panic!("expected Parse for {date}, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_cleaned_column_is_a_schema_error() {
        let params = ProjectionParams::new(10, day(1), day(31));
        let without_energy = cleaned("01-01-2023").drop("energy").unwrap();
        assert!(matches!(
            project(&without_energy, &params),
            Err(PipelineError::Schema {
                column: "energy",
                ..
            })
        ));
    }

    #[test]
    fn range_check_is_inclusive() {
        let params = ProjectionParams::new(0, day(2), day(4));
        assert!(!params.contains(day(1)));
        assert!(params.contains(day(2)));
        assert!(params.contains(day(4)));
        assert!(!params.contains(day(5)));
    }
}
