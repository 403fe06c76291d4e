use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::frame::{float_column, format_date, require_columns, string_column};
use crate::schema::{self, CLEANED_DATE_FORMAT, RAW_POWER, RAW_TIME};

const STAGE: &str = "reshape";

#[derive(Debug, Clone)]
pub struct ReshapeOptions {
    /// Hours covered by one reading; energy is `power * interval_hours`.
    pub interval_hours: f64,
    /// Layouts tried, in order, on the date half of `Time`.
    pub raw_date_formats: Vec<String>,
}

impl Default for ReshapeOptions {
    fn default() -> Self {
        Self {
            interval_hours: 0.25,
            raw_date_formats: schema::default_raw_date_formats(),
        }
    }
}

/// Turns the raw `Time`/`power` table into the cleaned table
/// (`date, time_interval, power, energy`).
///
/// Rows with a missing cell in any column are dropped, as are rows with negative
/// power. A `Time` value that cannot be split into date and interval, or whose
/// date does not parse, fails the whole stage.
pub fn reshape(raw: &DataFrame, options: &ReshapeOptions) -> Result<DataFrame> {
    let raw = with_power_column(raw)?;
    require_columns(&raw, STAGE, &schema::RAW_COLUMNS)?;

    let len = raw.height();
    let time = string_column(&raw, RAW_TIME)?;
    let power = float_column(&raw, RAW_POWER)?;

    let mut incomplete = vec![false; len];
    for column in raw.get_columns() {
        let nulls = column.is_null();
        for (idx, flag) in incomplete.iter_mut().enumerate() {
            if nulls.get(idx).unwrap_or(true) {
                *flag = true;
            }
        }
    }

    let mut dates = Vec::with_capacity(len);
    let mut intervals = Vec::with_capacity(len);
    let mut powers = Vec::with_capacity(len);
    let mut energies = Vec::with_capacity(len);
    let mut negative = 0usize;

    for (idx, &skip) in incomplete.iter().enumerate() {
        if skip {
            continue;
        }
        let (Some(stamp), Some(power_mw)) = (time.get(idx), power.get(idx)) else {
            continue;
        };
        if stamp.trim().is_empty() || power_mw.is_nan() {
            continue;
        }

        let (date, interval) = split_timestamp(stamp, idx, &options.raw_date_formats)?;

        if power_mw < 0.0 {
            negative += 1;
            continue;
        }

        dates.push(format_date(date, CLEANED_DATE_FORMAT));
        intervals.push(interval.to_string());
        powers.push(power_mw);
        energies.push(power_mw * options.interval_hours);
    }

    debug!(
        incomplete = incomplete.iter().filter(|flag| **flag).count(),
        negative, "dropped raw rows"
    );

    let cleaned = DataFrame::new(vec![
        Series::new(schema::DATE.into(), dates).into(),
        Series::new(schema::TIME_INTERVAL.into(), intervals).into(),
        Series::new(schema::POWER.into(), powers).into(),
        Series::new(schema::ENERGY.into(), energies).into(),
    ])?;

    Ok(cleaned)
}

/// Spreadsheet exports carry the reading in the second column under their own header;
/// that column becomes `power` when the table has no `power` column.
fn with_power_column(raw: &DataFrame) -> Result<DataFrame> {
    let mut frame = raw.clone();
    if frame.column(RAW_POWER).is_ok() || frame.width() < 2 {
        return Ok(frame);
    }

    let second = frame.get_columns()[1].name().to_string();
    if second == RAW_TIME {
        return Ok(frame);
    }

    debug!(column = %second, "treating second column as power");
    frame.rename(&second, RAW_POWER.into())?;
    Ok(frame)
}

fn split_timestamp<'a>(
    stamp: &'a str,
    row: usize,
    formats: &[String],
) -> Result<(NaiveDate, &'a str)> {
    let (date_text, interval) = stamp.trim().split_once(' ').ok_or_else(|| {
        PipelineError::parse(
            STAGE,
            RAW_TIME,
            row,
            format!("'{stamp}' is not of the form 'date time'"),
        )
    })?;

    let date = formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_text, format).ok())
        .ok_or_else(|| {
            PipelineError::parse(
                STAGE,
                RAW_TIME,
                row,
                format!("'{date_text}' matches none of {}", formats.join(", ")),
            )
        })?;

    Ok((date, interval.trim()))
}
