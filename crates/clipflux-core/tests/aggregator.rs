use clipflux_core::{aggregate_daily, schema};
use polars::prelude::*;

fn losses(dates: &[&str], without: &[f64], with: &[f64]) -> DataFrame {
    let difference: Vec<f64> = without.iter().zip(with).map(|(a, b)| a - b).collect();
    df!(
        schema::DATE => dates,
        schema::LOSS_WITHOUT_CLIPPING => without,
        schema::LOSS_WITH_CLIPPING => with,
        schema::LOSS_DIFFERENCE => difference,
    )
    .unwrap()
}

fn totals(daily: &DataFrame, column: &str) -> Vec<f64> {
    daily
        .column(column)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}

#[test]
fn sums_each_day_independently() -> PolarsResult<()> {
    let df = losses(
        &["2023-01-01", "2023-01-01", "2023-01-01", "2023-01-02"],
        &[0.5, 0.25, 1.0, 2.0],
        &[0.0, 0.125, 0.5, 1.5],
    );
    let daily = aggregate_daily(&df).expect("aggregated");

    assert_eq!(daily.height(), 2);
    assert_eq!(totals(&daily, schema::LOSS_WITHOUT_CLIPPING_TOTAL), vec![1.75, 2.0]);
    assert_eq!(totals(&daily, schema::LOSS_WITH_CLIPPING_TOTAL), vec![0.625, 1.5]);
    assert_eq!(totals(&daily, schema::LOSS_DIFFERENCE_TOTAL), vec![1.125, 0.5]);
    Ok(())
}

#[test]
fn row_order_does_not_change_totals() {
    let forward = losses(
        &["2023-01-01", "2023-01-02", "2023-01-01"],
        &[0.5, 2.0, 1.5],
        &[0.25, 1.0, 0.0],
    );
    let reversed = losses(
        &["2023-01-01", "2023-01-02", "2023-01-01"].iter().rev().copied().collect::<Vec<_>>(),
        &[1.5, 2.0, 0.5],
        &[0.0, 1.0, 0.25],
    );

    let a = aggregate_daily(&forward).expect("aggregated");
    let b = aggregate_daily(&reversed).expect("aggregated");
    for column in schema::ANALYSED_COLUMNS.iter().skip(1) {
        assert_eq!(totals(&a, column), totals(&b, column));
    }
}

#[test]
fn empty_input_gives_empty_output_with_schema() {
    let df = losses(&[], &[], &[]);
    let daily = aggregate_daily(&df).expect("aggregated");

    assert_eq!(daily.height(), 0);
    let names: Vec<String> = daily
        .get_columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, schema::ANALYSED_COLUMNS);
}

#[test]
fn unparseable_day_is_a_parse_error() {
    let df = losses(&["01/01/2023"], &[1.0], &[0.0]);
    assert!(matches!(
        aggregate_daily(&df),
        Err(clipflux_core::PipelineError::Parse { .. })
    ));
}
