use std::fs;

use anyhow::Result;
use chrono::NaiveDate;
use clipflux_core::{
    report, schema, AnalysisConfig, Artifact, Pipeline, PipelineError, Storage,
};

const RAW_EXPORT: &str = "\
Time,Active Power MW
01-01-2023 00:00,40
01-01-2023 00:15,
01-01-2023 00:30,-2
02-01-2023 00:00,120
03-01-2023 00:00,12
";

fn pipeline_for(storage: &Storage) -> Pipeline {
    Pipeline::new(AnalysisConfig {
        storage_root: storage.root().to_path_buf(),
        ..AnalysisConfig::default()
    })
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn steps_chain_through_csv_artifacts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("export.csv");
    fs::write(&source, RAW_EXPORT)?;

    let storage = Storage::new(dir.path().join("assets"));
    storage.import_raw(&source)?;
    let pipeline = pipeline_for(&storage);

    let cleaned = pipeline.clean(&storage)?;
    assert_eq!(cleaned.height(), 3);

    let params = pipeline.projection(10, date(2023, 1, 1), date(2023, 1, 2));
    let projected = pipeline.calculate(&storage, &params)?;
    assert_eq!(projected.height(), 2);

    let analysis = pipeline.analyse(&storage)?;
    assert_eq!(analysis.daily.height(), 2);

    let header = fs::read_to_string(storage.path(Artifact::Calculated))?;
    assert_eq!(
        header.lines().next(),
        Some("date,time_interval,power,energy,incremented_energy")
    );

    let rows = report::daily_aggregates(&storage.read(Artifact::Analysed)?)?;
    assert_eq!(rows[0].day, date(2023, 1, 1));
    // 10 MWh and its projection both sit under the threshold
    assert!((rows[0].loss_with_clipping_total - rows[0].loss_without_clipping_total).abs() < 1e-12);
    // 30 MWh already exceeds the threshold
    assert_eq!(rows[1].loss_with_clipping_total, 0.0);
    assert!(rows[1].loss_without_clipping_total > 0.0);

    let calculated = storage.read(Artifact::Calculated)?;
    let curve = report::day_curve(&calculated, date(2023, 1, 2), 27.5)?;
    assert_eq!(curve.len(), 1);
    assert_eq!(curve[0].energy, Some(30.0));
    Ok(())
}

#[test]
fn calculate_without_clean_names_the_missing_step() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::new(dir.path());
    let pipeline = pipeline_for(&storage);

    let params = pipeline.projection(0, date(2023, 1, 1), date(2023, 1, 2));
    let err = pipeline.calculate(&storage, &params).unwrap_err();
    assert!(matches!(err, PipelineError::InputMissing { hint: "clean", .. }));
    assert!(err.to_string().contains("cleaned_data.csv"));
}

#[test]
fn stored_run_writes_every_artifact() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("export.csv");
    fs::write(&source, RAW_EXPORT)?;

    let storage = Storage::new(dir.path().join("assets"));
    storage.import_raw(&source)?;
    let pipeline = pipeline_for(&storage);
    let params = pipeline.projection(5, date(2023, 1, 1), date(2023, 1, 31));

    let output = pipeline.run_stored(&storage, &params)?;
    assert_eq!(output.daily.height(), 3);
    for artifact in Artifact::ALL {
        assert!(storage.exists(artifact), "{} missing", artifact.file_name());
    }

    let analysed = fs::read_to_string(storage.path(Artifact::Analysed))?;
    assert_eq!(
        analysed.lines().next().map(|line| line.split(',').collect::<Vec<_>>()),
        Some(schema::ANALYSED_COLUMNS.to_vec())
    );
    Ok(())
}

#[test]
fn import_clears_previous_outputs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("export.csv");
    fs::write(&source, RAW_EXPORT)?;

    let storage = Storage::new(dir.path().join("assets"));
    storage.import_raw(&source)?;
    pipeline_for(&storage).clean(&storage)?;
    assert!(storage.exists(Artifact::Cleaned));

    storage.import_raw(&source)?;
    assert!(!storage.exists(Artifact::Cleaned));
    assert!(storage.exists(Artifact::Raw));
    Ok(())
}
