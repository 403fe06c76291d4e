use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::schema;

/// The flat tables exchanged between pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Raw,
    Cleaned,
    Calculated,
    Analysed,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::Raw,
        Artifact::Cleaned,
        Artifact::Calculated,
        Artifact::Analysed,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::Raw => "data.csv",
            Artifact::Cleaned => "cleaned_data.csv",
            Artifact::Calculated => "calculated_data.csv",
            Artifact::Analysed => "analysed_data.csv",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Artifact::Raw => &schema::RAW_COLUMNS,
            Artifact::Cleaned => &schema::CLEANED_COLUMNS,
            Artifact::Calculated => &schema::CALCULATED_COLUMNS,
            Artifact::Analysed => &schema::ANALYSED_COLUMNS,
        }
    }

    /// The step an operator runs to produce this artifact.
    pub fn produced_by(&self) -> &'static str {
        match self {
            Artifact::Raw => "import",
            Artifact::Cleaned => "clean",
            Artifact::Calculated => "calculate",
            Artifact::Analysed => "analyse",
        }
    }
}

/// Directory holding the pipeline's CSV artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    pub fn read(&self, artifact: Artifact) -> Result<DataFrame> {
        let path = self.path(artifact);
        if !path.is_file() {
            return Err(PipelineError::InputMissing {
                file: artifact.file_name(),
                root: self.root.clone(),
                hint: artifact.produced_by(),
            });
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?;
        debug!(path = %path.display(), rows = df.height(), "read artifact");
        Ok(df)
    }

    /// Writes `df` with the artifact's columns in their fixed order.
    pub fn write(&self, artifact: Artifact, df: &DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.path(artifact);

        let mut ordered = df.select(artifact.columns().iter().copied())?;
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut ordered)?;

        info!(path = %path.display(), rows = ordered.height(), "wrote artifact");
        Ok(path)
    }

    /// Removes every artifact so a new upload starts from a clean slate.
    pub fn reset(&self) -> Result<()> {
        for artifact in Artifact::ALL {
            let path = self.path(artifact);
            if path.is_file() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Copies a raw CSV export into the store as the raw artifact, renaming its second
    /// header to `power` when the export has no `power` column.
    ///
    /// The source is read in full before the store is reset, so `source` may be the
    /// store's own `data.csv`. Rows must all have the header's field count.
    pub fn import_raw(&self, source: &Path) -> Result<PathBuf> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(source)?;
        let mut headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_string())
            .collect();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

        if !headers.iter().any(|h| h == schema::RAW_POWER) && headers.len() > 1 {
            debug!(from = %headers[1], "renaming second header to power");
            headers[1] = schema::RAW_POWER.to_string();
        }

        self.reset()?;
        fs::create_dir_all(&self.root)?;

        let path = self.path(Artifact::Raw);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&headers)?;
        for record in &records {
            writer.write_record(record)?;
        }
        writer.flush()?;

        info!(source = %source.display(), rows = records.len(), "imported raw data");
        Ok(path)
    }
}
