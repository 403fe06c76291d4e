use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::info;

use crate::aggregator::aggregate_daily;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::losses::calculate_losses;
use crate::observer::{PipelineObserver, Stage, TracingObserver};
use crate::projector::{project, ProjectionParams};
use crate::reshaper::reshape;
use crate::storage::{Artifact, Storage};

/// Every table produced by one pass over a raw table.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cleaned: DataFrame,
    pub projected: DataFrame,
    pub losses: DataFrame,
    pub daily: DataFrame,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub losses: DataFrame,
    pub daily: DataFrame,
}

/// Runs the four stages against one configuration, reporting progress to an observer.
pub struct Pipeline {
    config: AnalysisConfig,
    observer: Box<dyn PipelineObserver>,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_observer(config, Box::new(TracingObserver))
    }

    pub fn with_observer(config: AnalysisConfig, observer: Box<dyn PipelineObserver>) -> Self {
        Self { config, observer }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Projection parameters carrying this configuration's capacity basis.
    pub fn projection(
        &self,
        increment_pct: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProjectionParams {
        ProjectionParams::new(increment_pct, start, end)
            .with_capacity_basis(self.config.capacity_basis)
    }

    fn observe<F>(&self, stage: Stage, input: &DataFrame, run: F) -> Result<DataFrame>
    where
        F: FnOnce(&DataFrame) -> Result<DataFrame>,
    {
        let rows_in = input.height();
        self.observer.stage_started(stage, rows_in);
        let output = run(input)?;
        self.observer.stage_finished(stage, rows_in, output.height());
        Ok(output)
    }

    pub fn reshape(&self, raw: &DataFrame) -> Result<DataFrame> {
        let options = self.config.reshape_options();
        self.observe(Stage::Reshape, raw, |df| reshape(df, &options))
    }

    pub fn project(&self, cleaned: &DataFrame, params: &ProjectionParams) -> Result<DataFrame> {
        self.observe(Stage::Project, cleaned, |df| project(df, params))
    }

    pub fn calculate_losses(&self, projected: &DataFrame) -> Result<DataFrame> {
        let options = self.config.loss_options();
        self.observe(Stage::CalculateLosses, projected, |df| {
            calculate_losses(df, &options)
        })
    }

    pub fn aggregate(&self, losses: &DataFrame) -> Result<DataFrame> {
        self.observe(Stage::Aggregate, losses, aggregate_daily)
    }

    /// Composes all four stages in memory. The first failing stage ends the run.
    pub fn run(&self, raw: &DataFrame, params: &ProjectionParams) -> Result<PipelineOutput> {
        let cleaned = self.reshape(raw)?;
        let projected = self.project(&cleaned, params)?;
        let losses = self.calculate_losses(&projected)?;
        let daily = self.aggregate(&losses)?;
        Ok(PipelineOutput {
            cleaned,
            projected,
            losses,
            daily,
        })
    }

    /// `data.csv` -> `cleaned_data.csv`.
    pub fn clean(&self, storage: &Storage) -> Result<DataFrame> {
        let raw = storage.read(Artifact::Raw)?;
        let cleaned = self.reshape(&raw)?;
        storage.write(Artifact::Cleaned, &cleaned)?;
        Ok(cleaned)
    }

    /// `cleaned_data.csv` -> `calculated_data.csv`.
    pub fn calculate(&self, storage: &Storage, params: &ProjectionParams) -> Result<DataFrame> {
        let cleaned = storage.read(Artifact::Cleaned)?;
        let projected = self.project(&cleaned, params)?;
        storage.write(Artifact::Calculated, &projected)?;
        Ok(projected)
    }

    /// `calculated_data.csv` -> `analysed_data.csv`.
    pub fn analyse(&self, storage: &Storage) -> Result<AnalysisOutput> {
        let projected = storage.read(Artifact::Calculated)?;
        info!(
            policy = self.config.clipping_policy.as_str(),
            threshold = self.config.clipping_threshold,
            "calculating clipping losses"
        );
        let losses = self.calculate_losses(&projected)?;
        let daily = self.aggregate(&losses)?;
        storage.write(Artifact::Analysed, &daily)?;
        Ok(AnalysisOutput { losses, daily })
    }

    /// Runs clean, calculate and analyse against the store, stopping at the first failure.
    pub fn run_stored(
        &self,
        storage: &Storage,
        params: &ProjectionParams,
    ) -> Result<AnalysisOutput> {
        self.clean(storage)?;
        self.calculate(storage, params)?;
        self.analyse(storage)
    }
}
