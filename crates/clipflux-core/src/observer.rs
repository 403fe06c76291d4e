use std::fmt;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Reshape,
    Project,
    CalculateLosses,
    Aggregate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Reshape => "reshape",
            Stage::Project => "project",
            Stage::CalculateLosses => "calculate_losses",
            Stage::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives progress events from the pipeline stages.
pub trait PipelineObserver {
    fn stage_started(&self, stage: Stage, rows_in: usize);
    fn stage_finished(&self, stage: Stage, rows_in: usize, rows_out: usize);
}

/// Emits stage events as `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn stage_started(&self, stage: Stage, rows_in: usize) {
        info!(stage = stage.as_str(), rows_in, "stage started");
    }

    fn stage_finished(&self, stage: Stage, rows_in: usize, rows_out: usize) {
        info!(
            stage = stage.as_str(),
            rows_in,
            rows_out,
            dropped = rows_in.saturating_sub(rows_out),
            "stage finished"
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn stage_started(&self, _stage: Stage, _rows_in: usize) {}

    fn stage_finished(&self, _stage: Stage, _rows_in: usize, _rows_out: usize) {}
}
