pub mod aggregator;
pub mod config;
pub mod error;
pub mod frame;
pub mod losses;
pub mod observer;
pub mod pipeline;
pub mod projector;
pub mod report;
pub mod reshaper;
pub mod schema;
pub mod storage;

pub use aggregator::aggregate_daily;
pub use config::AnalysisConfig;
pub use error::{PipelineError, Result};
pub use losses::{calculate_losses, ClippingPolicy, LossOptions};
pub use observer::{NoopObserver, PipelineObserver, Stage, TracingObserver};
pub use pipeline::{AnalysisOutput, Pipeline, PipelineOutput};
pub use projector::{parse_range_date, project, ProjectionParams};
pub use report::DailyAggregate;
pub use reshaper::{reshape, ReshapeOptions};
pub use storage::{Artifact, Storage};
