// crates/clipflux-core/src/config.rs

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::losses::{ClippingPolicy, LossOptions, DEFAULT_CLIPPING_THRESHOLD};
use crate::projector::DEFAULT_CAPACITY_BASIS;
use crate::reshaper::ReshapeOptions;
use crate::schema;
use crate::storage::Storage;

pub const CONFIG_ENV: &str = "CLIPFLUX_CONFIG";
pub const STORAGE_ROOT_ENV: &str = "CLIPFLUX_STORAGE_ROOT";
pub const DEFAULT_CONFIG_FILE: &str = "clipflux.toml";

/// Site and pipeline settings. Every field has a default, so a config file only
/// needs the values that differ.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub storage_root: PathBuf,
    pub interval_hours: f64,
    pub capacity_basis: f64,
    pub clipping_threshold: f64,
    pub clipping_policy: ClippingPolicy,
    pub raw_date_formats: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("assets"),
            interval_hours: 0.25,
            capacity_basis: DEFAULT_CAPACITY_BASIS,
            clipping_threshold: DEFAULT_CLIPPING_THRESHOLD,
            clipping_policy: ClippingPolicy::default(),
            raw_date_formats: schema::default_raw_date_formats(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Resolves configuration from, in order: the explicit path, `CLIPFLUX_CONFIG`,
    /// `clipflux.toml` in the working directory, built-in defaults.
    /// `CLIPFLUX_STORAGE_ROOT` then overrides the storage root.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match candidate {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                Self::from_file(&path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Some(root) = env::var_os(STORAGE_ROOT_ENV) {
            config.storage_root = PathBuf::from(root);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.interval_hours.is_finite() && self.interval_hours > 0.0) {
            return Err(PipelineError::Config(format!(
                "interval_hours must be positive, got {}",
                self.interval_hours
            )));
        }
        if !(self.capacity_basis.is_finite() && self.capacity_basis > 0.0) {
            return Err(PipelineError::Config(format!(
                "capacity_basis must be positive, got {}",
                self.capacity_basis
            )));
        }
        if !self.clipping_threshold.is_finite() {
            return Err(PipelineError::Config(
                "clipping_threshold must be a finite number".to_string(),
            ));
        }
        if self.raw_date_formats.is_empty() {
            return Err(PipelineError::Config(
                "raw_date_formats must list at least one layout".to_string(),
            ));
        }
        Ok(())
    }

    pub fn storage(&self) -> Storage {
        Storage::new(&self.storage_root)
    }

    pub fn reshape_options(&self) -> ReshapeOptions {
        ReshapeOptions {
            interval_hours: self.interval_hours,
            raw_date_formats: self.raw_date_formats.clone(),
        }
    }

    pub fn loss_options(&self) -> LossOptions {
        LossOptions {
            clipping_threshold: self.clipping_threshold,
            policy: self.clipping_policy,
        }
    }
}
