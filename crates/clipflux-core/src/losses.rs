use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::frame::{float_column, require_columns};
use crate::schema;

const STAGE: &str = "calculate_losses";

pub const DEFAULT_CLIPPING_THRESHOLD: f64 = 27.5;

/// How `loss_with_clipping` is derived from a row's energy and projected energy.
/// `Piecewise` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClippingPolicy {
    /// `max(incremented_energy - threshold, 0)`.
    Simple,
    /// Only the part of the increment that stays below the threshold counts:
    ///
    /// | incremented | energy | loss with clipping        |
    /// |-------------|--------|---------------------------|
    /// | `<= t`      | `<= t` | `incremented - energy`    |
    /// | `> t`       | `<= t` | `t - energy`              |
    /// | `> t`       | `> t`  | `0`                       |
    #[default]
    Piecewise,
}

impl ClippingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClippingPolicy::Simple => "simple",
            ClippingPolicy::Piecewise => "piecewise",
        }
    }

    pub fn loss_with_clipping(&self, energy: f64, incremented: f64, threshold: f64) -> f64 {
        match self {
            ClippingPolicy::Simple => (incremented - threshold).max(0.0),
            ClippingPolicy::Piecewise => {
                if energy > threshold {
                    0.0
                } else if incremented <= threshold {
                    incremented - energy
                } else {
                    threshold - energy
                }
            }
        }
    }
}

impl fmt::Display for ClippingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClippingPolicy {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ClippingPolicy::Simple),
            "piecewise" => Ok(ClippingPolicy::Piecewise),
            other => Err(PipelineError::Config(format!(
                "unknown clipping policy '{other}' (expected 'simple' or 'piecewise')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossOptions {
    pub clipping_threshold: f64,
    pub policy: ClippingPolicy,
}

impl Default for LossOptions {
    fn default() -> Self {
        Self {
            clipping_threshold: DEFAULT_CLIPPING_THRESHOLD,
            policy: ClippingPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowLoss {
    pub without_clipping: f64,
    pub with_clipping: f64,
    pub difference: f64,
}

impl LossOptions {
    pub fn row_loss(&self, energy: f64, incremented: f64) -> RowLoss {
        let without_clipping = incremented - energy;
        let with_clipping =
            self.policy
                .loss_with_clipping(energy, incremented, self.clipping_threshold);
        RowLoss {
            without_clipping,
            with_clipping,
            difference: without_clipping - with_clipping,
        }
    }
}

/// Appends `loss_without_clipping`, `loss_with_clipping` and `loss_difference` to the
/// projected table. Rows with a null energy value get null losses.
pub fn calculate_losses(projected: &DataFrame, options: &LossOptions) -> Result<DataFrame> {
    require_columns(
        projected,
        STAGE,
        &[schema::INCREMENTED_ENERGY, schema::ENERGY],
    )?;

    let len = projected.height();
    let incremented = float_column(projected, schema::INCREMENTED_ENERGY)?;
    let energy = float_column(projected, schema::ENERGY)?;

    let mut without = Vec::with_capacity(len);
    let mut with = Vec::with_capacity(len);
    let mut difference = Vec::with_capacity(len);

    for idx in 0..len {
        let loss = match (energy.get(idx), incremented.get(idx)) {
            (Some(energy), Some(incremented)) => Some(options.row_loss(energy, incremented)),
            _ => None,
        };
        without.push(loss.map(|l| l.without_clipping));
        with.push(loss.map(|l| l.with_clipping));
        difference.push(loss.map(|l| l.difference));
    }

    let mut output = projected.clone();
    output.hstack_mut(&[
        Series::new(schema::LOSS_WITHOUT_CLIPPING.into(), without).into(),
        Series::new(schema::LOSS_WITH_CLIPPING.into(), with).into(),
        Series::new(schema::LOSS_DIFFERENCE.into(), difference).into(),
    ])?;

    Ok(output)
}
