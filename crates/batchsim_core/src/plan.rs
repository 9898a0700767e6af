//! YAML description of a complete batch.
//!
//! A plan names the engine options, the selected outputs, the run limit and
//! the design strategy with its dimensions:
//!
//! ```yaml
//! name: example1
//! run_limit: 10000000
//! options:
//!   - [configure.wind.speed, at20ft]
//! outputs: [surface.fire.spreadRate]
//! strategy:
//!   type: orthogonal
//!   dimensions:
//!     - { type: list, key: fuel, values: [gr1, gs1] }
//!     - { type: stepped, key: wind, start: 0, stop: 20, step: 5, scale: 88 }
//!     - { type: linspace, key: moisDead, min: 0.01, max: 0.2, steps: 20 }
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::{EngineOptions, OutputSelection};
use crate::error::{PlanError, SpaceError};
use crate::model::Value;
use crate::runner::{Design, RunOptions};
use crate::sample::{SampleDomain, SampleSpace};
use crate::space::ParameterSpace;

/// A batch as written in a plan file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlan {
    #[serde(default)]
    pub name: String,
    /// Overrides the default run limit when present
    #[serde(default)]
    pub run_limit: Option<u64>,
    #[serde(default)]
    pub parallel_batches: Option<usize>,
    /// Ordered `[key, value]` engine options
    #[serde(default)]
    pub options: EngineOptions,
    /// Output keys to select, in column order
    #[serde(default)]
    pub outputs: Vec<String>,
    pub strategy: StrategyPlan,
}

/// How a plan chooses its assignments. Variants carry named fields only, so
/// the `type` tag reads the same in YAML for every strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyPlan {
    Orthogonal {
        dimensions: Vec<DimensionPlan>,
    },
    Random {
        count: u64,
        #[serde(default)]
        seed: Option<u64>,
        dimensions: Vec<SampleDimensionPlan>,
    },
}

/// A finite sweep dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DimensionPlan {
    /// Explicit candidate values
    List { key: String, values: Vec<Value> },
    /// `start, start + step, ...` up to and including `stop`, each multiplied
    /// by `scale`
    Stepped {
        key: String,
        start: f64,
        stop: f64,
        step: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    /// `steps` evenly spaced points from `min` to `max` inclusive
    Linspace {
        key: String,
        min: f64,
        max: f64,
        steps: usize,
    },
}

fn default_scale() -> f64 {
    1.0
}

impl DimensionPlan {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            DimensionPlan::List { key, .. }
            | DimensionPlan::Stepped { key, .. }
            | DimensionPlan::Linspace { key, .. } => key,
        }
    }

    /// Expand to the dimension's candidate values. A generator that would
    /// yield more than `max_len` values is refused before anything is built.
    pub fn values(&self, max_len: u64) -> Result<Vec<Value>, SpaceError> {
        match self {
            DimensionPlan::List { values, .. } => Ok(values.clone()),
            DimensionPlan::Stepped {
                key,
                start,
                stop,
                step,
                scale,
            } => stepped_values(key, *start, *stop, *step, *scale, max_len),
            DimensionPlan::Linspace {
                key,
                min,
                max,
                steps,
            } => linspace_values(key, *min, *max, *steps, max_len),
        }
    }
}

/// A randomly drawn dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SampleDimensionPlan {
    Continuous { key: String, min: f64, max: f64 },
    Discrete { key: String, min: f64, max: f64 },
    Choice { key: String, values: Vec<Value> },
    Offset {
        key: String,
        base: String,
        min: f64,
        max: f64,
    },
    Constant { key: String, value: Value },
}

impl SampleDimensionPlan {
    fn into_parts(self) -> (String, SampleDomain) {
        match self {
            SampleDimensionPlan::Continuous { key, min, max } => {
                (key, SampleDomain::Continuous { min, max })
            }
            SampleDimensionPlan::Discrete { key, min, max } => {
                (key, SampleDomain::Discrete { min, max })
            }
            SampleDimensionPlan::Choice { key, values } => (key, SampleDomain::Choice(values)),
            SampleDimensionPlan::Offset {
                key,
                base,
                min,
                max,
            } => (key, SampleDomain::Offset { base, min, max }),
            SampleDimensionPlan::Constant { key, value } => (key, SampleDomain::Constant(value)),
        }
    }
}

impl BatchPlan {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, PlanError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    /// Build the validated design
    pub fn design(&self) -> Result<Design, PlanError> {
        match &self.strategy {
            StrategyPlan::Orthogonal { dimensions } => {
                // No dimension may hold more values than the whole batch may run
                let max_len = self.run_options().run_limit;
                let mut space = ParameterSpace::new();
                for dim in dimensions {
                    space.add(dim.key(), dim.values(max_len)?)?;
                }
                Ok(Design::Orthogonal(space))
            }
            StrategyPlan::Random {
                count,
                seed,
                dimensions,
            } => {
                let mut space = SampleSpace::new();
                for dim in dimensions.iter().cloned() {
                    let (key, domain) = dim.into_parts();
                    space.add(key, domain)?;
                }
                Ok(Design::Random {
                    space,
                    count: *count,
                    seed: *seed,
                })
            }
        }
    }

    #[must_use]
    pub fn engine_options(&self) -> &EngineOptions {
        &self.options
    }

    /// Every listed output, selected
    #[must_use]
    pub fn selection(&self) -> OutputSelection {
        self.outputs.iter().cloned().collect()
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::default();
        if let Some(run_limit) = self.run_limit {
            options = options.with_run_limit(run_limit);
        }
        if let Some(parallel_batches) = self.parallel_batches {
            options = options.with_parallel_batches(parallel_batches);
        }
        options
    }
}

fn stepped_values(
    key: &str,
    start: f64,
    stop: f64,
    step: f64,
    scale: f64,
    max_len: u64,
) -> Result<Vec<Value>, SpaceError> {
    let invalid = |reason: &'static str| SpaceError::InvalidRange {
        key: key.to_string(),
        min: start,
        max: stop,
        reason,
    };
    if !start.is_finite() || !stop.is_finite() || !step.is_finite() || !scale.is_finite() {
        return Err(invalid("bounds, step and scale must be finite"));
    }
    if step <= 0.0 {
        return Err(invalid("step must be positive"));
    }
    if stop < start {
        return Err(invalid("start is greater than stop"));
    }

    // Tolerance keeps `stop` when it is an exact multiple of `step`
    let span = ((stop - start) / step + 1e-9).floor();
    // `span` counts the steps after `start`, so the dimension holds `span + 1`
    if !(span.is_finite() && span < max_len as f64) {
        return Err(invalid("too many values"));
    }
    let count = span as u64 + 1;
    Ok((0..count)
        .map(|i| Value::Float((start + step * i as f64) * scale))
        .collect())
}

fn linspace_values(
    key: &str,
    min: f64,
    max: f64,
    steps: usize,
    max_len: u64,
) -> Result<Vec<Value>, SpaceError> {
    let invalid = |reason: &'static str| SpaceError::InvalidRange {
        key: key.to_string(),
        min,
        max,
        reason,
    };
    if !min.is_finite() || !max.is_finite() {
        return Err(invalid("bounds must be finite"));
    }
    if !u64::try_from(steps).is_ok_and(|steps| steps <= max_len) {
        return Err(invalid("too many values"));
    }
    if steps <= 1 {
        return Ok(vec![Value::Float(min)]);
    }
    let step_size = (max - min) / (steps - 1) as f64;
    Ok((0..steps)
        .map(|i| Value::Float(min + step_size * i as f64))
        .collect())
}
