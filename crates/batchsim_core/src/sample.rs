//! Randomized sampling of input dimensions.
//!
//! Each draw produces one complete [`Assignment`] by drawing every dimension
//! independently, in declaration order. Two range rules apply:
//!
//! - continuous ranges draw a real `x` with `min <= x < max`
//! - discrete ranges normalize their bounds to `ceil(min)` and `floor(max)`
//!   and draw an integer `i` with `ceil(min) <= i < floor(max)`
//!
//! A range that collapses to a single point (`min == max`, after
//! normalization for discrete ranges) returns that point.
//!
//! Generators built with [`RandomSampleGenerator::seeded`] are reproducible;
//! [`RandomSampleGenerator::new`] seeds from the operating system.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::SpaceError;
use crate::model::{Assignment, Value};
use crate::space::ParameterSpace;

/// Draw a real number `x` with `min <= x < max`.
///
/// Ranges with `max <= min` collapse to `min`.
pub fn random_float<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    let r = rng.random::<f64>();
    // Weighted form stays finite even when `max - min` overflows
    let x = min * (1.0 - r) + max * r;
    // Rounding can land on `max`; step back inside the half-open range
    if x < max {
        x.max(min)
    } else {
        max.next_down().max(min)
    }
}

/// Draw an integer `i` with `ceil(min) <= i < floor(max)`.
///
/// Ranges that are empty after normalization collapse to `ceil(min)`.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> i64 {
    let low = min.ceil() as i64;
    let high = max.floor() as i64;
    if high <= low {
        return low;
    }
    rng.random_range(low..high)
}

/// How a single dimension is drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleDomain {
    /// Uniform real in `[min, max)`
    Continuous { min: f64, max: f64 },
    /// Uniform integer in `[ceil(min), floor(max))`
    Discrete { min: f64, max: f64 },
    /// Uniform pick from a finite list
    Choice(Vec<Value>),
    /// An earlier numeric dimension plus a uniform real in `[min, max)`
    Offset { base: String, min: f64, max: f64 },
    /// Always the same value
    Constant(Value),
}

impl SampleDomain {
    fn is_numeric(&self) -> bool {
        match self {
            SampleDomain::Continuous { .. }
            | SampleDomain::Discrete { .. }
            | SampleDomain::Offset { .. } => true,
            SampleDomain::Choice(values) => values.iter().all(Value::is_numeric),
            SampleDomain::Constant(value) => value.is_numeric(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleDimension {
    key: Arc<str>,
    domain: SampleDomain,
    /// Declaration position of the base dimension for offsets
    base_position: Option<usize>,
}

impl SampleDimension {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn domain(&self) -> &SampleDomain {
        &self.domain
    }
}

/// Ordered set of randomly drawn dimensions.
#[derive(Debug, Clone, Default)]
pub struct SampleSpace {
    dimensions: Vec<SampleDimension>,
    positions: FxHashMap<Arc<str>, usize>,
}

impl SampleSpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat every finite domain of a parameter space as a uniform choice
    #[must_use]
    pub fn from_parameter_space(space: &ParameterSpace) -> Self {
        let mut sample_space = Self::new();
        for dim in space.dimensions() {
            sample_space
                .positions
                .insert(dim.shared_key().clone(), sample_space.dimensions.len());
            sample_space.dimensions.push(SampleDimension {
                key: dim.shared_key().clone(),
                domain: SampleDomain::Choice(dim.domain().to_vec()),
                base_position: None,
            });
        }
        sample_space
    }

    /// Declare a dimension, validating its domain.
    pub fn add(&mut self, key: impl Into<String>, domain: SampleDomain) -> Result<(), SpaceError> {
        let key = key.into();
        if self.positions.contains_key(key.as_str()) {
            return Err(SpaceError::DuplicateDimension { key });
        }

        let mut base_position = None;
        match &domain {
            SampleDomain::Continuous { min, max } => check_range(&key, *min, *max)?,
            SampleDomain::Discrete { min, max } => {
                check_range(&key, *min, *max)?;
                if max.floor() < min.ceil() {
                    return Err(SpaceError::InvalidRange {
                        key,
                        min: *min,
                        max: *max,
                        reason: "no integer lies in the range",
                    });
                }
            }
            SampleDomain::Choice(values) => {
                if values.is_empty() {
                    return Err(SpaceError::EmptyDomain { key });
                }
            }
            SampleDomain::Offset { base, min, max } => {
                check_range(&key, *min, *max)?;
                let Some(&position) = self.positions.get(base.as_str()) else {
                    return Err(SpaceError::UnknownBase {
                        key,
                        base: base.clone(),
                    });
                };
                if !self.dimensions[position].domain.is_numeric() {
                    return Err(SpaceError::NonNumericBase {
                        key,
                        base: base.clone(),
                    });
                }
                base_position = Some(position);
            }
            SampleDomain::Constant(_) => {}
        }

        let key: Arc<str> = key.into();
        self.positions.insert(key.clone(), self.dimensions.len());
        self.dimensions.push(SampleDimension {
            key,
            domain,
            base_position,
        });
        Ok(())
    }

    /// Builder form of [`SampleSpace::add`]
    pub fn with(mut self, key: impl Into<String>, domain: SampleDomain) -> Result<Self, SpaceError> {
        self.add(key, domain)?;
        Ok(self)
    }

    #[must_use]
    pub fn dimensions(&self) -> &[SampleDimension] {
        &self.dimensions
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(SampleDimension::key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

fn check_range(key: &str, min: f64, max: f64) -> Result<(), SpaceError> {
    let reason = if !min.is_finite() || !max.is_finite() {
        "bounds must be finite"
    } else if min > max {
        "min is greater than max"
    } else if !(max - min).is_finite() {
        "range width overflows"
    } else {
        return Ok(());
    };
    Err(SpaceError::InvalidRange {
        key: key.to_string(),
        min,
        max,
        reason,
    })
}

/// Draws one randomized assignment per call.
#[derive(Debug, Clone)]
pub struct RandomSampleGenerator<'a> {
    space: &'a SampleSpace,
    rng: StdRng,
}

impl<'a> RandomSampleGenerator<'a> {
    /// Generator seeded from the operating system
    #[must_use]
    pub fn new(space: &'a SampleSpace) -> Self {
        Self {
            space,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible generator: equal seeds give equal draw sequences
    #[must_use]
    pub fn seeded(space: &'a SampleSpace, seed: u64) -> Self {
        Self {
            space,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded with `seed` if given, from the OS otherwise
    #[must_use]
    pub fn with_seed(space: &'a SampleSpace, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(space, seed),
            None => Self::new(space),
        }
    }

    #[must_use]
    pub fn space(&self) -> &'a SampleSpace {
        self.space
    }

    /// Draw one complete assignment
    pub fn draw(&mut self) -> Assignment {
        let mut assignment = Assignment::with_capacity(self.space.len());
        for dim in &self.space.dimensions {
            let value = match &dim.domain {
                SampleDomain::Continuous { min, max } => {
                    Value::Float(random_float(&mut self.rng, *min, *max))
                }
                SampleDomain::Discrete { min, max } => {
                    Value::Int(random_int(&mut self.rng, *min, *max))
                }
                SampleDomain::Choice(values) => {
                    values[self.rng.random_range(0..values.len())].clone()
                }
                SampleDomain::Offset { min, max, .. } => {
                    let base = dim
                        .base_position
                        .and_then(|p| assignment.value_at(p))
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0);
                    Value::Float(base + random_float(&mut self.rng, *min, *max))
                }
                SampleDomain::Constant(value) => value.clone(),
            };
            assignment.push(dim.key.clone(), value);
        }
        assignment
    }

    /// Lazily draw `count` assignments
    pub fn samples(&mut self, count: u64) -> impl Iterator<Item = Assignment> + '_ {
        (0..count).map(move |_| self.draw())
    }
}
