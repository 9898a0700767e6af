//! Batch simulation driver
//!
//! This crate runs an external computation engine over many input
//! combinations and streams one record per run to a sink. It supports:
//! - Orthogonal sweeps over every combination of finite input domains
//! - Seeded random sampling of continuous, discrete and choice inputs
//! - A run-limit ceiling checked before any engine call
//! - Order-preserving parallel computation (feature `parallel`)
//! - In-memory, callback, CSV, JSON-lines and bounded background sinks
//! - YAML batch plans
//!
//! # Example
//!
//! ```ignore
//! use batchsim_core::{Design, MemorySink, ParameterSpace, SimulationRunner};
//!
//! let space = ParameterSpace::new()
//!     .with("fuel", ["gr1", "gr2"])?
//!     .with("wind", [0.0, 5.0])?;
//! let mut sink = MemorySink::new();
//! let report = SimulationRunner::new(&engine).run(
//!     &Design::Orthogonal(space),
//!     &options,
//!     &selection,
//!     &mut sink,
//! )?;
//! println!("{}", report.statistics.message());
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod error;
pub mod runner;
pub mod sample;
pub mod space;
pub mod sweep;

// ============================================================================
// Engine boundary and outputs
// ============================================================================

pub mod engine;
pub mod plan;
pub mod progress;
pub mod schema;
pub mod sink;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use engine::{Engine, EngineOptions, Model, OutputSelection};
pub use error::{EngineError, PlanError, RunError, SinkError, SpaceError};
pub use model::{Assignment, OutputValue, Outputs, RunRecord, RunStatistics, RunStatus, Value};
pub use plan::BatchPlan;
pub use progress::RunProgress;
pub use runner::{BatchReport, DEFAULT_RUN_LIMIT, Design, RunOptions, SimulationRunner};
pub use sample::{RandomSampleGenerator, SampleDomain, SampleSpace};
pub use schema::{OutputField, Schema};
pub use sink::{BoundedSink, CallbackSink, CsvSink, JsonLinesSink, MemorySink, ResultSink};
pub use space::{Dimension, ParameterSpace};
pub use sweep::OrthogonalSweep;
