//! Batch driver: configure the engine, generate assignments, compute each one
//! and deliver the records to a sink in generation order.

use std::time::Instant;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::engine::{Engine, EngineOptions, Model, OutputSelection};
use crate::error::{EngineError, RunError, SinkError};
use crate::model::{Assignment, Outputs, RunRecord, RunStatistics, RunStatus};
use crate::progress::RunProgress;
use crate::sample::{RandomSampleGenerator, SampleSpace};
use crate::schema::Schema;
use crate::sink::ResultSink;
use crate::space::ParameterSpace;
use crate::sweep::OrthogonalSweep;

/// Largest batch a runner accepts unless told otherwise
pub const DEFAULT_RUN_LIMIT: u64 = 10_000;

/// Assignments handed to each worker per parallel chunk
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Tuning for a [`SimulationRunner`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Ceiling on the number of runs in one batch
    #[serde(default = "default_run_limit")]
    pub run_limit: u64,
    /// Number of parallel workers (defaults to CPU count). 1 runs sequentially.
    #[serde(default = "default_parallel_batches")]
    pub parallel_batches: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_run_limit() -> u64 {
    DEFAULT_RUN_LIMIT
}

fn default_parallel_batches() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_limit: DEFAULT_RUN_LIMIT,
            parallel_batches: default_parallel_batches(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl RunOptions {
    /// Options that compute every run on the calling thread
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel_batches: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_run_limit(mut self, run_limit: u64) -> Self {
        self.run_limit = run_limit;
        self
    }

    #[must_use]
    pub fn with_parallel_batches(mut self, parallel_batches: usize) -> Self {
        self.parallel_batches = parallel_batches.max(1);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// How a batch chooses its assignments
#[derive(Debug, Clone)]
pub enum Design {
    /// Every combination of a parameter space, last dimension fastest
    Orthogonal(ParameterSpace),
    /// `count` independent random draws; `seed` makes the batch reproducible
    Random {
        space: SampleSpace,
        count: u64,
        seed: Option<u64>,
    },
}

impl Design {
    /// Dimension keys in declaration order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        match self {
            Design::Orthogonal(space) => space.keys().map(str::to_string).collect(),
            Design::Random { space, .. } => space.keys().map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        match self {
            Design::Orthogonal(space) => space.contains_key(key),
            Design::Random { space, .. } => space.contains_key(key),
        }
    }

    /// Number of runs the design asks for (saturating)
    #[must_use]
    pub fn runs(&self) -> u64 {
        match self {
            Design::Orthogonal(space) => space.size(),
            Design::Random { count, .. } => *count,
        }
    }
}

impl From<ParameterSpace> for Design {
    fn from(space: ParameterSpace) -> Self {
        Design::Orthogonal(space)
    }
}

/// What a finished batch hands back
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub statistics: RunStatistics,
    pub schema: Schema,
}

/// How the delivery loop stopped without a fault
enum Flow {
    Exhausted,
    Cancelled,
}

/// Fault that aborts the delivery loop
enum Halt {
    Engine {
        run_index: u64,
        assignment: String,
        error: EngineError,
    },
    Sink {
        run_index: u64,
        error: SinkError,
    },
}

/// Drives one engine through batches of assignments.
pub struct SimulationRunner<'e, E> {
    engine: &'e E,
    options: RunOptions,
    progress: RunProgress,
}

impl<'e, E: Engine> SimulationRunner<'e, E> {
    #[must_use]
    pub fn new(engine: &'e E) -> Self {
        Self {
            engine,
            options: RunOptions::default(),
            progress: RunProgress::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Share a progress handle, e.g. to cancel from another thread
    #[must_use]
    pub fn with_progress(mut self, progress: RunProgress) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    #[must_use]
    pub fn progress(&self) -> &RunProgress {
        &self.progress
    }

    /// Run one batch.
    ///
    /// The engine is configured first, then the design is checked against the
    /// engine's required inputs and the run limit. Neither the engine's
    /// `compute` nor the sink is touched unless all three steps succeed.
    pub fn run<S>(
        &self,
        design: &Design,
        engine_options: &EngineOptions,
        selection: &OutputSelection,
        sink: &mut S,
    ) -> Result<BatchReport, RunError>
    where
        S: ResultSink + ?Sized,
    {
        let model = self
            .engine
            .configure(engine_options, selection)
            .map_err(RunError::Configure)?;
        check_required_inputs(&model, design)?;

        let ceiling = self.options.run_limit;
        match design {
            Design::Orthogonal(space) => {
                let sweep = OrthogonalSweep::new(space, ceiling)?;
                let schema = Schema::new(design.keys(), model.output_fields());
                self.execute(&model, schema, sweep.iter(), sweep.len(), sink)
            }
            Design::Random { space, count, seed } => {
                if *count > ceiling {
                    return Err(RunError::RunLimitExceeded {
                        requested: *count,
                        ceiling,
                    });
                }
                let schema = Schema::new(design.keys(), model.output_fields());
                let mut generator = RandomSampleGenerator::with_seed(space, *seed);
                self.execute(&model, schema, generator.samples(*count), *count, sink)
            }
        }
    }

    fn execute<M, I, S>(
        &self,
        model: &M,
        schema: Schema,
        assignments: I,
        total: u64,
        sink: &mut S,
    ) -> Result<BatchReport, RunError>
    where
        M: Model,
        I: Iterator<Item = Assignment>,
        S: ResultSink + ?Sized,
    {
        let expected: Vec<String> = schema.output_keys().map(str::to_string).collect();
        self.progress.reset(total);

        tracing::info!(
            runs = total,
            dimensions = schema.inputs.len(),
            outputs = schema.outputs.len(),
            parallel_batches = self.options.parallel_batches,
            "Starting batch"
        );

        let started_at = Timestamp::now();
        let start = Instant::now();
        let mut delivered = 0u64;

        #[cfg(feature = "parallel")]
        let flow = if self.options.parallel_batches > 1 {
            self.deliver_parallel(model, &expected, assignments, sink, &mut delivered)
        } else {
            self.deliver_sequential(model, &expected, assignments, sink, &mut delivered)
        };

        #[cfg(not(feature = "parallel"))]
        let flow = self.deliver_sequential(model, &expected, assignments, sink, &mut delivered);

        let elapsed = start.elapsed();

        match flow {
            Ok(flow) => {
                let status = match flow {
                    Flow::Exhausted => RunStatus::Completed,
                    Flow::Cancelled => RunStatus::Cancelled {
                        remaining: total.saturating_sub(delivered),
                    },
                };
                if let Err(error) = sink.finish() {
                    tracing::error!(run_index = delivered, error = %error, "Sink failed to flush");
                    let status = RunStatus::Aborted {
                        run_index: delivered,
                        reason: error.to_string(),
                    };
                    return Err(RunError::SinkWrite {
                        run_index: delivered,
                        source: error,
                        statistics: Box::new(RunStatistics::new(
                            delivered, elapsed, status, started_at,
                        )),
                    });
                }

                let statistics = RunStatistics::new(delivered, elapsed, status, started_at);
                if statistics.status.is_complete() {
                    tracing::info!(
                        runs = statistics.total_runs,
                        elapsed_ms = statistics.elapsed_ms,
                        throughput = statistics.throughput,
                        "Batch complete"
                    );
                } else {
                    tracing::warn!(
                        runs = statistics.total_runs,
                        remaining = total.saturating_sub(delivered),
                        "Batch cancelled"
                    );
                }
                Ok(BatchReport { statistics, schema })
            }
            Err(halt) => {
                // Records already delivered stay delivered; flush them
                if let Err(error) = sink.finish() {
                    tracing::warn!(error = %error, "Sink failed to flush after abort");
                }
                Err(abort(halt, delivered, elapsed, started_at))
            }
        }
    }

    fn deliver_sequential<M, I, S>(
        &self,
        model: &M,
        expected: &[String],
        assignments: I,
        sink: &mut S,
        delivered: &mut u64,
    ) -> Result<Flow, Halt>
    where
        M: Model,
        I: Iterator<Item = Assignment>,
        S: ResultSink + ?Sized,
    {
        for (run_index, assignment) in (0u64..).zip(assignments) {
            if self.progress.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            let result = compute_checked(model, &assignment, expected);
            self.deliver(sink, run_index, assignment, result, delivered)?;
        }
        Ok(Flow::Exhausted)
    }

    /// Computes bounded chunks of assignments across the rayon pool, then
    /// delivers each chunk in generation order. Assignments are still drawn
    /// on this thread, so seeded random batches match the sequential path.
    #[cfg(feature = "parallel")]
    fn deliver_parallel<M, I, S>(
        &self,
        model: &M,
        expected: &[String],
        assignments: I,
        sink: &mut S,
        delivered: &mut u64,
    ) -> Result<Flow, Halt>
    where
        M: Model,
        I: Iterator<Item = Assignment>,
        S: ResultSink + ?Sized,
    {
        let chunk_len = self
            .options
            .parallel_batches
            .saturating_mul(self.options.batch_size.max(1));
        let mut indexed = (0u64..).zip(assignments);

        loop {
            if self.progress.is_cancelled() {
                return Ok(Flow::Cancelled);
            }
            let chunk: Vec<(u64, Assignment)> = indexed.by_ref().take(chunk_len).collect();
            if chunk.is_empty() {
                return Ok(Flow::Exhausted);
            }

            let results: Vec<Result<Outputs, EngineError>> = chunk
                .par_iter()
                .map(|(_, assignment)| compute_checked(model, assignment, expected))
                .collect();

            for ((run_index, assignment), result) in chunk.into_iter().zip(results) {
                if self.progress.is_cancelled() {
                    return Ok(Flow::Cancelled);
                }
                self.deliver(sink, run_index, assignment, result, delivered)?;
            }
        }
    }

    fn deliver<S>(
        &self,
        sink: &mut S,
        run_index: u64,
        assignment: Assignment,
        result: Result<Outputs, EngineError>,
        delivered: &mut u64,
    ) -> Result<(), Halt>
    where
        S: ResultSink + ?Sized,
    {
        let outputs = match result {
            Ok(outputs) => outputs,
            Err(error) => {
                return Err(Halt::Engine {
                    run_index,
                    assignment: assignment.to_string(),
                    error,
                });
            }
        };

        let record = RunRecord {
            index: run_index,
            assignment,
            outputs,
        };
        sink.accept(record)
            .map_err(|error| Halt::Sink { run_index, error })?;

        *delivered += 1;
        self.progress.increment();
        Ok(())
    }
}

fn check_required_inputs<M: Model>(model: &M, design: &Design) -> Result<(), RunError> {
    let required = model.required_inputs();
    let missing: Vec<String> = required
        .iter()
        .filter(|key| !design.contains_key(key))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RunError::MissingRequiredInput { missing, required });
    }

    let extra: Vec<String> = design
        .keys()
        .into_iter()
        .filter(|key| !required.contains(key))
        .collect();
    if !extra.is_empty() {
        tracing::debug!(extra = ?extra, "Design supplies inputs the engine does not require");
    }
    Ok(())
}

/// Compute one run and check its outputs against the declared columns
fn compute_checked<M: Model>(
    model: &M,
    assignment: &Assignment,
    expected: &[String],
) -> Result<Outputs, EngineError> {
    let outputs = model.compute(assignment)?;
    if !outputs.keys().eq(expected.iter().map(String::as_str)) {
        return Err(EngineError::OutputColumns {
            expected: expected.to_vec(),
            actual: outputs.keys().map(str::to_string).collect(),
        });
    }
    Ok(outputs)
}

fn abort(
    halt: Halt,
    delivered: u64,
    elapsed: std::time::Duration,
    started_at: Timestamp,
) -> RunError {
    match halt {
        Halt::Engine {
            run_index,
            assignment,
            error,
        } => {
            tracing::error!(run_index, assignment = %assignment, error = %error, "Batch aborted by engine failure");
            let status = RunStatus::Aborted {
                run_index,
                reason: error.to_string(),
            };
            RunError::EngineCompute {
                run_index,
                assignment,
                source: error,
                statistics: Box::new(RunStatistics::new(delivered, elapsed, status, started_at)),
            }
        }
        Halt::Sink { run_index, error } => {
            tracing::error!(run_index, error = %error, "Batch aborted by sink failure");
            let status = RunStatus::Aborted {
                run_index,
                reason: error.to_string(),
            };
            RunError::SinkWrite {
                run_index,
                source: error,
                statistics: Box::new(RunStatistics::new(delivered, elapsed, status, started_at)),
            }
        }
    }
}
