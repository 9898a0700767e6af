use std::fmt;

use crate::model::RunStatistics;

/// Errors raised while declaring a parameter or sample space
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceError {
    DuplicateDimension {
        key: String,
    },
    EmptyDomain {
        key: String,
    },
    InvalidRange {
        key: String,
        min: f64,
        max: f64,
        reason: &'static str,
    },
    /// An offset dimension refers to a base that is not declared before it
    UnknownBase {
        key: String,
        base: String,
    },
    /// An offset dimension refers to a base that does not produce numbers
    NonNumericBase {
        key: String,
        base: String,
    },
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceError::DuplicateDimension { key } => {
                write!(f, "dimension '{key}' is already declared")
            }
            SpaceError::EmptyDomain { key } => {
                write!(f, "dimension '{key}' has no candidate values")
            }
            SpaceError::InvalidRange {
                key,
                min,
                max,
                reason,
            } => write!(f, "invalid range for '{key}' (min={min}, max={max}): {reason}"),
            SpaceError::UnknownBase { key, base } => write!(
                f,
                "dimension '{key}' is offset from '{base}', which is not declared before it"
            ),
            SpaceError::NonNumericBase { key, base } => write!(
                f,
                "dimension '{key}' is offset from '{base}', which does not produce numbers"
            ),
        }
    }
}

impl std::error::Error for SpaceError {}

/// Errors reported by an engine implementation
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine rejected the value supplied for `key`
    InvalidInput { key: String, reason: String },
    /// The engine rejected its options or output selection
    Configuration(String),
    /// Any other fault while computing a run
    Compute(String),
    /// A run produced output columns that differ from the declared schema
    OutputColumns {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidInput { key, reason } => {
                write!(f, "invalid input '{key}': {reason}")
            }
            EngineError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            EngineError::Compute(msg) => write!(f, "compute error: {msg}"),
            EngineError::OutputColumns { expected, actual } => write!(
                f,
                "output columns {actual:?} do not match declared columns {expected:?}"
            ),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors raised by a result sink
#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    /// A callback sink refused the record
    Rejected(String),
    /// The sink was already finished or its writer has gone away
    Closed,
    /// The background writer thread panicked
    WriterPanicked,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "I/O error: {e}"),
            SinkError::Serialize(e) => write!(f, "serialization error: {e}"),
            SinkError::Rejected(msg) => write!(f, "record rejected: {msg}"),
            SinkError::Closed => write!(f, "sink is closed"),
            SinkError::WriterPanicked => write!(f, "sink writer thread panicked"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(e) => Some(e),
            SinkError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Serialize(err)
    }
}

/// Errors that stop a batch.
///
/// Every variant before `EngineCompute` is raised before the first engine
/// invocation, so neither the engine nor the sink has been touched.
#[derive(Debug)]
pub enum RunError {
    /// The engine rejected its options or output selection
    Configure(EngineError),
    /// The design does not supply every input the configured engine needs
    MissingRequiredInput {
        missing: Vec<String>,
        required: Vec<String>,
    },
    /// The batch would run more assignments than the ceiling allows
    RunLimitExceeded { requested: u64, ceiling: u64 },
    /// The engine failed on a run; the batch was aborted
    EngineCompute {
        run_index: u64,
        assignment: String,
        source: EngineError,
        statistics: Box<RunStatistics>,
    },
    /// The sink failed to accept or flush a record; the batch was aborted
    SinkWrite {
        run_index: u64,
        source: SinkError,
        statistics: Box<RunStatistics>,
    },
}

impl RunError {
    /// Statistics for the partial batch, when the error happened mid-run
    #[must_use]
    pub fn statistics(&self) -> Option<&RunStatistics> {
        match self {
            RunError::EngineCompute { statistics, .. } | RunError::SinkWrite { statistics, .. } => {
                Some(statistics)
            }
            _ => None,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Configure(e) => write!(f, "engine configuration failed: {e}"),
            RunError::MissingRequiredInput { missing, required } => write!(
                f,
                "missing required inputs {missing:?} (engine requires {required:?})"
            ),
            RunError::RunLimitExceeded { requested, ceiling } => write!(
                f,
                "batch of {requested} runs exceeds the run limit of {ceiling}"
            ),
            RunError::EngineCompute {
                run_index,
                assignment,
                source,
                ..
            } => write!(f, "engine failed on run {run_index} {assignment}: {source}"),
            RunError::SinkWrite {
                run_index, source, ..
            } => write!(f, "sink failed on run {run_index}: {source}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Configure(e) => Some(e),
            RunError::EngineCompute { source, .. } => Some(source),
            RunError::SinkWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised while loading a batch plan
#[derive(Debug)]
pub enum PlanError {
    Parse(serde_saphyr::Error),
    Space(SpaceError),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Parse(e) => write!(f, "plan parse error: {e}"),
            PlanError::Space(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Parse(e) => Some(e),
            PlanError::Space(e) => Some(e),
        }
    }
}

impl From<serde_saphyr::Error> for PlanError {
    fn from(err: serde_saphyr::Error) -> Self {
        PlanError::Parse(err)
    }
}

impl From<SpaceError> for PlanError {
    fn from(err: SpaceError) -> Self {
        PlanError::Space(err)
    }
}
