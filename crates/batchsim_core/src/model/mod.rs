mod assignment;
mod records;
mod stats;
mod value;

pub use assignment::Assignment;
pub use records::{OutputValue, Outputs, RunRecord};
pub use stats::{RunStatistics, RunStatus};
pub use value::Value;
