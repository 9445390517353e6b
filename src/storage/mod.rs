//! Recording, replay and success metrics
//!
//! - `snapshot`: the line-oriented text format runs are recorded to and replayed from
//! - `results`: containment evaluation and the JSON run summary

pub mod results;
pub mod snapshot;

pub use results::{evaluate, EvaluationReport, RunSummary};
pub use snapshot::{FileRecorder, Recording, Snapshot, SnapshotReader, SnapshotWriter};
