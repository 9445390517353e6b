//! LightSwarm Core v0.3.0 - Virtual Light-Field Control for Pushing Swarms
//!
//! A grid of controllable lights is the only thing the robots can sense and the only
//! thing the experimenter can change. This library lays out goal slots for the boxes,
//! drives a contracting and dilating light pattern around a circle or a polygon,
//! records runs to a replayable text format and scores how many boxes ended up inside.

pub mod core;
pub mod geometry;
pub mod storage;
pub mod swarm;

// Re-export key types
pub use crate::core::config::SimConfig;
pub use crate::core::error::{PushError, Result};
pub use geometry::{Polygon, Region, Shape, Vertex};
pub use storage::{EvaluationReport, RunSummary, SnapshotReader, SnapshotWriter};
pub use swarm::{ContractionController, KinematicPhysics, LightField, Physics, Simulation, World};

/// Initialize logging with tracing.
///
/// `level` is an `EnvFilter` directive such as `"info"` or `"lightswarm_core=debug"`.
/// A second call is a no-op.
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
