//! Run configuration and the crate-wide error type.

pub mod config;
pub mod error;

pub use config::SimConfig;
pub use error::{PushError, Result};
