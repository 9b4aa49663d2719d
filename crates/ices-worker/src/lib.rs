//! Wiring shared by the `analysis_worker` and `verdict_worker` binaries:
//! configuration loading, analyzer registry assembly, and the retry
//! discipline queue tasks run under.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
