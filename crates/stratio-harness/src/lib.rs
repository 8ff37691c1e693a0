//! Conformance harness for the stratio stream stack.
//!
//! This crate provides:
//! - Scenario fixtures: declarative step scripts over seeded in-memory streams
//! - A runner that replays scenarios against the real buffered and text layers
//! - Structured JSONL logging with schema validation
//! - Report generation: human-readable + machine-readable conformance reports
//! - A non-blocking pipe fixture for would-block conformance on Unix

use thiserror::Error;

pub mod diff;
pub mod fixtures;
#[cfg(unix)]
pub mod pipe_fixture;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use fixtures::{ScenarioSet, Step, StreamScenario};
pub use report::ConformanceReport;
pub use runner::ScenarioRunner;
pub use verify::{VerificationResult, VerificationSummary};

/// Errors from loading fixtures or writing evidence.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("fixture parse: {0}")]
    Parse(#[from] serde_json::Error),
}
