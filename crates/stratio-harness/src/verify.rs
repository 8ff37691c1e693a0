//! Output comparison and verification.

use serde::{Deserialize, Serialize};

/// Result of verifying a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Name of the scenario.
    pub case_name: String,
    /// Behavior family exercised (e.g. `buffered.read`, `text.position`).
    pub contract: String,
    /// Whether the scenario passed.
    pub passed: bool,
    /// Expected outcome at the first divergence, or a completion note.
    pub expected: String,
    /// Actual outcome at the first divergence, or a completion note.
    pub actual: String,
    /// Diff if the scenario failed.
    pub diff: Option<String>,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Total scenarios run.
    pub total: usize,
    /// Scenarios passed.
    pub passed: usize,
    /// Scenarios failed.
    pub failed: usize,
    /// Individual results.
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        Self {
            total,
            passed,
            failed,
            results,
        }
    }

    /// Returns true if all scenarios passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
