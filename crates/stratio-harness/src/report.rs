//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::structured_log::now_utc;
use crate::verify::VerificationSummary;

/// A conformance report combining verification results with run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Campaign the results came from.
    pub campaign: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Verification summary.
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Build a report stamped with the current time.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        campaign: impl Into<String>,
        summary: VerificationSummary,
    ) -> Self {
        Self {
            title: title.into(),
            campaign: campaign.into(),
            timestamp: now_utc(),
            summary,
        }
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Campaign: {}\n", self.campaign));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Scenario | Contract | Status |\n");
        out.push_str("|----------|----------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                r.case_name, r.contract, status
            ));
        }

        if self.summary.failed > 0 {
            out.push_str("\n## Failures\n\n");
            for r in self.summary.results.iter().filter(|r| !r.passed) {
                out.push_str(&format!("### {}\n\n", r.case_name));
                out.push_str(&format!("- Expected: {}\n", r.expected));
                out.push_str(&format!("- Actual: {}\n", r.actual));
                if let Some(diff) = &r.diff {
                    out.push_str(&format!("\n```\n{diff}\n```\n"));
                }
                out.push('\n');
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
