use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::finding::{Finding, Severity};

/// Outcome of one completed pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Every tool result entry parsed cleanly.
    Success,
    /// Some entries were skipped during normalization.
    Partial,
    /// The tool reported entries but none could be parsed.
    Failed,
}

/// The normalized response body for a scanned delivery. Immutable once built;
/// finding order is exactly the tool's own output order so repeated scans of
/// an unchanged tree serialize identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub repository: String,
    pub reference: String,
    pub delivery_id: String,
    pub status: ScanStatus,
    pub findings: Vec<Finding>,
    /// Tool result entries dropped during normalization.
    pub skipped_entries: usize,
    pub metadata: ScanResultMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResultMetadata {
    /// Server-assigned id for this scan run. Replays of a cached delivery
    /// carry the original id.
    pub scan_id: String,
    pub duration_ms: u64,
    pub tool_version: Option<String>,
    /// Set when the findings list was cut off at the configured cap.
    pub truncated: bool,
    /// Findings per severity level. BTreeMap keeps key order stable across
    /// serializations.
    pub severity_counts: BTreeMap<String, usize>,
}

impl ScanResultMetadata {
    pub fn count_severities(findings: &[Finding]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            counts.insert(severity.as_str().to_string(), 0);
        }
        for f in findings {
            *counts.entry(f.severity.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity) -> Finding {
        Finding {
            rule_id: "rules.test".into(),
            path: "src/app.py".into(),
            start_line: 1,
            end_line: 1,
            severity,
            message: "m".into(),
        }
    }

    #[test]
    fn test_severity_counts() {
        let findings = vec![
            finding(Severity::Error),
            finding(Severity::Error),
            finding(Severity::Info),
        ];
        let counts = ScanResultMetadata::count_severities(&findings);
        assert_eq!(counts["error"], 2);
        assert_eq!(counts["warning"], 0);
        assert_eq!(counts["info"], 1);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ScanStatus::Partial).unwrap(), "\"partial\"");
    }
}
