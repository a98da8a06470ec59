use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::HookscanError;
use crate::models::{Finding, ScanStatus, Severity};

/// Normalized view of one tool invocation, before response assembly.
#[derive(Debug, Clone)]
pub struct NormalizedScan {
    pub status: ScanStatus,
    pub findings: Vec<Finding>,
    pub skipped_entries: usize,
    pub tool_version: Option<String>,
    pub truncated: bool,
}

/// Convert the tool's raw JSON into the stable finding schema.
///
/// The whole document must parse (a tool that emits garbage did not complete
/// its contract), but individual result entries are lenient: each malformed
/// entry is skipped and counted, degrading the status to `partial` (or
/// `failed` when nothing survived). Entry order is preserved exactly as the
/// tool emitted it.
pub fn normalize(
    raw_stdout: &str,
    source_root: &Path,
    max_findings: usize,
) -> Result<NormalizedScan, HookscanError> {
    let document: Value = serde_json::from_str(raw_stdout).map_err(|e| {
        HookscanError::ScanExecution(format!("scanner output is not valid JSON: {}", e))
    })?;

    let tool_version = document
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);

    let entries = match document.get("results").and_then(Value::as_array) {
        Some(entries) => entries,
        None => {
            return Err(HookscanError::ScanExecution(
                "scanner output has no results array".into(),
            ));
        }
    };

    let mut findings = Vec::new();
    let mut skipped = 0usize;
    for entry in entries {
        match parse_entry(entry, source_root) {
            Some(finding) => findings.push(finding),
            None => {
                skipped += 1;
                debug!(entry = %entry, "Skipped malformed result entry");
            }
        }
    }

    let truncated = findings.len() > max_findings;
    if truncated {
        warn!(
            total = findings.len(),
            cap = max_findings,
            "Findings truncated at configured cap"
        );
        findings.truncate(max_findings);
    }

    let status = if skipped == 0 {
        ScanStatus::Success
    } else if findings.is_empty() {
        ScanStatus::Failed
    } else {
        ScanStatus::Partial
    };

    Ok(NormalizedScan {
        status,
        findings,
        skipped_entries: skipped,
        tool_version,
        truncated,
    })
}

/// One `results[]` entry → one finding, or `None` if any required field is
/// missing, mistyped, or carries a path we refuse to expose.
fn parse_entry(entry: &Value, source_root: &Path) -> Option<Finding> {
    let rule_id = entry.get("check_id")?.as_str()?.to_string();
    let raw_path = entry.get("path")?.as_str()?;
    let path = relativize_path(raw_path, source_root)?;
    let start_line = entry.get("start")?.get("line")?.as_u64()?;
    let end_line = entry
        .get("end")
        .and_then(|e| e.get("line"))
        .and_then(Value::as_u64)
        .unwrap_or(start_line);
    let extra = entry.get("extra")?;
    let severity = Severity::from_tool_str(extra.get("severity")?.as_str()?)?;
    let message = extra.get("message")?.as_str()?.to_string();

    Some(Finding {
        rule_id,
        path,
        start_line,
        end_line,
        severity,
        message,
    })
}

/// Reduce a tool-reported path to a clean path relative to the source root.
/// Absolute paths are re-relativized against the root; anything that still
/// escapes it is rejected so host filesystem layout never leaks.
fn relativize_path(raw: &str, source_root: &Path) -> Option<String> {
    let path = Path::new(raw);
    let relative = if path.is_absolute() {
        path.strip_prefix(source_root).ok()?
    } else {
        path.strip_prefix(".").unwrap_or(path)
    };
    let as_str = relative.to_str()?;
    if as_str.is_empty() || as_str.split('/').any(|seg| seg == "..") {
        return None;
    }
    Some(as_str.to_string())
}
