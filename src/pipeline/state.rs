use serde::Serialize;

/// Where a request is in its pipeline run. Stages advance strictly in this
/// order; a failure is reported with the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStage {
    Received,
    Validated,
    Fetching,
    Scanning,
    Normalizing,
    Completed,
}

impl ScanStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Fetching => "fetching",
            Self::Scanning => "scanning",
            Self::Normalizing => "normalizing",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ScanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_serde() {
        let json = serde_json::to_string(&ScanStage::Fetching).unwrap();
        assert_eq!(json, format!("\"{}\"", ScanStage::Fetching));
    }

    #[test]
    fn test_full_stage_progression() {
        let order = [
            ScanStage::Received,
            ScanStage::Validated,
            ScanStage::Fetching,
            ScanStage::Scanning,
            ScanStage::Normalizing,
            ScanStage::Completed,
        ];
        let names: Vec<&str> = order.iter().map(ScanStage::as_str).collect();
        assert_eq!(
            names,
            ["received", "validated", "fetching", "scanning", "normalizing", "completed"]
        );
    }
}
