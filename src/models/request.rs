use serde::{Deserialize, Serialize};

/// A validated webhook delivery, ready for the pipeline. Owner, repo and
/// reference together identify exactly one scan; the delivery id is what the
/// provider reuses when it redelivers the same notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub owner: String,
    pub repo: String,
    pub reference: String,
    pub delivery_id: String,
}

impl ScanRequest {
    /// "owner/repo" as the provider displays it.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let req = ScanRequest {
            owner: "acme".into(),
            repo: "widget".into(),
            reference: "main".into(),
            delivery_id: "d-1".into(),
        };
        assert_eq!(req.full_name(), "acme/widget");
    }
}
