mod executor;
mod normalizer;

pub use executor::{RawScanOutput, SemgrepRunner};
pub use normalizer::{normalize, NormalizedScan};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::HookscanError;

/// Seam between the coordinator and the external analysis tool. Production
/// uses [`SemgrepRunner`]; tests inject fakes returning canned output.
#[async_trait]
pub trait ScanRunner: Send + Sync {
    /// Run the tool against `source_root` under `timeout`, returning its raw
    /// machine-readable output. The runner supervises the process lifecycle
    /// only; it never interprets analysis semantics.
    async fn run(
        &self,
        source_root: &Path,
        timeout: Duration,
    ) -> Result<RawScanOutput, HookscanError>;
}
