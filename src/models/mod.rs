mod finding;
mod request;
mod scan_result;

pub use finding::{Finding, Severity};
pub use request::ScanRequest;
pub use scan_result::{ScanResult, ScanResultMetadata, ScanStatus};
