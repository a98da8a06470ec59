mod credentials;
mod parser;
mod types;

pub use credentials::resolve_credential;
pub use parser::parse_config;
pub use types::{GithubConfig, LimitsConfig, ScannerConfig, ServiceConfig};
