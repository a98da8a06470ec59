use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Shared secret for webhook signature verification. May be given as a
    /// `$VAR` reference resolved from the environment at load time.
    pub webhook_secret: String,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    /// Bearer credential for the zipball API. `$VAR` references resolve from
    /// the environment at load time.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    #[serde(default = "default_scanner_bin")]
    pub bin: String,
    /// Semgrep ruleset passed as `--config`. Defaults to the registry "auto"
    /// config, matching what the tool does without custom rules.
    #[serde(default = "default_rules")]
    pub rules: String,
    /// Seconds between SIGKILL request and hard kill after a timeout.
    #[serde(default = "default_kill_grace_secs")]
    pub kill_grace_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            bin: default_scanner_bin(),
            rules: default_rules(),
            kill_grace_secs: default_kill_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Overall per-request budget spanning fetch + scan.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
    #[serde(default = "default_max_concurrent_scans")]
    pub max_concurrent_scans: usize,
    /// Total byte budget across all live workspaces.
    #[serde(default = "default_workspace_quota_bytes")]
    pub workspace_quota_bytes: u64,
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
    /// How long a completed result is replayed for a redelivered delivery id.
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            scan_timeout_secs: default_scan_timeout_secs(),
            max_archive_bytes: default_max_archive_bytes(),
            max_concurrent_scans: default_max_concurrent_scans(),
            workspace_quota_bytes: default_workspace_quota_bytes(),
            max_findings: default_max_findings(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.fetch_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.scan_timeout_secs)
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.limits.dedup_ttl_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.scanner.kill_grace_secs)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("hookscan")
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_scanner_bin() -> String {
    "semgrep".to_string()
}

fn default_rules() -> String {
    "auto".to_string()
}

fn default_kill_grace_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_fetch_timeout_secs() -> u64 {
    120
}

fn default_scan_timeout_secs() -> u64 {
    240
}

fn default_max_archive_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_max_concurrent_scans() -> usize {
    4
}

fn default_workspace_quota_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_max_findings() -> usize {
    1000
}

fn default_dedup_ttl_secs() -> u64 {
    600
}
