use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::errors::HookscanError;
use crate::fetch::{SourceFetcher, WorkspaceManager};
use crate::models::{ScanRequest, ScanResult, ScanResultMetadata};
use crate::scan::{normalize, ScanRunner};

use super::dedup::DeliveryCache;
use super::state::ScanStage;

/// Drives one validated request through fetch → scan → normalize, owning the
/// per-request workspace, the joint deadline, and the scan slot pool.
pub struct ScanPipeline {
    config: Arc<ServiceConfig>,
    fetcher: Arc<dyn SourceFetcher>,
    runner: Arc<dyn ScanRunner>,
    workspaces: Arc<WorkspaceManager>,
    scan_slots: Arc<Semaphore>,
    recent_deliveries: DeliveryCache,
}

impl ScanPipeline {
    pub fn new(
        config: Arc<ServiceConfig>,
        fetcher: Arc<dyn SourceFetcher>,
        runner: Arc<dyn ScanRunner>,
        workspaces: Arc<WorkspaceManager>,
    ) -> Self {
        let scan_slots = Arc::new(Semaphore::new(config.limits.max_concurrent_scans));
        let recent_deliveries = DeliveryCache::new(config.dedup_ttl());
        Self {
            config,
            fetcher,
            runner,
            workspaces,
            scan_slots,
            recent_deliveries,
        }
    }

    /// Process one delivery to completion. The workspace is removed on every
    /// exit path; the deadline spans slot wait + fetch + scan jointly.
    pub async fn process(&self, request: ScanRequest) -> Result<ScanResult, HookscanError> {
        if let Some(cached) = self.recent_deliveries.get(&request) {
            info!(delivery_id = %request.delivery_id, "Duplicate delivery, replaying result");
            return Ok(cached);
        }

        let scan_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let deadline = started + self.config.request_timeout();

        info!(
            scan_id = %scan_id,
            repo = %request.full_name(),
            reference = %request.reference,
            delivery_id = %request.delivery_id,
            stage = %ScanStage::Received,
            "Pipeline started"
        );

        // Queueing for a slot counts against the request's own deadline.
        let _permit = tokio::time::timeout_at(deadline, self.scan_slots.acquire())
            .await
            .map_err(|_| {
                HookscanError::QueueTimeout(format!(
                    "no scan slot within {}s",
                    self.config.limits.request_timeout_secs
                ))
            })?
            .map_err(|_| HookscanError::Internal("scan slot pool closed".into()))?;

        let workspace = self.workspaces.allocate().await.map_err(|e| {
            self.log_failure(&request, ScanStage::Fetching, &e);
            e
        })?;
        debug!(
            delivery_id = %request.delivery_id,
            stage = %ScanStage::Validated,
            "Scan slot and workspace acquired"
        );

        // The workspace guard drops (and its directory is removed) whether
        // the stages succeed or fail.
        let outcome = self
            .run_stages(&request, &scan_id, &workspace, started, deadline)
            .await;
        drop(workspace);

        match outcome {
            Ok(result) => {
                info!(
                    scan_id = %scan_id,
                    delivery_id = %request.delivery_id,
                    stage = %ScanStage::Completed,
                    status = %serde_json::to_string(&result.status).unwrap_or_default(),
                    findings = result.findings.len(),
                    skipped = result.skipped_entries,
                    duration_ms = result.metadata.duration_ms,
                    "Pipeline completed"
                );
                self.recent_deliveries.insert(&request, &result);
                Ok(result)
            }
            Err(e) => Err(e),
        }
    }

    async fn run_stages(
        &self,
        request: &ScanRequest,
        scan_id: &str,
        workspace: &crate::fetch::Workspace,
        started: Instant,
        deadline: Instant,
    ) -> Result<ScanResult, HookscanError> {
        // Fetching: bounded by its own cap and by whatever remains of the
        // joint deadline.
        debug!(delivery_id = %request.delivery_id, stage = %ScanStage::Fetching, "Fetching source");
        let fetch_budget = stage_budget(deadline, self.config.fetch_timeout())
            .ok_or_else(|| deadline_error(ScanStage::Fetching))?;
        let source_root =
            tokio::time::timeout(fetch_budget, self.fetcher.fetch(request, workspace))
                .await
                .map_err(|_| deadline_error(ScanStage::Fetching))?
                .map_err(|e| {
                    self.log_failure(request, ScanStage::Fetching, &e);
                    e
                })?;

        // Scanning gets only what the fetch left over.
        debug!(delivery_id = %request.delivery_id, stage = %ScanStage::Scanning, "Running scanner");
        let scan_budget = stage_budget(deadline, self.config.scan_timeout())
            .ok_or_else(|| deadline_error(ScanStage::Scanning))?;
        let raw = self
            .runner
            .run(&source_root, scan_budget)
            .await
            .map_err(|e| {
                self.log_failure(request, ScanStage::Scanning, &e);
                e
            })?;

        debug!(delivery_id = %request.delivery_id, stage = %ScanStage::Normalizing, "Normalizing output");
        let normalized = normalize(&raw.stdout, &source_root, self.config.limits.max_findings)
            .map_err(|e| {
                self.log_failure(request, ScanStage::Normalizing, &e);
                e
            })?;

        let severity_counts = ScanResultMetadata::count_severities(&normalized.findings);
        Ok(ScanResult {
            repository: request.full_name(),
            reference: request.reference.clone(),
            delivery_id: request.delivery_id.clone(),
            status: normalized.status,
            findings: normalized.findings,
            skipped_entries: normalized.skipped_entries,
            metadata: ScanResultMetadata {
                scan_id: scan_id.to_string(),
                duration_ms: started.elapsed().as_millis() as u64,
                tool_version: normalized.tool_version,
                truncated: normalized.truncated,
                severity_counts,
            },
        })
    }

    fn log_failure(&self, request: &ScanRequest, stage: ScanStage, error: &HookscanError) {
        match error {
            HookscanError::ScanTimeout(_) | HookscanError::DeadlineExceeded(_) => {
                warn!(
                    delivery_id = %request.delivery_id,
                    stage = %stage,
                    error = %error,
                    "Pipeline stage timed out"
                );
            }
            _ => {
                error!(
                    delivery_id = %request.delivery_id,
                    stage = %stage,
                    error_kind = error.kind(),
                    error = %error,
                    "Pipeline stage failed"
                );
            }
        }
    }
}

/// Budget for the next stage: its configured cap, shrunk to the time left
/// before the joint deadline. `None` when the deadline has already passed.
fn stage_budget(deadline: Instant, cap: Duration) -> Option<Duration> {
    let remaining = deadline.checked_duration_since(Instant::now())?;
    if remaining.is_zero() {
        return None;
    }
    Some(remaining.min(cap))
}

fn deadline_error(stage: ScanStage) -> HookscanError {
    HookscanError::DeadlineExceeded(format!("request deadline elapsed during {}", stage))
}
