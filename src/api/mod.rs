mod errors;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::fetch::{GithubFetcher, SourceFetcher, WorkspaceManager};
use crate::pipeline::ScanPipeline;
use crate::scan::{ScanRunner, SemgrepRunner};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub pipeline: Arc<ScanPipeline>,
    pub workspaces: Arc<WorkspaceManager>,
}

/// Wire up the production fetcher and runner. Tests build their own
/// `AppState` with fakes behind the same seams.
pub fn create_app_state(config: Arc<ServiceConfig>) -> Result<AppState, crate::errors::HookscanError> {
    let fetcher: Arc<dyn SourceFetcher> = Arc::new(GithubFetcher::new(
        &config.github,
        config.limits.max_archive_bytes,
    )?);
    let runner: Arc<dyn ScanRunner> = Arc::new(SemgrepRunner::new(&config.scanner));
    let workspaces = Arc::new(WorkspaceManager::new(
        &config.workspace_root,
        config.limits.workspace_quota_bytes,
        config.limits.max_archive_bytes,
    ));
    let pipeline = Arc::new(ScanPipeline::new(
        config.clone(),
        fetcher,
        runner,
        workspaces.clone(),
    ));
    Ok(AppState {
        config,
        pipeline,
        workspaces,
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(routes::webhook::handle_webhook))
        .route("/health", get(routes::health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
