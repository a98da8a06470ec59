mod archive;
mod github;
mod workspace;

pub use archive::{extract_archive, resolve_source_root};
pub use github::GithubFetcher;
pub use workspace::{Workspace, WorkspaceManager};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::HookscanError;
use crate::models::ScanRequest;

/// Seam between the coordinator and the hosting provider. Production uses
/// [`GithubFetcher`]; tests inject fixture-writing fakes.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Materialize the repository tree for `request` inside `workspace` and
    /// return the directory holding the actual source root.
    async fn fetch(
        &self,
        request: &ScanRequest,
        workspace: &Workspace,
    ) -> Result<PathBuf, HookscanError>;
}
