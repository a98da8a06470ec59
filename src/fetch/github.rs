use std::path::PathBuf;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::GithubConfig;
use crate::errors::HookscanError;
use crate::models::ScanRequest;

use super::archive::{extract_archive, resolve_source_root};
use super::workspace::Workspace;
use super::SourceFetcher;

const USER_AGENT: &str = concat!("hookscan/", env!("CARGO_PKG_VERSION"));

/// Fetches repository trees as zipball archives from the GitHub API.
pub struct GithubFetcher {
    client: reqwest::Client,
    api_base: String,
    token: String,
    max_archive_bytes: u64,
}

impl GithubFetcher {
    pub fn new(config: &GithubConfig, max_archive_bytes: u64) -> Result<Self, HookscanError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HookscanError::Config(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            max_archive_bytes,
        })
    }

    fn zipball_url(&self, request: &ScanRequest) -> String {
        // owner/repo/reference passed the validator's allowlist; they cannot
        // smuggle path segments or query strings into the URL.
        format!(
            "{}/repos/{}/{}/zipball/{}",
            self.api_base, request.owner, request.repo, request.reference
        )
    }

    /// Download the zipball into the workspace, counting bytes as they
    /// stream so an oversized archive is cut off mid-transfer, not after.
    async fn download(
        &self,
        request: &ScanRequest,
        archive_path: &std::path::Path,
    ) -> Result<u64, HookscanError> {
        let url = self.zipball_url(request);
        debug!(url = %url, "Downloading repository archive");

        let mut http_request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if !self.token.is_empty() {
            http_request = http_request.bearer_auth(&self.token);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| HookscanError::Fetch(format!("provider request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(HookscanError::RepositoryNotFound(format!(
                    "{} at {}",
                    request.full_name(),
                    request.reference
                )));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(HookscanError::RemoteAuth(format!(
                    "provider returned {} for {}",
                    response.status(),
                    request.full_name()
                )));
            }
            status if !status.is_success() && !status.is_redirection() => {
                return Err(HookscanError::Fetch(format!(
                    "provider returned {} for {}",
                    status,
                    request.full_name()
                )));
            }
            _ => {}
        }

        if let Some(len) = response.content_length() {
            if len > self.max_archive_bytes {
                return Err(HookscanError::FetchTooLarge(format!(
                    "declared {} bytes, limit {}",
                    len, self.max_archive_bytes
                )));
            }
        }

        match self.stream_to_file(response, archive_path).await {
            Ok(received) => Ok(received),
            Err(e) => {
                // A cut-off transfer must not leave a partial archive behind.
                tokio::fs::remove_file(archive_path).await.ok();
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        archive_path: &std::path::Path,
    ) -> Result<u64, HookscanError> {
        let mut file = tokio::fs::File::create(archive_path).await?;
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| HookscanError::Fetch(format!("transfer interrupted: {}", e)))?;
            received += chunk.len() as u64;
            if received > self.max_archive_bytes {
                return Err(HookscanError::FetchTooLarge(format!(
                    "exceeded {} bytes mid-transfer",
                    self.max_archive_bytes
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(received)
    }
}

#[async_trait]
impl SourceFetcher for GithubFetcher {
    async fn fetch(
        &self,
        request: &ScanRequest,
        workspace: &Workspace,
    ) -> Result<PathBuf, HookscanError> {
        let archive_path = workspace.path().join("repo.zip");
        let bytes = self.download(request, &archive_path).await?;
        info!(
            repo = %request.full_name(),
            reference = %request.reference,
            bytes,
            "Archive downloaded"
        );

        let tree_dir = workspace.path().join("tree");
        tokio::fs::create_dir_all(&tree_dir).await?;
        extract_archive(&archive_path, &tree_dir, self.max_archive_bytes).await?;

        // The archive is no longer needed once extracted; reclaim its bytes.
        tokio::fs::remove_file(&archive_path).await.ok();

        resolve_source_root(&tree_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GithubConfig;
    use axum::body::Body;
    use axum::http::StatusCode as HttpStatus;

    fn fetcher() -> GithubFetcher {
        GithubFetcher::new(&GithubConfig::default(), 1024).unwrap()
    }

    fn scan_request() -> ScanRequest {
        ScanRequest {
            owner: "acme".into(),
            repo: "widget".into(),
            reference: "abc123".into(),
            delivery_id: "d-1".into(),
        }
    }

    /// Bind an ephemeral local listener serving `router`, returning its base
    /// URL for use as `api_base`.
    async fn serve_stub(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn fetcher_against(router: axum::Router, max_archive_bytes: u64) -> GithubFetcher {
        let config = GithubConfig {
            token: String::new(),
            api_base: serve_stub(router).await,
        };
        GithubFetcher::new(&config, max_archive_bytes).unwrap()
    }

    #[test]
    fn test_zipball_url_shape() {
        assert_eq!(
            fetcher().zipball_url(&scan_request()),
            "https://api.github.com/repos/acme/widget/zipball/abc123"
        );
    }

    #[tokio::test]
    async fn test_provider_404_maps_to_repository_not_found() {
        let router =
            axum::Router::new().fallback(|| async { (HttpStatus::NOT_FOUND, "missing") });
        let fetcher = fetcher_against(router, 1024).await;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("repo.zip");
        let err = fetcher.download(&scan_request(), &archive).await.unwrap_err();
        assert_eq!(err.kind(), "repository_not_found");
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_provider_auth_failures_map_to_remote_auth() {
        for status in [HttpStatus::UNAUTHORIZED, HttpStatus::FORBIDDEN] {
            let router = axum::Router::new().fallback(move || async move { (status, "denied") });
            let fetcher = fetcher_against(router, 1024).await;

            let dir = tempfile::tempdir().unwrap();
            let err = fetcher
                .download(&scan_request(), &dir.path().join("repo.zip"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "remote_auth");
        }
    }

    #[tokio::test]
    async fn test_declared_oversized_body_rejected_before_writing() {
        // Fixed body, so the stub advertises a Content-Length of 4096.
        let router = axum::Router::new().fallback(|| async { vec![0u8; 4096] });
        let fetcher = fetcher_against(router, 1024).await;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("repo.zip");
        let err = fetcher.download(&scan_request(), &archive).await.unwrap_err();
        assert_eq!(err.kind(), "fetch_too_large");
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_mid_stream_overflow_cut_off_and_cleaned_up() {
        // A streamed body carries no Content-Length, so only the running
        // byte count can catch the overflow.
        let router = axum::Router::new().fallback(|| async {
            let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
                (0..8).map(|_| Ok(vec![0u8; 512])).collect();
            Body::from_stream(futures::stream::iter(chunks))
        });
        let fetcher = fetcher_against(router, 1024).await;

        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("repo.zip");
        let err = fetcher.download(&scan_request(), &archive).await.unwrap_err();
        assert_eq!(err.kind(), "fetch_too_large");
        assert!(!archive.exists());
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let config = GithubConfig {
            token: String::new(),
            api_base: "https://github.example.com/api/v3/".into(),
        };
        let fetcher = GithubFetcher::new(&config, 1024).unwrap();
        let request = ScanRequest {
            owner: "acme".into(),
            repo: "widget".into(),
            reference: "main".into(),
            delivery_id: "d-1".into(),
        };
        assert_eq!(
            fetcher.zipball_url(&request),
            "https://github.example.com/api/v3/repos/acme/widget/zipball/main"
        );
    }
}
