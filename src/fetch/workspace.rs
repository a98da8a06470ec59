use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::errors::HookscanError;

/// Hands out per-request workspace directories under one root and enforces
/// the total disk byte budget across all live workspaces.
pub struct WorkspaceManager {
    root: PathBuf,
    quota_bytes: u64,
    /// Bytes reserved up front for each workspace (the archive transfer cap).
    reservation_bytes: u64,
    reserved: Arc<AtomicU64>,
}

impl WorkspaceManager {
    pub fn new(root: &Path, quota_bytes: u64, reservation_bytes: u64) -> Self {
        Self {
            root: root.to_path_buf(),
            quota_bytes,
            reservation_bytes,
            reserved: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Allocate an exclusive workspace, reserving its byte budget. Fails fast
    /// when the quota cannot admit another reservation.
    pub async fn allocate(&self) -> Result<Workspace, HookscanError> {
        let mut current = self.reserved.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(self.reservation_bytes);
            if next > self.quota_bytes {
                return Err(HookscanError::ResourceExhausted(format!(
                    "workspace quota: {} of {} bytes reserved",
                    current, self.quota_bytes
                )));
            }
            match self.reserved.compare_exchange(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let dir = tempfile::Builder::new()
            .prefix("scan-")
            .tempdir_in(&self.root)
            .map_err(|e| {
                self.reserved
                    .fetch_sub(self.reservation_bytes, Ordering::AcqRel);
                HookscanError::Io(e)
            })?;

        Ok(Workspace {
            dir,
            reserved: self.reserved.clone(),
            reservation_bytes: self.reservation_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove workspace directories left behind by a previous process. Run at
    /// startup; anything older than `max_age` cannot belong to a live request.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<usize, HookscanError> {
        if !self.root.is_dir() {
            return Ok(0);
        }
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0usize;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable workspace entry");
                    continue;
                }
            };
            if modified < cutoff {
                match tokio::fs::remove_dir_all(&path).await {
                    Ok(()) => {
                        info!(path = %path.display(), "Removed stale workspace");
                        removed += 1;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove stale workspace");
                    }
                }
            }
        }
        Ok(removed)
    }
}

/// An exclusively owned scratch directory for one in-flight request. The
/// directory and its quota reservation are released on drop, on every exit
/// path.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    reserved: Arc<AtomicU64>,
    reservation_bytes: u64,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.reserved
            .fetch_sub(self.reservation_bytes, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_creates_directory_under_root() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path(), 1024, 256);
        let ws = manager.allocate().await.unwrap();
        assert!(ws.path().is_dir());
        assert!(ws.path().starts_with(root.path()));
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path(), 1024, 256);
        let ws = manager.allocate().await.unwrap();
        let path = ws.path().to_path_buf();
        drop(ws);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_quota_exhaustion_fails_fast() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path(), 512, 256);
        let _a = manager.allocate().await.unwrap();
        let _b = manager.allocate().await.unwrap();
        let err = manager.allocate().await.unwrap_err();
        assert_eq!(err.kind(), "resource_exhausted");
    }

    #[tokio::test]
    async fn test_quota_released_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path(), 256, 256);
        let ws = manager.allocate().await.unwrap();
        assert!(manager.allocate().await.is_err());
        drop(ws);
        assert!(manager.allocate().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sweep_removes_only_old_directories() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("scan-stale");
        std::fs::create_dir(&stale).unwrap();
        // Backdate the stale directory well past any cutoff.
        let old = SystemTime::now() - Duration::from_secs(7200);
        let file_time = filetime_from(old);
        set_dir_mtime(&stale, file_time);

        let fresh = root.path().join("scan-fresh");
        std::fs::create_dir(&fresh).unwrap();

        let manager = WorkspaceManager::new(root.path(), 1024, 256);
        let removed = manager.sweep_stale(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[cfg(unix)]
    fn filetime_from(t: SystemTime) -> (i64, u32) {
        let d = t.duration_since(SystemTime::UNIX_EPOCH).unwrap();
        (d.as_secs() as i64, d.subsec_nanos())
    }

    #[cfg(unix)]
    fn set_dir_mtime(path: &Path, (secs, _nanos): (i64, u32)) {
        use std::process::Command;
        let stamp = chrono::DateTime::from_timestamp(secs, 0)
            .unwrap()
            .format("%Y%m%d%H%M")
            .to_string();
        let status = Command::new("touch")
            .args(["-t", &stamp])
            .arg(path)
            .status()
            .unwrap();
        assert!(status.success());
    }
}
