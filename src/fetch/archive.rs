use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::errors::HookscanError;

/// Extract a downloaded zip archive into `dest`. Extraction is CPU/disk bound,
/// so it runs on the blocking pool.
///
/// Every entry name goes through `enclosed_name()`; an entry that would
/// resolve outside `dest` (absolute path or `..` traversal) aborts the whole
/// extraction. Nothing is ever written outside the workspace. Cumulative
/// decompressed bytes are capped at `max_bytes`, so a small archive cannot
/// expand past the workspace's disk reservation.
pub async fn extract_archive(
    archive_path: &Path,
    dest: &Path,
    max_bytes: u64,
) -> Result<(), HookscanError> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&archive_path, &dest, max_bytes))
        .await
        .map_err(|e| HookscanError::Internal(format!("extraction task panicked: {}", e)))?
}

fn extract_blocking(archive_path: &Path, dest: &Path, max_bytes: u64) -> Result<(), HookscanError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| HookscanError::Fetch(format!("not a valid zip archive: {}", e)))?;

    debug!(entries = archive.len(), dest = %dest.display(), "Extracting archive");

    let mut written: u64 = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| HookscanError::Fetch(format!("unreadable archive entry {}: {}", i, e)))?;

        let enclosed = entry.enclosed_name().ok_or_else(|| {
            HookscanError::UnsafeArchiveEntry(format!(
                "entry '{}' resolves outside the workspace",
                entry.name()
            ))
        })?;
        let out_path = dest.join(enclosed);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if written.saturating_add(entry.size()) > max_bytes {
            return Err(expansion_error(max_bytes));
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        // Declared entry sizes can lie, so the copy itself is capped too.
        let allowed = max_bytes - written;
        let copied = std::io::copy(&mut (&mut entry).take(allowed.saturating_add(1)), &mut out_file)?;
        written = written.saturating_add(copied);
        if copied > allowed {
            return Err(expansion_error(max_bytes));
        }
    }

    Ok(())
}

fn expansion_error(max_bytes: u64) -> HookscanError {
    HookscanError::FetchTooLarge(format!(
        "archive expands past {} bytes during extraction",
        max_bytes
    ))
}

/// GitHub zipballs wrap the tree in a single `owner-repo-sha/` directory.
/// When `dest` holds exactly one directory and nothing else, that directory is
/// the source root; otherwise `dest` itself is.
pub fn resolve_source_root(dest: &Path) -> Result<PathBuf, HookscanError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dest)? {
        entries.push(entry?.path());
    }
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Ok(dest.to_path_buf()),
    }
}
