//! Drive-to-filesystem replication.
//!
//! A sync run is destructive and best-effort:
//!
//! 1. [`clear`] empties the output directory so nothing stale survives.
//! 2. [`Replicator::walk`] lists each folder page by page, depth first,
//!    creating a local directory per Drive folder.
//! 3. Every exportable document is downloaded, its links rewritten, front
//!    matter prepended and the result written next to its siblings.
//!
//! Failures are handled at the smallest scope that can continue: a file that
//! cannot be exported is logged and skipped, a folder that cannot be listed
//! is logged and its subtree skipped. Only failing to clear the output
//! directory aborts the run.
//!
//! Everything happens sequentially: one request is in flight at a time.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::SyncSettings;
use crate::drive::{DriveApi, DriveEntry};
use crate::errors::{ExportError, SyncError};
use crate::markdown::FrontMatter;

/// Counters from a single sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub folders_created: usize,
    pub documents_exported: usize,
    /// Entries skipped on purpose (unsupported type, no export link).
    pub skipped: usize,
    /// Documents whose download or write failed.
    pub failed: usize,
    /// Folders whose listing failed; their subtrees are missing.
    pub listing_failures: usize,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl SyncStats {
    /// Whether every listed entry made it to disk or was skipped on purpose.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.listing_failures == 0
    }
}

/// Remove everything inside `local_root`, then make sure it exists.
pub async fn clear(local_root: &Path) -> Result<(), SyncError> {
    let wrap = |source| SyncError::Clear {
        path: local_root.to_path_buf(),
        source,
    };

    match tokio::fs::read_dir(local_root).await {
        Ok(mut entries) => {
            while let Some(entry) = entries.next_entry().await.map_err(wrap)? {
                let path = entry.path();
                // file_type() does not follow symlinks, so a link to a
                // directory is unlinked rather than emptied.
                let file_type = entry.file_type().await.map_err(wrap)?;
                if file_type.is_dir() {
                    tokio::fs::remove_dir_all(&path).await.map_err(wrap)?;
                } else {
                    tokio::fs::remove_file(&path).await.map_err(wrap)?;
                }
                debug!(path = %path.display(), "removed");
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(wrap(e)),
    }

    tokio::fs::create_dir_all(local_root).await.map_err(wrap)?;
    Ok(())
}

/// Mirrors a Drive folder tree into a local directory.
pub struct Replicator<'a, A: DriveApi + ?Sized> {
    api: &'a A,
    settings: &'a SyncSettings,
}

impl<'a, A: DriveApi + ?Sized> Replicator<'a, A> {
    pub fn new(api: &'a A, settings: &'a SyncSettings) -> Self {
        Self { api, settings }
    }

    /// Clear `local_root`, then replicate `root_folder_id` into it.
    ///
    /// Per-file and per-folder failures are counted in the returned stats,
    /// not returned as errors.
    pub async fn run(
        &self,
        root_folder_id: &str,
        drive_id: &str,
        local_root: &Path,
    ) -> Result<SyncStats, SyncError> {
        let mut stats = SyncStats {
            started_at: Utc::now().to_rfc3339(),
            ..Default::default()
        };

        info!(path = %local_root.display(), "clearing output directory");
        clear(local_root).await?;

        info!(
            root_folder_id,
            drive_id,
            path = %local_root.display(),
            "starting replication"
        );
        self.walk(root_folder_id, drive_id, local_root, &mut stats)
            .await;

        stats.completed_at = Some(Utc::now().to_rfc3339());
        info!(
            folders = stats.folders_created,
            exported = stats.documents_exported,
            skipped = stats.skipped,
            failed = stats.failed,
            listing_failures = stats.listing_failures,
            "replication complete"
        );
        Ok(stats)
    }

    /// Replicate the children of `parent_id` into `local_path`.
    pub async fn walk(
        &self,
        parent_id: &str,
        drive_id: &str,
        local_path: &Path,
        stats: &mut SyncStats,
    ) {
        let mut page_token: Option<String> = None;
        let mut first_page = true;

        loop {
            let page = match self
                .api
                .list_children(parent_id, drive_id, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        path = %local_path.display(),
                        parent_id,
                        error = %e,
                        "failed to list folder, skipping its remaining entries"
                    );
                    stats.listing_failures += 1;
                    return;
                }
            };

            // An empty first page ends the branch, even with a continuation token.
            if first_page && page.files.is_empty() {
                info!(path = %local_path.display(), "no files or folders found");
                break;
            }
            first_page = false;

            for entry in &page.files {
                self.replicate_entry(entry, drive_id, local_path, stats)
                    .await;
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
    }

    async fn replicate_entry(
        &self,
        entry: &DriveEntry,
        drive_id: &str,
        local_path: &Path,
        stats: &mut SyncStats,
    ) {
        if entry.is_folder() {
            let dir = local_path.join(entry.local_name());
            info!(path = %dir.display(), "creating directory");
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                error!(path = %dir.display(), error = %e, "failed to create directory");
                stats.failed += 1;
                return;
            }
            stats.folders_created += 1;
            Box::pin(self.walk(&entry.id, drive_id, &dir, stats)).await;
            return;
        }

        if self
            .settings
            .export_formats
            .lookup(&entry.mime_type)
            .is_none()
        {
            info!(
                name = %entry.name,
                mime_type = %entry.mime_type,
                "skipping non-Google Doc file"
            );
            stats.skipped += 1;
            return;
        }

        match self.export_doc(entry, local_path).await {
            Ok(path) => {
                info!(path = %path.display(), "exported document");
                stats.documents_exported += 1;
            }
            Err(e @ ExportError::MissingExportLink { .. }) => {
                warn!(error = %e, "skipping document");
                stats.skipped += 1;
            }
            Err(e @ ExportError::UnsupportedMimeType { .. }) => {
                info!(name = %entry.name, error = %e, "skipping document");
                stats.skipped += 1;
            }
            Err(e) => {
                error!(name = %entry.name, id = %entry.id, error = %e, "failed to export document");
                stats.failed += 1;
            }
        }
    }

    /// Export one document into `target_dir` and return the written path.
    pub async fn export_doc(
        &self,
        entry: &DriveEntry,
        target_dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let format = self
            .settings
            .export_formats
            .lookup(&entry.mime_type)
            .ok_or_else(|| ExportError::UnsupportedMimeType {
                mime_type: entry.mime_type.clone(),
            })?;

        let url = entry
            .export_link(&format.target_mime)
            .ok_or_else(|| ExportError::MissingExportLink {
                name: entry.name.clone(),
                target: format.target_mime.clone(),
            })?;

        info!(name = %entry.name, extension = %format.extension, "exporting document");
        let body = self.api.export(url).await?;
        let body = self.settings.links.rewrite(&body);

        let front_matter = FrontMatter::for_document(
            &entry.id,
            entry.modified_time.as_deref(),
            self.settings.root_doc_id.as_deref(),
        );

        let path = target_dir.join(format!("{}{}", entry.local_name(), format.extension));
        tokio::fs::write(&path, front_matter.prepend_to(&body))
            .await
            .map_err(|source| ExportError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
