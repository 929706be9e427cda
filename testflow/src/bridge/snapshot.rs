//! Reading the current artifacts for `file` envelopes.

use std::path::Path;
use tracing::debug;

use super::envelope::FileSnapshot;
use crate::core::ArtifactKind;
use crate::utils::{format_system_time, generate_id};

/// Reads every well-known artifact that currently exists in `work_dir`.
///
/// Files that vanish or cannot be read between listing and reading are left
/// out.
pub async fn snapshot_artifacts(work_dir: &Path) -> Vec<FileSnapshot> {
    let mut snapshots = Vec::new();
    for artifact in ArtifactKind::ALL {
        let path = artifact.path_in(work_dir);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => continue,
        };
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable artifact");
                continue;
            }
        };
        let modified_at = metadata
            .modified()
            .map(format_system_time)
            .unwrap_or_default();

        snapshots.push(FileSnapshot {
            id: generate_id(),
            name: artifact.file_name().to_string(),
            path: path.display().to_string(),
            content,
            kind: artifact.content_kind().to_string(),
            size: metadata.len(),
            modified_at,
        });
    }
    snapshots
}
