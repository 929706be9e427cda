//! Presence checklist of the well-known artifacts.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::ArtifactKind;

/// One line of the checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistEntry {
    /// The artifact.
    pub artifact: ArtifactKind,
    /// Whether its file exists.
    pub present: bool,
}

/// Presence of all six artifacts at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactChecklist {
    entries: Vec<ChecklistEntry>,
}

impl ArtifactChecklist {
    /// Builds a checklist from a presence predicate.
    pub fn from_fn(mut present: impl FnMut(ArtifactKind) -> bool) -> Self {
        Self {
            entries: ArtifactKind::ALL
                .into_iter()
                .map(|artifact| ChecklistEntry {
                    artifact,
                    present: present(artifact),
                })
                .collect(),
        }
    }

    /// Checks the working directory. Unreadable entries count as absent.
    pub async fn scan(work_dir: &Path) -> Self {
        let mut entries = Vec::with_capacity(ArtifactKind::ALL.len());
        for artifact in ArtifactKind::ALL {
            let present = tokio::fs::try_exists(artifact.path_in(work_dir))
                .await
                .unwrap_or(false);
            entries.push(ChecklistEntry { artifact, present });
        }
        Self { entries }
    }

    /// All entries in canonical order.
    #[must_use]
    pub fn entries(&self) -> &[ChecklistEntry] {
        &self.entries
    }

    /// Returns true if `artifact` was present.
    #[must_use]
    pub fn is_present(&self, artifact: ArtifactKind) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.artifact == artifact && entry.present)
    }

    /// The artifacts that were present.
    pub fn present(&self) -> impl Iterator<Item = ArtifactKind> + '_ {
        self.entries.iter().filter(|e| e.present).map(|e| e.artifact)
    }

    /// File name to presence, as sent to UI consumers.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.entries
            .iter()
            .map(|e| (e.artifact.file_name().to_string(), e.present))
            .collect()
    }
}

impl fmt::Display for ArtifactChecklist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Artifacts:")?;
        for entry in &self.entries {
            let mark = if entry.present { "x" } else { " " };
            write!(f, "\n  [{mark}] {}", entry.artifact)?;
        }
        Ok(())
    }
}
