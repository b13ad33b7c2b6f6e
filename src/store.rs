//! On-disk layout for captured screenshots, generated diffs, and published
//! artifacts. Filenames are random UUIDs so concurrent requests never collide
//! and stale results never get overwritten by name reuse.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, VrtError};

/// Outcome counts for [`ArtifactStore::cleanup`].
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub screenshots_removed: u64,
    pub diffs_removed: u64,
    pub uploads_removed: u64,
}

impl CleanupSummary {
    pub fn total(&self) -> u64 {
        self.screenshots_removed + self.diffs_removed + self.uploads_removed
    }
}

/// Rooted directory tree holding the three artifact classes.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join("screenshots")
    }

    pub fn diffs_dir(&self) -> PathBuf {
        self.root.join("diffs")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    /// Creates all three directories. Idempotent.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.screenshots_dir(), self.diffs_dir(), self.uploads_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        debug!(root = %self.root.display(), "artifact directories ready");
        Ok(())
    }

    /// Fresh UUID-named destination for a screenshot capture.
    pub fn allocate_screenshot(&self) -> PathBuf {
        self.screenshots_dir().join(format!("{}.png", Uuid::new_v4()))
    }

    /// Fresh UUID-named destination for a diff image.
    pub fn allocate_diff(&self) -> PathBuf {
        self.diffs_dir().join(format!("diff-{}.png", Uuid::new_v4()))
    }

    /// Copies an artifact into `uploads/` under its own filename, making it
    /// available to external consumers without moving the original.
    pub fn publish(&self, artifact: &Path) -> Result<PathBuf> {
        let name = artifact.file_name().ok_or_else(|| {
            VrtError::Config(format!(
                "cannot publish {}: not a file path",
                artifact.display()
            ))
        })?;
        let dest = self.uploads_dir().join(name);
        std::fs::copy(artifact, &dest)?;
        info!(from = %artifact.display(), to = %dest.display(), "artifact published");
        Ok(dest)
    }

    /// Deletes generated `.png` files from all three directories, leaving any
    /// other file type in place. Missing directories count as already clean.
    pub fn cleanup(&self) -> Result<CleanupSummary> {
        let mut summary = CleanupSummary::default();
        summary.screenshots_removed = remove_pngs(&self.screenshots_dir())?;
        summary.diffs_removed = remove_pngs(&self.diffs_dir())?;
        summary.uploads_removed = remove_pngs(&self.uploads_dir())?;
        info!(removed = summary.total(), "artifact cleanup finished");
        Ok(summary)
    }
}

fn remove_pngs(dir: &Path) -> Result<u64> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_png = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if path.is_file() && is_png {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
