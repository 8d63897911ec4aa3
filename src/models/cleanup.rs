use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use super::{catalog::Catalog, extract::staging_dir};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupReason {
    PartialDownload,
    StaleExtraction,
    ExtractedArchive,
}

impl CleanupReason {
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            CleanupReason::PartialDownload => "interrupted download",
            CleanupReason::StaleExtraction => "interrupted extraction",
            CleanupReason::ExtractedArchive => "archive already extracted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupItem {
    pub id: String,
    pub path: PathBuf,
    pub reason: CleanupReason,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    items: Vec<CleanupItem>,
}

impl CleanupPlan {
    #[must_use]
    pub fn items(&self) -> &[CleanupItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.items.iter().map(|item| item.size_bytes).sum()
    }
}

/// Lists leftovers in `models_dir` that belong to catalog entries. Reads the
/// file system only; nothing is deleted.
#[must_use]
pub fn plan(catalog: &Catalog, models_dir: &Path) -> CleanupPlan {
    let mut items = Vec::new();
    for descriptor in catalog.all() {
        let mut push = |path: PathBuf, reason| {
            if path.exists() {
                items.push(CleanupItem {
                    id: descriptor.id.clone(),
                    size_bytes: total_size(&path),
                    path,
                    reason,
                });
            }
        };

        push(
            descriptor.staging_path(models_dir),
            CleanupReason::PartialDownload,
        );
        if let Some(member_dir) = descriptor.extract_dir.as_deref() {
            push(
                staging_dir(models_dir, member_dir),
                CleanupReason::StaleExtraction,
            );
            if models_dir.join(member_dir).exists() {
                push(
                    descriptor.artifact_path(models_dir),
                    CleanupReason::ExtractedArchive,
                );
            }
        }
    }
    CleanupPlan { items }
}

/// Deletes exactly the paths in `plan`. Returns the bytes reclaimed.
pub fn apply(plan: &CleanupPlan) -> Result<u64> {
    let mut reclaimed = 0;
    for item in plan.items() {
        if !item.path.exists() {
            continue;
        }
        if item.path.is_dir() {
            fs::remove_dir_all(&item.path)
        } else {
            fs::remove_file(&item.path)
        }
        .with_context(|| format!("remove {}", item.path.display()))?;
        tracing::info!(model = %item.id, path = %item.path.display(), reason = item.reason.describe(), "removed");
        reclaimed += item.size_bytes;
    }
    Ok(reclaimed)
}

fn total_size(path: &Path) -> u64 {
    if path.is_file() {
        return fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    }
    let mut size = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            size += total_size(&entry.path());
        }
    }
    size
}
