//! Branch directory
//!
//! The branch list and per-branch inventory are owned elsewhere; this module
//! only defines how the matcher reads them. [`FileDirectory`] serves them
//! from a JSON snapshot (~/.local/share/branch-locator/directory.json by
//! default).

use crate::branch::{Branch, InventoryRow, RegionFilter};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of branches and their inventory
///
/// Failures here are fatal to the request that needed the data.
pub trait BranchDirectory: Send + Sync {
    /// All known branches
    fn branches(&self) -> impl Future<Output = Result<Vec<Branch>>> + Send;

    /// Branches whose address falls in `region`
    fn branches_in_region(
        &self,
        region: &RegionFilter,
    ) -> impl Future<Output = Result<Vec<Branch>>> + Send;

    /// Inventory rows held by the given branches
    fn inventory(
        &self,
        branch_codes: &[String],
    ) -> impl Future<Output = Result<Vec<InventoryRow>>> + Send;
}

/// On-disk directory snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub inventory: Vec<InventoryRow>,
}

/// Directory backed by a JSON file
///
/// The file is re-read on every query so external syncs show up without a
/// restart. A missing file is an empty directory.
#[derive(Debug, Clone)]
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot from disk
    pub async fn load(&self) -> Result<DirectorySnapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "directory file missing, treating as empty");
                return Ok(DirectorySnapshot::default());
            }
            Err(e) => {
                return Err(Error::Directory(format!(
                    "Failed to read directory file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::Directory(format!(
                "Failed to parse directory file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Write a snapshot to disk, creating parent directories
    pub async fn save(&self, snapshot: &DirectorySnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Directory(format!("Failed to create directory folder: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| Error::Directory(format!("Failed to write directory file: {}", e)))
    }
}

impl BranchDirectory for FileDirectory {
    async fn branches(&self) -> Result<Vec<Branch>> {
        Ok(self.load().await?.branches)
    }

    async fn branches_in_region(&self, region: &RegionFilter) -> Result<Vec<Branch>> {
        Ok(self
            .load()
            .await?
            .branches
            .into_iter()
            .filter(|branch| region.matches(&branch.address))
            .collect())
    }

    async fn inventory(&self, branch_codes: &[String]) -> Result<Vec<InventoryRow>> {
        let codes: HashSet<&str> = branch_codes.iter().map(String::as_str).collect();

        Ok(self
            .load()
            .await?
            .inventory
            .into_iter()
            .filter(|row| codes.contains(row.branch_code.as_str()))
            .collect())
    }
}
