//! Durable record of work items that completed their workflow.
//!
//! One JSON file per item kind, each a flat array of item numbers. A missing
//! file reads as empty; a malformed one is an error. Additions re-read the
//! file and rewrite it in full.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::StateConfig;
use crate::error::{AppError, Result};
use crate::platform::types::ItemKind;

/// Snapshot of processed item numbers, read once per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    pub issues: BTreeSet<u64>,
    pub pull_requests: BTreeSet<u64>,
}

impl ProcessedSet {
    pub fn contains(&self, kind: ItemKind, number: u64) -> bool {
        match kind {
            ItemKind::Issue => self.issues.contains(&number),
            ItemKind::PullRequest => self.pull_requests.contains(&number),
        }
    }
}

pub struct ProcessedStore {
    issues_path: PathBuf,
    pull_requests_path: PathBuf,
}

impl ProcessedStore {
    pub fn new(dir: &Path, config: &StateConfig) -> Self {
        Self {
            issues_path: dir.join(&config.issues_file),
            pull_requests_path: dir.join(&config.pull_requests_file),
        }
    }

    fn path_for(&self, kind: ItemKind) -> &Path {
        match kind {
            ItemKind::Issue => &self.issues_path,
            ItemKind::PullRequest => &self.pull_requests_path,
        }
    }

    /// Read both sets in full.
    pub async fn load(&self) -> Result<ProcessedSet> {
        Ok(ProcessedSet {
            issues: read_numbers(&self.issues_path).await?.into_iter().collect(),
            pull_requests: read_numbers(&self.pull_requests_path)
                .await?
                .into_iter()
                .collect(),
        })
    }

    /// Record `number` as processed for `kind`. Returns false if it was already recorded.
    pub async fn mark(&self, kind: ItemKind, number: u64) -> Result<bool> {
        let path = self.path_for(kind);
        let mut numbers = read_numbers(path).await?;
        if numbers.contains(&number) {
            return Ok(false);
        }
        numbers.push(number);
        write_numbers(path, &numbers).await?;

        tracing::debug!(kind = %kind, number, path = %path.display(), "Recorded processed item");
        Ok(true)
    }
}

async fn read_numbers(path: &Path) -> Result<Vec<u64>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content)
        .map_err(|e| AppError::Store(format!("Malformed state file {}: {e}", path.display())))
}

async fn write_numbers(path: &Path, numbers: &[u64]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(numbers)?;

    // Write a sibling and rename so a crash never leaves a truncated file
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
