use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::WorkspaceConfig;
use crate::error::Result;
use crate::workspace::{git, WorkingTree};

/// The configured repository checkout, driven through libgit2.
pub struct GitWorkspace {
    repo_dir: PathBuf,
    remote: String,
    main_branch: String,
    token: String,
    author: (String, String),
    /// Paths (relative to the repository root) never staged.
    excluded: Vec<PathBuf>,
}

impl GitWorkspace {
    pub fn new(config: &WorkspaceConfig, token: &str, excluded: Vec<PathBuf>) -> Self {
        Self {
            repo_dir: config.repo_dir.clone(),
            remote: config.remote.clone(),
            main_branch: config.main_branch.clone(),
            token: token.to_string(),
            author: (config.author_name.clone(), config.author_email.clone()),
            excluded,
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }
}

#[async_trait]
impl WorkingTree for GitWorkspace {
    fn main_branch(&self) -> &str {
        &self.main_branch
    }

    async fn checkout(&self, branch: &str) -> Result<()> {
        tracing::debug!(branch, "git checkout");
        git::checkout(&self.repo_dir, &self.remote, branch).await
    }

    async fn pull(&self, branch: &str) -> Result<()> {
        tracing::debug!(branch, remote = %self.remote, "git pull");
        git::pull(&self.repo_dir, &self.remote, branch, &self.token).await
    }

    async fn create_branch(&self, branch: &str) -> Result<()> {
        tracing::debug!(branch, "git branch");
        git::create_branch(&self.repo_dir, branch).await
    }

    async fn stage_all(&self) -> Result<bool> {
        git::add_all(&self.repo_dir, &self.excluded).await
    }

    async fn commit(&self, message: &str) -> Result<()> {
        git::commit(&self.repo_dir, message, (&self.author.0, &self.author.1)).await
    }

    async fn push(&self, branch: &str) -> Result<()> {
        tracing::debug!(branch, remote = %self.remote, "git push");
        git::push(&self.repo_dir, &self.remote, branch, &self.token).await
    }

    async fn fetch(&self) -> Result<()> {
        tracing::debug!(remote = %self.remote, "git fetch");
        git::fetch(&self.repo_dir, &self.remote, &self.token).await
    }

    async fn restore_main(&self) -> Result<()> {
        git::force_checkout(&self.repo_dir, &self.main_branch).await?;
        let removed = git::remove_untracked(&self.repo_dir, &self.excluded).await?;
        if removed > 0 {
            tracing::info!(removed, "Removed untracked files left by the agent");
        }
        Ok(())
    }
}

/// Paths under `repo_dir` that the workspace must never stage: the agent
/// handoff files and, when it lives inside the repository, the state directory.
pub fn excluded_paths(repo_dir: &Path, state_dir: &Path, handoff_files: &[&str]) -> Vec<PathBuf> {
    let mut excluded: Vec<PathBuf> = handoff_files.iter().map(PathBuf::from).collect();
    let relative_state = state_dir
        .strip_prefix(repo_dir)
        .ok()
        .map(Path::to_path_buf)
        .or_else(|| {
            let root = repo_dir.canonicalize().ok()?;
            let state = state_dir.canonicalize().ok()?;
            state.strip_prefix(root).ok().map(Path::to_path_buf)
        });
    if let Some(path) = relative_state.filter(|p| !p.as_os_str().is_empty()) {
        excluded.push(path);
    }
    excluded
}
