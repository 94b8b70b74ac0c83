pub mod git;
pub mod manager;

use async_trait::async_trait;

use crate::error::Result;

pub use manager::GitWorkspace;

/// The single shared working tree the workflows mutate.
///
/// Its idle state is "checked out on the main branch"; every workflow calls
/// [`WorkingTree::restore_main`] on all of its exit paths.
#[async_trait]
pub trait WorkingTree: Send + Sync {
    fn main_branch(&self) -> &str;

    /// Checkout an existing branch (local, or tracked from the remote).
    async fn checkout(&self, branch: &str) -> Result<()>;

    /// Fast-forward a checked-out branch from the remote.
    async fn pull(&self, branch: &str) -> Result<()>;

    /// Create and checkout a branch at HEAD.
    async fn create_branch(&self, branch: &str) -> Result<()>;

    /// Stage all changes. Returns whether anything is staged.
    async fn stage_all(&self) -> Result<bool>;

    async fn commit(&self, message: &str) -> Result<()>;

    async fn push(&self, branch: &str) -> Result<()>;

    /// Fetch all remote branches.
    async fn fetch(&self) -> Result<()>;

    /// Return to the main branch, discarding uncommitted changes and untracked
    /// files outside the excluded paths.
    async fn restore_main(&self) -> Result<()>;
}
