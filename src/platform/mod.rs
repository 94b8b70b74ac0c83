pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// Hosting API surface used by the poll cycle, scoped to one repository.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Login of the identity the token belongs to.
    async fn authenticated_user(&self) -> Result<String>;

    /// List open issues and pull requests carrying `label`, in listing order.
    async fn list_open_items_with_label(&self, label: &str) -> Result<Vec<WorkItem>>;

    /// Fetch a pull request.
    async fn get_pull_request(&self, pr_number: u64) -> Result<PullRequest>;

    /// Fetch a pull request as a unified diff.
    async fn get_pull_request_diff(&self, pr_number: u64) -> Result<String>;

    /// Create a pull request.
    async fn create_pull_request(&self, pr: &CreatePullRequest) -> Result<PullRequest>;

    /// Post a comment on an issue or PR thread.
    async fn post_comment(&self, issue_number: u64, body: &str) -> Result<()>;
}
