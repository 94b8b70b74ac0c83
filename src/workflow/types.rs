use serde::Serialize;

/// Outcome of a workflow that completed without error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// Issue path: branch pushed and pull request opened.
    PullRequestOpened { pr_number: u64 },
    /// Issue path: the agent left nothing to commit.
    NoChanges,
    /// Review path: review text posted as a comment.
    ReviewPosted,
    /// Review path: the agent wrote no (or an empty) review.
    ReviewSkipped,
}
