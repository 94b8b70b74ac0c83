use crate::error::Result;
use crate::platform::types::{CreatePullRequest, PullRequest};
use crate::platform::Platform;

/// Open a pull request for an issue branch, closing the issue on merge.
pub async fn open_issue_pull_request(
    platform: &dyn Platform,
    issue_number: u64,
    head_branch: &str,
    base_branch: &str,
) -> Result<PullRequest> {
    let pr = platform
        .create_pull_request(&CreatePullRequest {
            title: format!("Address issue #{issue_number}"),
            body: format!("This PR addresses issue #{issue_number}. Closes #{issue_number}"),
            head_branch: head_branch.to_string(),
            base_branch: base_branch.to_string(),
        })
        .await?;

    tracing::info!(issue = issue_number, pr = pr.number, "Opened pull request");
    Ok(pr)
}

/// Post review text on a pull request's thread.
pub async fn post_review(platform: &dyn Platform, pr_number: u64, review: &str) -> Result<()> {
    platform.post_comment(pr_number, review).await?;
    tracing::info!(pr = pr_number, "Posted review comment");
    Ok(())
}
