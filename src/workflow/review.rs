use crate::agent::prompt;
use crate::error::Result;
use crate::platform::types::WorkItem;
use crate::workflow::types::WorkflowOutcome;
use crate::workflow::{publish, with_working_tree, Services};

/// Review path: check out the PR's base branch, hand the agent the diff, and
/// post whatever review it writes.
pub async fn review_pull_request(services: &Services, pr: &WorkItem) -> Result<WorkflowOutcome> {
    let details = services.platform.get_pull_request(pr.number).await?;

    with_working_tree(
        services.workspace.as_ref(),
        review_steps(services, pr, &details.base_branch),
    )
    .await
}

async fn review_steps(
    services: &Services,
    pr: &WorkItem,
    base_branch: &str,
) -> Result<WorkflowOutcome> {
    let platform = services.platform.as_ref();
    let workspace = services.workspace.as_ref();

    workspace.fetch().await?;
    workspace.checkout(base_branch).await?;

    let diff = platform.get_pull_request_diff(pr.number).await?;
    let task = prompt::task_for_review(pr.number, &pr.title, &pr.body, &diff, &services.review_file);

    let output = services.agent.run(&task).await?;

    match output.review.filter(|review| !review.trim().is_empty()) {
        Some(review) => {
            publish::post_review(platform, pr.number, &review).await?;
            Ok(WorkflowOutcome::ReviewPosted)
        }
        None => {
            tracing::info!(pr = pr.number, "No review output, skipping comment");
            Ok(WorkflowOutcome::ReviewSkipped)
        }
    }
}
