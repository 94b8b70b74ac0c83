use crate::agent::prompt;
use crate::error::Result;
use crate::platform::types::WorkItem;
use crate::workflow::types::WorkflowOutcome;
use crate::workflow::{publish, with_working_tree, Services};

/// Issue path: branch off a fresh main, let the agent change the tree, then
/// commit, push and open a pull request that closes the issue.
pub async fn resolve_issue(services: &Services, issue: &WorkItem) -> Result<WorkflowOutcome> {
    with_working_tree(services.workspace.as_ref(), issue_steps(services, issue)).await
}

async fn issue_steps(services: &Services, issue: &WorkItem) -> Result<WorkflowOutcome> {
    let workspace = services.workspace.as_ref();
    let main = workspace.main_branch();
    let branch = services.issue_branch(issue.number);

    workspace.checkout(main).await?;
    workspace.pull(main).await?;
    workspace.create_branch(&branch).await?;
    tracing::info!(issue = issue.number, branch = %branch, "Created issue branch");

    services
        .agent
        .run(&prompt::task_for_issue(&issue.body))
        .await?;

    if !workspace.stage_all().await? {
        tracing::warn!(issue = issue.number, "Agent left no changes to commit");
        return Ok(WorkflowOutcome::NoChanges);
    }

    workspace
        .commit(&format!("Address issue #{}", issue.number))
        .await?;
    workspace.push(&branch).await?;

    let pr = publish::open_issue_pull_request(services.platform.as_ref(), issue.number, &branch, main)
        .await?;

    Ok(WorkflowOutcome::PullRequestOpened {
        pr_number: pr.number,
    })
}
