pub mod issue;
pub mod publish;
pub mod review;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use crate::agent::Agent;
use crate::error::Result;
use crate::platform::types::{ItemKind, WorkItem};
use crate::platform::Platform;
use crate::workspace::WorkingTree;

use types::WorkflowOutcome;

/// Collaborators a workflow drives.
#[derive(Clone)]
pub struct Services {
    pub platform: Arc<dyn Platform>,
    pub workspace: Arc<dyn WorkingTree>,
    pub agent: Arc<dyn Agent>,
    pub branch_prefix: String,
    pub review_file: String,
}

impl Services {
    pub fn issue_branch(&self, issue_number: u64) -> String {
        format!("{}{issue_number}", self.branch_prefix)
    }
}

/// Run the workflow matching the item's kind.
pub async fn process_item(services: &Services, item: &WorkItem) -> Result<WorkflowOutcome> {
    match item.kind {
        ItemKind::Issue => issue::resolve_issue(services, item).await,
        ItemKind::PullRequest => review::review_pull_request(services, item).await,
    }
}

/// Run `steps` with the working tree held, then return it to the main branch
/// whatever the steps returned.
pub(crate) async fn with_working_tree<T, F>(workspace: &dyn WorkingTree, steps: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let result = steps.await;

    if let Err(e) = workspace.restore_main().await {
        tracing::error!(
            branch = workspace.main_branch(),
            error = %e,
            "Failed to return working tree to main branch"
        );
    }

    result
}
