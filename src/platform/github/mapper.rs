use crate::platform::types::{self, ItemKind};

/// Map an entry of the issue listing to a work item.
///
/// The listing endpoint returns issues and pull requests alike; pull requests
/// are the entries carrying a `pull_request` link.
pub fn map_work_item(issue: octocrab::models::issues::Issue) -> types::WorkItem {
    let kind = if issue.pull_request.is_some() {
        ItemKind::PullRequest
    } else {
        ItemKind::Issue
    };

    types::WorkItem {
        number: issue.number,
        kind,
        author: issue.user.login,
        title: issue.title,
        body: issue.body.unwrap_or_default(),
    }
}

pub fn map_pull_request(pr: octocrab::models::pulls::PullRequest) -> types::PullRequest {
    types::PullRequest {
        number: pr.number,
        title: pr.title.unwrap_or_default(),
        body: pr.body.unwrap_or_default(),
        head_branch: pr.head.ref_field,
        base_branch: pr.base.ref_field,
    }
}
