use async_trait::async_trait;
use octocrab::{params, Octocrab};

use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::mapper;

/// GitHub implementation of [`Platform`], authenticated with a personal token
/// and bound to a single repository.
pub struct GitHubPlatform {
    client: Octocrab,
    repo: RepoCoordinates,
}

impl GitHubPlatform {
    pub fn new(token: &str, repo: RepoCoordinates, api_url: Option<&str>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(url) = api_url {
            builder = builder
                .base_uri(url)
                .map_err(|e| AppError::Config(format!("Invalid GitHub API URL {url}: {e}")))?;
        }

        let client = builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self { client, repo })
    }

    pub fn repo(&self) -> &RepoCoordinates {
        &self.repo
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn authenticated_user(&self) -> Result<String> {
        let user = self
            .client
            .current()
            .user()
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to fetch authenticated user: {e}")))?;

        Ok(user.login)
    }

    async fn list_open_items_with_label(&self, label: &str) -> Result<Vec<WorkItem>> {
        let labels = vec![label.to_string()];

        let first_page = self
            .client
            .issues(&self.repo.owner, &self.repo.name)
            .list()
            .state(params::State::Open)
            .labels(&labels)
            .per_page(100)
            .send()
            .await?;

        let issues = self.client.all_pages(first_page).await?;

        Ok(issues.into_iter().map(mapper::map_work_item).collect())
    }

    async fn get_pull_request(&self, pr_number: u64) -> Result<PullRequest> {
        let pr = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .get(pr_number)
            .await?;

        Ok(mapper::map_pull_request(pr))
    }

    async fn get_pull_request_diff(&self, pr_number: u64) -> Result<String> {
        self.client
            .pulls(&self.repo.owner, &self.repo.name)
            .get_diff(pr_number)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to fetch diff for PR #{pr_number}: {e}")))
    }

    async fn create_pull_request(&self, pr: &CreatePullRequest) -> Result<PullRequest> {
        let created = self
            .client
            .pulls(&self.repo.owner, &self.repo.name)
            .create(&pr.title, &pr.head_branch, &pr.base_branch)
            .body(&pr.body)
            .send()
            .await?;

        Ok(mapper::map_pull_request(created))
    }

    async fn post_comment(&self, issue_number: u64, body: &str) -> Result<()> {
        self.client
            .issues(&self.repo.owner, &self.repo.name)
            .create_comment(issue_number, body)
            .await?;

        Ok(())
    }
}
