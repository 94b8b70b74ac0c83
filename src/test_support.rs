//! Recording in-memory collaborators for workflow and cycle tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agent::{Agent, AgentOutput};
use crate::error::{AppError, Result};
use crate::platform::types::{CreatePullRequest, ItemKind, PullRequest, WorkItem};
use crate::platform::Platform;
use crate::workflow::Services;
use crate::workspace::WorkingTree;

pub fn issue(number: u64, author: &str, body: &str) -> WorkItem {
    WorkItem {
        number,
        kind: ItemKind::Issue,
        author: author.to_string(),
        title: format!("Issue {number}"),
        body: body.to_string(),
    }
}

pub fn pull_request(number: u64, author: &str, title: &str) -> WorkItem {
    WorkItem {
        number,
        kind: ItemKind::PullRequest,
        author: author.to_string(),
        title: title.to_string(),
        body: String::new(),
    }
}

#[derive(Default)]
struct PlatformState {
    items: Vec<WorkItem>,
    pull_requests: HashMap<u64, (String, String)>,
    created: Vec<CreatePullRequest>,
    comments: Vec<(u64, String)>,
    list_calls: usize,
    fail_listing: bool,
    fail_comments: bool,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn set_items(&self, items: Vec<WorkItem>) {
        self.state.lock().unwrap().items = items;
    }

    pub fn set_pull_request(&self, number: u64, base_branch: &str, diff: &str) {
        self.state
            .lock()
            .unwrap()
            .pull_requests
            .insert(number, (base_branch.to_string(), diff.to_string()));
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn fail_comments(&self) {
        self.state.lock().unwrap().fail_comments = true;
    }

    pub fn created_pull_requests(&self) -> Vec<CreatePullRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn authenticated_user(&self) -> Result<String> {
        Ok("me".to_string())
    }

    async fn list_open_items_with_label(&self, _label: &str) -> Result<Vec<WorkItem>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(AppError::GitHubApi("listing unavailable".to_string()));
        }
        Ok(state.items.clone())
    }

    async fn get_pull_request(&self, pr_number: u64) -> Result<PullRequest> {
        let state = self.state.lock().unwrap();
        let (base_branch, _) = state
            .pull_requests
            .get(&pr_number)
            .ok_or_else(|| AppError::GitHubApi(format!("no PR #{pr_number}")))?;
        Ok(PullRequest {
            number: pr_number,
            title: String::new(),
            body: String::new(),
            head_branch: format!("feature-{pr_number}"),
            base_branch: base_branch.clone(),
        })
    }

    async fn get_pull_request_diff(&self, pr_number: u64) -> Result<String> {
        let state = self.state.lock().unwrap();
        state
            .pull_requests
            .get(&pr_number)
            .map(|(_, diff)| diff.clone())
            .ok_or_else(|| AppError::GitHubApi(format!("no PR #{pr_number}")))
    }

    async fn create_pull_request(&self, pr: &CreatePullRequest) -> Result<PullRequest> {
        let mut state = self.state.lock().unwrap();
        state.created.push(pr.clone());
        Ok(PullRequest {
            number: 999 + state.created.len() as u64,
            title: pr.title.clone(),
            body: pr.body.clone(),
            head_branch: pr.head_branch.clone(),
            base_branch: pr.base_branch.clone(),
        })
    }

    async fn post_comment(&self, issue_number: u64, body: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_comments {
            return Err(AppError::GitHubApi("comment rejected".to_string()));
        }
        state.comments.push((issue_number, body.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Checkout(String),
    Pull(String),
    CreateBranch(String),
    StageAll,
    Commit(String),
    Push(String),
    Fetch,
    RestoreMain,
}

struct WorkspaceState {
    calls: Vec<Call>,
    current_branch: String,
    nothing_to_stage: bool,
    fail_push: bool,
}

pub struct FakeWorkspace {
    state: Mutex<WorkspaceState>,
}

impl Default for FakeWorkspace {
    fn default() -> Self {
        Self {
            state: Mutex::new(WorkspaceState {
                calls: Vec::new(),
                current_branch: "main".to_string(),
                nothing_to_stage: false,
                fail_push: false,
            }),
        }
    }
}

impl FakeWorkspace {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn current_branch(&self) -> String {
        self.state.lock().unwrap().current_branch.clone()
    }

    pub fn set_nothing_to_stage(&self) {
        self.state.lock().unwrap().nothing_to_stage = true;
    }

    pub fn fail_on_push(&self) {
        self.state.lock().unwrap().fail_push = true;
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl WorkingTree for FakeWorkspace {
    fn main_branch(&self) -> &str {
        "main"
    }

    async fn checkout(&self, branch: &str) -> Result<()> {
        self.record(Call::Checkout(branch.to_string()));
        self.state.lock().unwrap().current_branch = branch.to_string();
        Ok(())
    }

    async fn pull(&self, branch: &str) -> Result<()> {
        self.record(Call::Pull(branch.to_string()));
        Ok(())
    }

    async fn create_branch(&self, branch: &str) -> Result<()> {
        self.record(Call::CreateBranch(branch.to_string()));
        self.state.lock().unwrap().current_branch = branch.to_string();
        Ok(())
    }

    async fn stage_all(&self) -> Result<bool> {
        self.record(Call::StageAll);
        Ok(!self.state.lock().unwrap().nothing_to_stage)
    }

    async fn commit(&self, message: &str) -> Result<()> {
        self.record(Call::Commit(message.to_string()));
        Ok(())
    }

    async fn push(&self, branch: &str) -> Result<()> {
        self.record(Call::Push(branch.to_string()));
        if self.state.lock().unwrap().fail_push {
            return Err(AppError::Git("push rejected".to_string()));
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<()> {
        self.record(Call::Fetch);
        Ok(())
    }

    async fn restore_main(&self) -> Result<()> {
        self.record(Call::RestoreMain);
        self.state.lock().unwrap().current_branch = "main".to_string();
        Ok(())
    }
}

#[derive(Default)]
struct AgentState {
    tasks: Vec<String>,
    review: Option<String>,
    fail_next: bool,
}

#[derive(Default)]
pub struct FakeAgent {
    state: Mutex<AgentState>,
}

impl FakeAgent {
    pub fn tasks(&self) -> Vec<String> {
        self.state.lock().unwrap().tasks.clone()
    }

    pub fn set_review(&self, review: Option<&str>) {
        self.state.lock().unwrap().review = review.map(str::to_string);
    }

    /// Make the next run fail.
    pub fn fail_next(&self) {
        self.state.lock().unwrap().fail_next = true;
    }
}

#[async_trait]
impl Agent for FakeAgent {
    async fn run(&self, task: &str) -> Result<AgentOutput> {
        let mut state = self.state.lock().unwrap();
        state.tasks.push(task.to_string());
        if std::mem::take(&mut state.fail_next) {
            return Err(AppError::Agent("forced failure".to_string()));
        }
        Ok(AgentOutput {
            review: state.review.clone(),
        })
    }
}

pub struct Harness {
    pub platform: Arc<FakePlatform>,
    pub workspace: Arc<FakeWorkspace>,
    pub agent: Arc<FakeAgent>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            platform: Arc::new(FakePlatform::default()),
            workspace: Arc::new(FakeWorkspace::default()),
            agent: Arc::new(FakeAgent::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            platform: self.platform.clone(),
            workspace: self.workspace.clone(),
            agent: self.agent.clone(),
            branch_prefix: "claude-issue-".to_string(),
            review_file: "Review.md".to_string(),
        }
    }
}
