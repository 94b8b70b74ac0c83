pub mod docker;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;

pub use docker::DockerAgent;

/// What an agent run left behind for the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOutput {
    /// Contents of the review artifact, if the agent wrote one.
    pub review: Option<String>,
}

/// The external execution agent: given a task description, operate on the
/// working tree and optionally produce review text.
///
/// Any error aborts the calling workflow before further VCS steps.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(&self, task: &str) -> Result<AgentOutput>;
}
