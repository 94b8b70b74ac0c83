use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};

/// Environment variable consulted when `github.token` is not configured.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub poll: PollConfig,
    pub workspace: WorkspaceConfig,
    pub agent: AgentConfig,
    pub state: StateConfig,
    pub server: ServerConfig,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub trigger_label: String,
    pub api_url: Option<String>,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("trigger_label", &self.trigger_label)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            trigger_label: default_trigger_label(),
            api_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub repo_dir: PathBuf,
    pub remote: String,
    pub main_branch: String,
    pub branch_prefix: String,
    pub author_name: String,
    pub author_email: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("."),
            remote: "origin".to_string(),
            main_branch: "main".to_string(),
            branch_prefix: "claude-issue-".to_string(),
            author_name: "labelrunner".to_string(),
            author_email: "labelrunner@users.noreply.github.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub docker_bin: String,
    pub image: String,
    pub command: Vec<String>,
    pub mount_point: String,
    pub extra_args: Vec<String>,
    pub task_file: String,
    pub review_file: String,
    /// Upper bound on one agent run; 0 disables the bound.
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            image: "my-claude-image".to_string(),
            command: vec!["claude".to_string()],
            mount_point: "/workspace".to_string(),
            extra_args: Vec::new(),
            task_file: "Task.md".to_string(),
            review_file: "Review.md".to_string(),
            timeout_secs: 60 * 60,
        }
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StateConfig {
    pub dir: PathBuf,
    pub issues_file: String,
    pub pull_requests_file: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".labelrunner"),
            issues_file: "processed_issues.json".to_string(),
            pull_requests_file: "processed_prs.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

fn default_trigger_label() -> String {
    "claude".to_string()
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("labelrunner").required(false));
        }

        // Environment variable overrides with LABELRUNNER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("LABELRUNNER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// The hosting API token: configured value first, then `GITHUB_TOKEN`.
    pub fn github_token(&self) -> Result<String> {
        if let Some(token) = self.github.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(AppError::Config(format!(
                "{TOKEN_ENV_VAR} environment variable is not set"
            ))),
        }
    }

    /// State directory, resolved against the repository when relative.
    pub fn state_dir(&self) -> PathBuf {
        resolve_against(&self.workspace.repo_dir, &self.state.dir)
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = AppConfig::default();
        assert_eq!(config.github.trigger_label, "claude");
        assert_eq!(config.poll.interval(), Duration::from_secs(300));
        assert_eq!(config.workspace.main_branch, "main");
        assert_eq!(config.agent.task_file, "Task.md");
        assert_eq!(config.agent.review_file, "Review.md");
        assert_eq!(config.agent.timeout(), Some(Duration::from_secs(3600)));
        assert!(!config.server.enabled);
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let agent = AgentConfig {
            timeout_secs: 0,
            ..AgentConfig::default()
        };
        assert_eq!(agent.timeout(), None);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[github]
trigger_label = "bot"

[poll]
interval_secs = 60

[agent]
image = "agent:latest"
command = ["claude", "--print"]
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.github.trigger_label, "bot");
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.agent.image, "agent:latest");
        assert_eq!(config.agent.command, vec!["claude", "--print"]);
        assert_eq!(config.workspace.remote, "origin");
    }

    #[test]
    fn test_configured_token_wins_and_is_redacted() {
        let mut config = AppConfig::default();
        config.github.token = Some("ghp_secret".to_string());
        assert_eq!(config.github_token().unwrap(), "ghp_secret");

        let debug = format!("{:?}", config.github);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_state_dir_resolves_against_repo() {
        let mut config = AppConfig::default();
        config.workspace.repo_dir = PathBuf::from("/srv/repo");
        assert_eq!(config.state_dir(), PathBuf::from("/srv/repo/.labelrunner"));

        config.state.dir = PathBuf::from("/var/lib/labelrunner");
        assert_eq!(config.state_dir(), PathBuf::from("/var/lib/labelrunner"));
    }
}
