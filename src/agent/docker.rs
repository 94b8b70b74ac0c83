use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::agent::{Agent, AgentOutput};
use crate::config::AgentConfig;
use crate::error::{AppError, Result};

const STDERR_TAIL_BYTES: usize = 2000;
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Argument replaced with the per-run container name.
const CONTAINER_ARG: &str = "{container}";

static NEXT_CONTAINER: AtomicU64 = AtomicU64::new(0);

/// Runs the agent as a one-shot container with the repository mounted.
///
/// The task is handed over through a file in the repository root; the review,
/// if any, comes back the same way. Both files are removed after the run.
///
/// Each run gets its own container name so a timed-out container can be
/// removed; killing the `docker` client alone leaves the container running.
pub struct DockerAgent {
    program: String,
    run_args: Vec<String>,
    stop_args: Vec<String>,
    repo_dir: PathBuf,
    task_file: String,
    review_file: String,
    timeout: Option<Duration>,
}

impl DockerAgent {
    pub fn new(config: &AgentConfig, repo_dir: &Path) -> Result<Self> {
        let repo_dir = repo_dir.canonicalize().map_err(|e| {
            AppError::Workspace(format!(
                "Repository directory {} is not accessible: {e}",
                repo_dir.display()
            ))
        })?;
        let run_args = docker_args(config, &repo_dir);

        Ok(Self {
            program: config.docker_bin.clone(),
            run_args,
            stop_args: vec!["rm".to_string(), "-f".to_string(), CONTAINER_ARG.to_string()],
            repo_dir,
            task_file: config.task_file.clone(),
            review_file: config.review_file.clone(),
            timeout: config.timeout(),
        })
    }

    async fn invoke(&self) -> Result<()> {
        let container = container_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(with_container(&self.run_args, &container))
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| AppError::Agent(format!("Failed to spawn {}: {e}", self.program)))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    tracing::warn!(container = %container, timeout_secs = limit.as_secs(), "Agent timed out");
                    self.stop(&container).await;
                    return Err(AppError::AgentTimeout(limit.as_secs()));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| AppError::Agent(format!("Failed to wait for agent: {e}")))?;

        tracing::debug!(
            stdout = %String::from_utf8_lossy(&output.stdout),
            "Agent output"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Agent(format!(
                "Agent exited with {}: {}",
                output.status,
                tail(stderr.trim(), STDERR_TAIL_BYTES)
            )));
        }

        Ok(())
    }

    /// Remove the container of a timed-out run and wait for the removal.
    async fn stop(&self, container: &str) {
        let mut cmd = Command::new(&self.program);
        cmd.args(with_container(&self.stop_args, container))
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(STOP_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                tracing::info!(container, "Stopped timed-out agent container");
            }
            Ok(Ok(output)) => {
                tracing::warn!(
                    container,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Failed to stop agent container"
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(container, error = %e, "Failed to run container stop");
            }
            Err(_) => {
                tracing::warn!(container, "Container stop did not finish in time");
            }
        }
    }
}

#[async_trait]
impl Agent for DockerAgent {
    async fn run(&self, task: &str) -> Result<AgentOutput> {
        let task_path = self.repo_dir.join(&self.task_file);
        let review_path = self.repo_dir.join(&self.review_file);

        remove_if_present(&review_path).await?;
        tokio::fs::write(&task_path, task).await?;

        tracing::info!(program = %self.program, "Running agent");
        let result = self.invoke().await;

        if let Err(e) = remove_if_present(&task_path).await {
            tracing::warn!(path = %task_path.display(), error = %e, "Failed to remove task file");
        }

        if let Err(e) = result {
            let _ = remove_if_present(&review_path).await;
            return Err(e);
        }

        let review = match tokio::fs::read_to_string(&review_path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(file = %self.review_file, "No review file written");
                None
            }
            Err(e) => return Err(e.into()),
        };
        remove_if_present(&review_path).await?;

        Ok(AgentOutput { review })
    }
}

/// `docker run` arguments for one agent invocation.
fn docker_args(config: &AgentConfig, repo_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        CONTAINER_ARG.to_string(),
        "-v".to_string(),
        format!("{}:{}", repo_dir.display(), config.mount_point),
        "-w".to_string(),
        config.mount_point.clone(),
    ];
    args.extend(config.extra_args.iter().cloned());
    args.push(config.image.clone());
    args.extend(config.command.iter().cloned());
    args.push(format!("Read the task in {} and accomplish it", config.task_file));
    args
}

fn container_name() -> String {
    format!(
        "labelrunner-{}-{}",
        std::process::id(),
        NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed)
    )
}

fn with_container(args: &[String], container: &str) -> Vec<String> {
    args.iter()
        .map(|arg| {
            if arg == CONTAINER_ARG {
                container.to_string()
            } else {
                arg.clone()
            }
        })
        .collect()
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn tail(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_agent(repo_dir: &Path, script: &str, timeout: Option<Duration>) -> DockerAgent {
        stoppable_shell_agent(repo_dir, script, ":", timeout)
    }

    /// `$0` is the container name in both scripts.
    fn stoppable_shell_agent(
        repo_dir: &Path,
        script: &str,
        stop_script: &str,
        timeout: Option<Duration>,
    ) -> DockerAgent {
        DockerAgent {
            program: "sh".to_string(),
            run_args: vec!["-c".to_string(), script.to_string(), CONTAINER_ARG.to_string()],
            stop_args: vec!["-c".to_string(), stop_script.to_string(), CONTAINER_ARG.to_string()],
            repo_dir: repo_dir.to_path_buf(),
            task_file: "Task.md".to_string(),
            review_file: "Review.md".to_string(),
            timeout,
        }
    }

    #[test]
    fn test_docker_args_layout() {
        let config = AgentConfig {
            extra_args: vec!["--network=none".to_string()],
            ..AgentConfig::default()
        };
        let args = docker_args(&config, Path::new("/srv/repo"));
        assert_eq!(
            args,
            vec![
                "run",
                "--rm",
                "--name",
                "{container}",
                "-v",
                "/srv/repo:/workspace",
                "-w",
                "/workspace",
                "--network=none",
                "my-claude-image",
                "claude",
                "Read the task in Task.md and accomplish it",
            ]
        );
    }

    #[tokio::test]
    async fn test_review_file_is_collected_and_handoff_cleaned() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = shell_agent(
            tmp.path(),
            "grep -q 'Diff:' Task.md && echo 'looks good' > Review.md",
            None,
        );

        let output = agent.run("Pull Request #7: x\n\nDiff:\n+a").await.unwrap();
        assert_eq!(output.review.as_deref(), Some("looks good\n"));
        assert!(!tmp.path().join("Task.md").exists());
        assert!(!tmp.path().join("Review.md").exists());
    }

    #[tokio::test]
    async fn test_missing_review_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Review.md"), "stale").unwrap();

        let agent = shell_agent(tmp.path(), "true", None);
        let output = agent.run("task").await.unwrap();
        assert_eq!(output, AgentOutput { review: None });
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_agent_error() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = shell_agent(tmp.path(), "echo boom >&2; exit 3", None);

        let err = agent.run("task").await.unwrap_err();
        match err {
            AppError::Agent(msg) => assert!(msg.contains("boom"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!tmp.path().join("Task.md").exists());
    }

    #[tokio::test]
    async fn test_hung_agent_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = shell_agent(tmp.path(), "sleep 30", Some(Duration::from_secs(1)));

        let err = agent.run("task").await.unwrap_err();
        assert!(matches!(err, AppError::AgentTimeout(1)));
    }

    #[tokio::test]
    async fn test_timeout_stops_work_outliving_the_client() {
        let tmp = tempfile::tempdir().unwrap();
        let agent = stoppable_shell_agent(
            tmp.path(),
            "(sleep 2; echo late > late.txt) & echo $! > \"$0.pid\"; wait",
            "kill -9 \"$(cat \"$0.pid\")\"",
            Some(Duration::from_secs(1)),
        );

        let err = agent.run("task").await.unwrap_err();
        assert!(matches!(err, AppError::AgentTimeout(1)));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!tmp.path().join("late.txt").exists());
    }

    #[test]
    fn test_container_names_are_unique_per_run() {
        let args = vec!["--name".to_string(), CONTAINER_ARG.to_string()];
        let first = with_container(&args, &container_name());
        let second = with_container(&args, &container_name());
        assert_eq!(first[0], "--name");
        assert!(first[1].starts_with("labelrunner-"));
        assert_ne!(first[1], second[1]);
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("short", 10), "short");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ééé", 3), "é");
    }
}
