use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use labelrunner::agent::DockerAgent;
use labelrunner::config::AppConfig;
use labelrunner::platform::github::{parse_remote_url, GitHubPlatform};
use labelrunner::platform::Platform;
use labelrunner::poller::Poller;
use labelrunner::server::{create_router, AppState};
use labelrunner::shutdown::wait_for_shutdown;
use labelrunner::store::ProcessedStore;
use labelrunner::workflow::Services;
use labelrunner::workspace::{git, manager::excluded_paths, GitWorkspace};

#[derive(Parser)]
#[command(
    name = "labelrunner",
    about = "Runs a containerized coding agent over labeled GitHub issues and pull requests"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    let token = config.github_token()?;

    let repo_dir = Path::new(&config.workspace.repo_dir);
    let remote = git::remote_url(repo_dir, &config.workspace.remote)?;
    let repo = parse_remote_url(&remote)
        .with_context(|| format!("Cannot derive repository from remote '{remote}'"))?;

    let platform = Arc::new(GitHubPlatform::new(
        &token,
        repo.clone(),
        config.github.api_url.as_deref(),
    )?);
    let actor = platform
        .authenticated_user()
        .await
        .context("Failed to resolve the authenticated user")?;

    let state_dir = config.state_dir();
    let store = ProcessedStore::new(&state_dir, &config.state);
    let agent = Arc::new(DockerAgent::new(&config.agent, repo_dir)?);
    let excluded = excluded_paths(
        repo_dir,
        &state_dir,
        &[
            config.agent.task_file.as_str(),
            config.agent.review_file.as_str(),
        ],
    );
    let workspace = Arc::new(GitWorkspace::new(&config.workspace, &token, excluded));

    let services = Services {
        platform,
        workspace,
        agent,
        branch_prefix: config.workspace.branch_prefix.clone(),
        review_file: config.agent.review_file.clone(),
    };
    let poller = Arc::new(Poller::new(
        services,
        store,
        actor.clone(),
        config.github.trigger_label.clone(),
        config.poll.interval(),
    ));

    tracing::info!(
        "Started watching {} for '{}' labeled issues and pull requests by {}",
        repo,
        config.github.trigger_label,
        actor
    );

    if cli.once {
        poller.run_once().await?;
        return Ok(());
    }

    if config.server.enabled {
        let app = create_router(Arc::new(AppState {
            poller: Arc::clone(&poller),
        }));
        let listener = tokio::net::TcpListener::bind(format!(
            "{}:{}",
            config.server.host, config.server.port
        ))
        .await?;

        tracing::info!("Status server listening on {}", listener.local_addr()?);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_shutdown())
                .await
            {
                tracing::error!(error = %e, "Status server failed");
            }
        });
    }

    poller.run(wait_for_shutdown()).await;

    Ok(())
}
