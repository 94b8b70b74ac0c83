use crate::error::{AppError, Result};
use crate::platform::types::RepoCoordinates;

/// Resolve `owner/name` from a git remote URL.
///
/// Accepts URL-style remotes (`https://`, `ssh://`, `git://`) and SCP-style
/// SSH remotes (`git@github.com:owner/name.git`).
pub fn parse_remote_url(url: &str) -> Result<RepoCoordinates> {
    let url = url.trim();
    let path = if let Some((_, rest)) = url.split_once("://") {
        // Drop the authority (and any credentials in it)
        rest.split_once('/').map(|(_, path)| path)
    } else {
        url.split_once(':').map(|(_, path)| path)
    }
    .ok_or_else(|| AppError::Config(format!("Unrecognized remote URL: {url}")))?;

    let mut segments = path
        .trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .rev();

    let name = segments.next().map(|s| s.trim_end_matches(".git"));
    let owner = segments.next();

    match (owner, name) {
        (Some(owner), Some(name)) if !name.is_empty() => Ok(RepoCoordinates {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => Err(AppError::Config(format!(
            "Remote URL does not name an owner and repository: {url}"
        ))),
    }
}
