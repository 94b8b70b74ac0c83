use std::path::{Path, PathBuf};

use git2::{
    build::CheckoutBuilder, BranchType, Cred, CredentialType, FetchOptions, IndexAddOption,
    PushOptions, RemoteCallbacks, Repository, Signature, Status, StatusOptions,
};

use crate::error::{AppError, Result};

/// Validate a branch name to prevent argument injection.
/// Rejects names starting with `-` as defence in depth.
fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('-') {
        return Err(AppError::Git(format!("Invalid branch name: {name:?}")));
    }
    Ok(())
}

/// Credential callbacks: ssh-agent for SSH remotes, the token for HTTPS.
/// The token is captured by the closure and never written to disk.
fn make_callbacks(token: &str) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, allowed_types| {
        if allowed_types.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
        } else {
            Cred::userpass_plaintext("x-access-token", token)
        }
    });
    callbacks
}

fn make_fetch_options(token: &str) -> FetchOptions<'_> {
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(make_callbacks(token));
    opts
}

fn make_push_options(token: &str) -> PushOptions<'_> {
    let mut callbacks = make_callbacks(token);
    // libgit2 reports per-ref rejections here rather than failing the push
    callbacks.push_update_reference(|refname, status| match status {
        Some(message) => Err(git2::Error::from_str(&format!(
            "Remote rejected {refname}: {message}"
        ))),
        None => Ok(()),
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

fn checkout_local(repo: &Repository, branch_name: &str, force: bool) -> Result<()> {
    let refname = format!("refs/heads/{branch_name}");
    let obj = repo.revparse_single(&refname)?;
    let mut opts = CheckoutBuilder::new();
    if force {
        opts.force();
    }
    repo.checkout_tree(&obj, Some(&mut opts))?;
    repo.set_head(&refname)?;
    Ok(())
}

/// URL of a named remote (used once at startup to resolve owner/repo).
pub fn remote_url(dir: &Path, remote_name: &str) -> Result<String> {
    let repo = Repository::open(dir).map_err(|e| {
        AppError::Workspace(format!("{} is not a git repository: {}", dir.display(), e.message()))
    })?;
    let remote = repo
        .find_remote(remote_name)
        .map_err(|_| AppError::Git(format!("Could not find {remote_name} remote")))?;
    remote
        .url()
        .map(str::to_string)
        .ok_or_else(|| AppError::Git(format!("Remote {remote_name} has no valid URL")))
}

/// Name of the currently checked-out branch.
pub async fn current_branch(dir: &Path) -> Result<String> {
    let dir = dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let head = repo.head()?;
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| AppError::Git("HEAD is not a valid branch name".to_string()))
    })
    .await
    .map_err(|e| AppError::Git(format!("Current-branch task panicked: {e}")))?
}

/// Fetch all branches of a remote into `refs/remotes/<remote>/*`.
pub async fn fetch(dir: &Path, remote_name: &str, token: &str) -> Result<()> {
    let dir = dir.to_path_buf();
    let remote_name = remote_name.to_string();
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut remote = repo.find_remote(&remote_name)?;
        let refspec = format!("+refs/heads/*:refs/remotes/{remote_name}/*");
        let mut fetch_opts = make_fetch_options(&token);
        remote.fetch(&[&refspec], Some(&mut fetch_opts), None)?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Fetch task panicked: {e}")))?
}

/// Checkout a branch, creating a local tracking branch when it only exists on the remote.
pub async fn checkout(dir: &Path, remote_name: &str, branch_name: &str) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let remote_name = remote_name.to_string();
    let branch_name = branch_name.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;

        if repo.find_branch(&branch_name, BranchType::Local).is_err() {
            let upstream = format!("{remote_name}/{branch_name}");
            let commit = repo
                .find_branch(&upstream, BranchType::Remote)
                .map_err(|_| AppError::Git(format!("Branch {branch_name} not found locally or on {remote_name}")))?
                .get()
                .peel_to_commit()?;
            let mut local = repo.branch(&branch_name, &commit, false)?;
            local.set_upstream(Some(upstream.as_str()))?;
        }

        checkout_local(&repo, &branch_name, false)
    })
    .await
    .map_err(|e| AppError::Git(format!("Checkout task panicked: {e}")))?
}

/// Checkout a local branch, discarding uncommitted changes to tracked files.
pub async fn force_checkout(dir: &Path, branch_name: &str) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let branch_name = branch_name.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        checkout_local(&repo, &branch_name, true)
    })
    .await
    .map_err(|e| AppError::Git(format!("Force-checkout task panicked: {e}")))?
}

/// Delete untracked, non-ignored files except those under `excluded`
/// (relative to the repository root), pruning directories left empty.
///
/// Returns the number of files removed.
pub async fn remove_untracked(dir: &Path, excluded: &[PathBuf]) -> Result<usize> {
    let dir = dir.to_path_buf();
    let excluded = excluded.to_vec();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = repo.statuses(Some(&mut opts))?;

        let mut removed = 0;
        for entry in statuses.iter() {
            if !entry.status().contains(Status::WT_NEW) {
                continue;
            }
            let Some(path) = entry.path() else {
                continue;
            };
            let relative = Path::new(path);
            if excluded.iter().any(|e| relative.starts_with(e)) {
                continue;
            }

            let full = dir.join(relative);
            std::fs::remove_file(&full)?;
            removed += 1;

            let mut parent = full.parent();
            while let Some(p) = parent.filter(|p| *p != dir.as_path()) {
                if std::fs::remove_dir(p).is_err() {
                    break;
                }
                parent = p.parent();
            }
        }
        Ok(removed)
    })
    .await
    .map_err(|e| AppError::Git(format!("Remove-untracked task panicked: {e}")))?
}

/// Fetch a branch and fast-forward the local branch to it.
///
/// The branch must be checked out. A diverged local branch is an error.
pub async fn pull(dir: &Path, remote_name: &str, branch_name: &str, token: &str) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let remote_name = remote_name.to_string();
    let branch_name = branch_name.to_string();
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut remote = repo.find_remote(&remote_name)?;

        let refspec = format!("+refs/heads/{branch_name}:refs/remotes/{remote_name}/{branch_name}");
        let mut fetch_opts = make_fetch_options(&token);
        remote.fetch(&[&refspec], Some(&mut fetch_opts), None)?;

        let fetched = repo.find_reference(&format!("refs/remotes/{remote_name}/{branch_name}"))?;
        let upstream = repo.reference_to_annotated_commit(&fetched)?;
        let (analysis, _) = repo.merge_analysis(&[&upstream])?;

        if analysis.is_up_to_date() {
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(AppError::Git(format!(
                "Cannot fast-forward {branch_name} to {remote_name}/{branch_name}"
            )));
        }

        let refname = format!("refs/heads/{branch_name}");
        let mut local = repo.find_reference(&refname)?;
        local.set_target(upstream.id(), &format!("pull: fast-forward {branch_name}"))?;
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Pull task panicked: {e}")))?
}

/// Create and checkout a branch at HEAD, resetting any existing branch of that name.
pub async fn create_branch(dir: &Path, branch_name: &str) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let branch_name = branch_name.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let commit = repo.head()?.peel_to_commit()?;
        repo.branch(&branch_name, &commit, true)?;
        checkout_local(&repo, &branch_name, false)
    })
    .await
    .map_err(|e| AppError::Git(format!("Create-branch task panicked: {e}")))?
}

/// Stage additions, modifications and deletions, skipping paths under `excluded`
/// (relative to the repository root).
///
/// Returns whether the index now differs from HEAD.
pub async fn add_all(dir: &Path, excluded: &[PathBuf]) -> Result<bool> {
    let dir = dir.to_path_buf();
    let excluded = excluded.to_vec();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut index = repo.index()?;

        let skip: &mut git2::IndexMatchedPath<'_> = &mut |path: &Path, _matched: &[u8]| -> i32 {
            if excluded.iter().any(|e| path.starts_with(e)) {
                1
            } else {
                0
            }
        };
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, Some(&mut *skip))?;
        index.update_all(["*"].iter(), Some(&mut *skip))?;
        index.write()?;

        let head_tree = repo.head()?.peel_to_tree()?;
        let diff = repo.diff_tree_to_index(Some(&head_tree), Some(&index), None)?;
        Ok(diff.deltas().len() > 0)
    })
    .await
    .map_err(|e| AppError::Git(format!("Add-all task panicked: {e}")))?
}

/// Commit the index on top of HEAD.
///
/// Uses the repository's configured identity, falling back to `fallback_author`.
pub async fn commit(dir: &Path, message: &str, fallback_author: (&str, &str)) -> Result<()> {
    let dir = dir.to_path_buf();
    let message = message.to_string();
    let (name, email) = (fallback_author.0.to_string(), fallback_author.1.to_string());

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let sig = match repo.signature() {
            Ok(sig) => sig,
            Err(_) => Signature::now(&name, &email)?,
        };
        let mut index = repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = repo.find_tree(tree_oid)?;
        let parent = repo.head()?.peel_to_commit()?;
        repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&parent])?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Commit task panicked: {e}")))?
}

/// Force-push a local branch to the same name on the remote.
pub async fn push(dir: &Path, remote_name: &str, branch_name: &str, token: &str) -> Result<()> {
    validate_branch_name(branch_name)?;

    let dir = dir.to_path_buf();
    let remote_name = remote_name.to_string();
    let branch_name = branch_name.to_string();
    let token = token.to_string();

    tokio::task::spawn_blocking(move || {
        let repo = Repository::open(&dir)?;
        let mut remote = repo.find_remote(&remote_name)?;
        let refspec = format!("+refs/heads/{branch_name}:refs/heads/{branch_name}");
        let mut push_opts = make_push_options(&token);
        remote.push(&[&refspec], Some(&mut push_opts))?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Git(format!("Push task panicked: {e}")))?
}
