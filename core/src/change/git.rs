use std::path::Path;

use tokio::process::Command;

use crate::error::GitError;

use super::{Change, ChangeStatus};

/// Which pair of trees to diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Working tree and index against `HEAD`.
    WorkingTree,
    /// Index against `HEAD`.
    Staged,
    Range { base: String, head: String },
}

impl ChangeScope {
    fn diff_args(&self) -> Vec<String> {
        match self {
            ChangeScope::WorkingTree => vec!["HEAD".into()],
            ChangeScope::Staged => vec!["--cached".into()],
            ChangeScope::Range { base, head } => vec![format!("{base}..{head}")],
        }
    }
}

pub async fn collect_changes(workdir: &Path, scope: &ChangeScope) -> Result<Vec<Change>, GitError> {
    let mut args = vec!["diff".to_string(), "--name-status".to_string()];
    args.extend(scope.diff_args());
    let listing = git(workdir, &args).await?;

    let mut changes = Vec::new();
    for (status, path) in parse_name_status(&listing) {
        let diff = if status == ChangeStatus::Deleted {
            String::new()
        } else {
            let mut diff_args = vec!["diff".to_string()];
            diff_args.extend(scope.diff_args());
            diff_args.push("--".into());
            diff_args.push(path.clone());
            match git(workdir, &diff_args).await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "skipping file whose diff failed");
                    continue;
                }
            }
        };
        changes.push(Change { path, status, diff });
    }

    tracing::debug!(count = changes.len(), scope = ?scope, "collected changes");
    Ok(changes)
}

async fn git(workdir: &Path, args: &[String]) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(workdir)
        .output()
        .await
        .map_err(GitError::Spawn)?;

    if !output.status.success() {
        return Err(GitError::Command {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parses `git diff --name-status`. For renames and copies the new path wins.
fn parse_name_status(listing: &str) -> Vec<(ChangeStatus, String)> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status = ChangeStatus::from_git(fields.next()?.trim())?;
            let path = fields.last()?.trim();
            if path.is_empty() {
                return None;
            }
            Some((status, path.to_string()))
        })
        .collect()
}
