//! Git working copy driven through the `git` binary.
//!
//! Every command runs as `git -C <working copy> ...`, so the handle never
//! depends on the process's current directory, and the committer date is
//! set on the commit child process only.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, FixedOffset};
use tracing::{debug, error, info, warn};

use crate::contract::{Artifact, CommitOutcome, RepositoryBackend};
use crate::error::RepositoryError;

const COMMITTER_DATE_ENV: &str = "GIT_COMMITTER_DATE";

/// Formats a timestamp in git's internal date format, `<unix seconds> <+|-HHMM>`.
pub fn git_date(timestamp: &DateTime<FixedOffset>) -> String {
    format!("{} {}", timestamp.timestamp(), timestamp.format("%z"))
}

/// Directory name for the working copy: the URL's last path segment without
/// its extension. Handles trailing slashes and scp-like `git@host:user/repo.git`.
pub fn working_copy_name(repo_url: &str) -> Option<String> {
    let last = repo_url.trim_end_matches('/').rsplit(['/', ':']).next()?;
    let name = Path::new(last).file_stem()?.to_str()?;
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[derive(Debug)]
pub struct GitRepository {
    path: PathBuf,
}

impl GitRepository {
    /// Clones `repo_url` into a fresh directory under `parent_dir`, replacing
    /// any directory of the same name left over from an earlier run.
    pub fn open(repo_url: &str, parent_dir: &Path) -> Result<Self, RepositoryError> {
        let name = working_copy_name(repo_url).ok_or_else(|| RepositoryError::Clone {
            url: repo_url.to_string(),
            path: parent_dir.to_path_buf(),
            stderr: "cannot derive a directory name from the repository url".to_string(),
        })?;
        let path = parent_dir.join(name);

        if path.exists() {
            info!(path = %path.display(), "[GIT] Removing existing folder with the working copy's name");
            fs::remove_dir_all(&path).map_err(|source| RepositoryError::Io {
                path: path.clone(),
                source,
            })?;
        } else if !parent_dir.exists() {
            fs::create_dir_all(parent_dir).map_err(|source| RepositoryError::Io {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let output = Command::new("git")
            .arg("clone")
            .arg(repo_url)
            .arg(&path)
            .output()
            .map_err(|source| RepositoryError::Spawn {
                command: "clone".to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(repo_url, path = %path.display(), stderr = %stderr, "[GIT][ERROR] Clone failed");
            return Err(RepositoryError::Clone {
                url: repo_url.to_string(),
                path,
                stderr,
            });
        }

        info!(repo_url, path = %path.display(), "[GIT] Cloned repository");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command.arg("-C").arg(&self.path);
        command
    }

    fn output(&self, name: &str, command: &mut Command) -> Result<Output, RepositoryError> {
        debug!(command = name, path = %self.path.display(), "[GIT] Running git");
        command.output().map_err(|source| RepositoryError::Spawn {
            command: name.to_string(),
            source,
        })
    }

    fn failure(&self, name: &str, output: &Output) -> RepositoryError {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("not a git repository") {
            return RepositoryError::NotARepository {
                path: self.path.clone(),
            };
        }
        RepositoryError::Git {
            command: name.to_string(),
            path: self.path.clone(),
            stderr,
        }
    }

    fn ensure_repository(&self) -> Result<(), RepositoryError> {
        if self.path.join(".git").exists() {
            Ok(())
        } else {
            Err(RepositoryError::NotARepository {
                path: self.path.clone(),
            })
        }
    }

    fn write_artifact(&self, artifact: &Artifact) -> Result<PathBuf, RepositoryError> {
        let folder = self.path.join(&artifact.folder_name);
        fs::create_dir(&folder).map_err(|source| match source.kind() {
            ErrorKind::AlreadyExists => RepositoryError::FolderExists {
                path: folder.clone(),
            },
            _ => RepositoryError::Io {
                path: folder.clone(),
                source,
            },
        })?;

        let file = folder.join(&artifact.file_name);
        if let Err(source) = fs::write(&file, &artifact.content) {
            let _ = fs::remove_dir_all(&folder);
            return Err(RepositoryError::Io { path: file, source });
        }
        Ok(file)
    }

    fn stage_and_commit(&self, artifact: &Artifact) -> Result<CommitOutcome, RepositoryError> {
        let add = self.output("add", self.git().args(["add", "."]))?;
        if !add.status.success() {
            return Err(self.failure("add", &add));
        }

        let date = git_date(&artifact.timestamp);
        let commit = self.output(
            "commit",
            self.git()
                .arg("commit")
                .arg(format!("--date={date}"))
                .arg("-m")
                .arg(&artifact.commit_message)
                .env(COMMITTER_DATE_ENV, &date),
        )?;

        if commit.status.success() {
            info!(folder = %artifact.folder_name, date = %date, "[GIT] Committed submission");
            return Ok(CommitOutcome::Committed);
        }

        let stdout = String::from_utf8_lossy(&commit.stdout);
        if stdout.contains("nothing to commit") || stdout.contains("nothing added to commit") {
            info!(folder = %artifact.folder_name, "[GIT] Nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }
        Err(self.failure("commit", &commit))
    }

    /// Unstages and deletes a folder whose commit failed, so a later
    /// `git add .` cannot sweep it into another question's commit.
    fn discard_folder(&self, folder_name: &str) {
        let unstage = self
            .git()
            .args(["rm", "-r", "-q", "--cached", "--ignore-unmatch", "--"])
            .arg(folder_name)
            .output();
        match unstage {
            Ok(output) if !output.status.success() => warn!(
                folder = folder_name,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "[GIT] Could not unstage folder of failed commit"
            ),
            Err(e) => warn!(folder = folder_name, error = %e, "[GIT] Could not unstage folder of failed commit"),
            Ok(_) => {}
        }

        let folder = self.path.join(folder_name);
        if let Err(e) = fs::remove_dir_all(&folder) {
            warn!(path = %folder.display(), error = %e, "[GIT] Could not remove folder of failed commit");
        } else {
            debug!(path = %folder.display(), "[GIT] Rolled back folder of failed commit");
        }
    }
}

impl RepositoryBackend for GitRepository {
    fn commit(&self, artifact: &Artifact) -> Result<CommitOutcome, RepositoryError> {
        self.ensure_repository()?;
        let file = self.write_artifact(artifact)?;
        debug!(file = %file.display(), "[GIT] Wrote submission file");

        self.stage_and_commit(artifact).map_err(|e| {
            self.discard_folder(&artifact.folder_name);
            e
        })
    }

    fn push(&self) -> Result<(), RepositoryError> {
        self.ensure_repository()?;
        let push = self.output("push", self.git().args(["push", "origin", "HEAD"]))?;
        if !push.status.success() {
            let stderr = String::from_utf8_lossy(&push.stderr).trim().to_string();
            error!(path = %self.path.display(), stderr = %stderr, "[GIT][ERROR] Push failed, keeping working copy");
            return Err(RepositoryError::Push {
                path: self.path.clone(),
                stderr,
            });
        }
        info!(path = %self.path.display(), "[GIT] Pushed commits");

        fs::remove_dir_all(&self.path).map_err(|source| RepositoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "[GIT] Removed working copy");
        Ok(())
    }
}
