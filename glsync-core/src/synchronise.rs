//! High-level pipeline: fetch submissions, commit one artifact per submission, push.
//!
//! [`Synchroniser::execute`] is the single entrypoint. It:
//!   - Fetches all submissions through a [`SubmissionFetcher`]
//!   - Derives a deterministic [`Artifact`] (folder, file, message, date) per submission
//!   - Commits each artifact through a [`RepositoryBackend`], oldest submission first
//!   - Pushes once, after every commit attempt
//!
//! # Error Handling
//! A failing commit is logged and recorded in the [`SyncReport`]; the run
//! continues. Fetch failures, an empty fetch, fatal repository errors and a
//! failing push end the run with a [`SyncError`].

use tracing::{error, info, warn};

use crate::contract::{Artifact, CommitOutcome, RepositoryBackend, Submission, SubmissionFetcher};
use crate::error::{RepositoryError, SyncError};

/// Language name as reported by LeetCode mapped to a file extension.
const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("bash", "sh"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("csharp", "cs"),
    ("dart", "dart"),
    ("elixir", "ex"),
    ("erlang", "erl"),
    ("golang", "go"),
    ("java", "java"),
    ("javascript", "js"),
    ("kotlin", "kt"),
    ("mssql", "sql"),
    ("mysql", "sql"),
    ("oraclesql", "sql"),
    ("php", "php"),
    ("postgresql", "sql"),
    ("python", "py"),
    ("python3", "py"),
    ("pythondata", "py"),
    ("racket", "rkt"),
    ("ruby", "rb"),
    ("rust", "rs"),
    ("scala", "scala"),
    ("swift", "swift"),
    ("typescript", "ts"),
];

pub fn file_extension(language: &str) -> Option<&'static str> {
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, ext)| *ext)
}

/// `"{id}{title_slug}.{ext}"`, or `"{id}{title_slug}"` for an unknown language.
pub fn file_name(id: &str, title_slug: &str, language: &str) -> String {
    match file_extension(language) {
        Some(ext) => format!("{id}{title_slug}.{ext}"),
        None => format!("{id}{title_slug}"),
    }
}

pub fn folder_name(id: &str, title: &str) -> String {
    format!("{id} {title}").replace(['/', '\\'], "_")
}

pub fn commit_message(id: &str, title: &str) -> String {
    format!("Code challenge submission for question: {id} {title}")
}

impl Artifact {
    pub fn from_submission(submission: &Submission) -> Self {
        if file_extension(&submission.language).is_none() {
            warn!(
                question_id = %submission.id,
                lang = %submission.language,
                "[SYNC] Unknown language, writing file without extension"
            );
        }
        Artifact {
            folder_name: folder_name(&submission.id, &submission.title),
            file_name: file_name(&submission.id, &submission.title_slug, &submission.language),
            content: submission.code.clone(),
            commit_message: commit_message(&submission.id, &submission.title),
            timestamp: submission.last_submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCommit {
    pub question_id: String,
    pub error: String,
}

/// Outcome of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub committed: usize,
    /// Commits that staged no changes.
    pub unchanged: usize,
    /// Submissions whose folder already existed in the repository.
    pub already_synced: usize,
    pub failed: Vec<FailedCommit>,
}

pub struct Synchroniser<F, R> {
    fetcher: F,
    repository: R,
}

impl<F, R> Synchroniser<F, R>
where
    F: SubmissionFetcher,
    R: RepositoryBackend,
{
    pub fn new(fetcher: F, repository: R) -> Self {
        Self {
            fetcher,
            repository,
        }
    }

    pub async fn execute(&self) -> Result<SyncReport, SyncError> {
        info!("[SYNC] Starting synchronisation");

        let mut submissions = self.fetcher.fetch_submissions().await.map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Fetching submissions failed");
            SyncError::Fetch(e)
        })?;
        if submissions.is_empty() {
            error!("[SYNC][ERROR] No submissions fetched, nothing to commit");
            return Err(SyncError::NothingToSync);
        }
        submissions.sort_by_key(|s| s.last_submitted_at);

        let total = submissions.len();
        info!(total, "[SYNC] Fetched submissions, committing them next");
        let mut report = SyncReport {
            fetched: total,
            ..SyncReport::default()
        };

        for (idx, submission) in submissions.iter().enumerate() {
            let artifact = Artifact::from_submission(submission);
            match self.repository.commit(&artifact) {
                Ok(CommitOutcome::Committed) => report.committed += 1,
                Ok(CommitOutcome::NothingToCommit) => report.unchanged += 1,
                Err(RepositoryError::FolderExists { path }) => {
                    info!(
                        question_id = %submission.id,
                        path = %path.display(),
                        "[SYNC] Question already synced, skipping"
                    );
                    report.already_synced += 1;
                }
                Err(e) if e.is_fatal() => {
                    error!(question_id = %submission.id, error = %e, "[SYNC][ERROR] Unrecoverable repository error");
                    return Err(SyncError::Repository(e));
                }
                Err(e) => {
                    error!(question_id = %submission.id, error = %e, "[SYNC][ERROR] Commit failed, continuing");
                    report.failed.push(FailedCommit {
                        question_id: submission.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
            info!(
                question_id = %submission.id,
                percent = (idx + 1) * 100 / total,
                "[SYNC] Processed question {} of {}",
                idx + 1,
                total
            );
        }

        self.repository.push().map_err(|e| {
            error!(error = %e, "[SYNC][ERROR] Push failed");
            SyncError::Push(e)
        })?;

        info!(
            committed = report.committed,
            unchanged = report.unchanged,
            already_synced = report.already_synced,
            failed = report.failed.len(),
            "[SYNC] Synchronisation complete"
        );
        Ok(report)
    }
}
