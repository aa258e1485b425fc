//! # contract: shared records and the two seams of the pipeline
//!
//! The synchroniser only talks to the outside world through two traits:
//! - [`SubmissionFetcher`]: produces the list of [`Submission`]s for one run.
//! - [`RepositoryBackend`]: materializes one [`Artifact`] as a commit, then pushes.
//!
//! Both traits are annotated for `mockall` so the orchestration can be tested
//! without a network or a git binary. Mocks are exported under the default
//! `test-export-mocks` feature for the integration tests in `tests/`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use mockall::automock;

use crate::error::{FetchError, RepositoryError};

/// A solved problem as listed by the question-list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Frontend id shown on the judge, e.g. `"128"`.
    pub id: String,
    pub title: String,
    pub title_slug: String,
    pub last_submitted_at: DateTime<FixedOffset>,
}

/// Identity of the latest accepted submission for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOverview {
    pub id: String,
    pub language: String,
}

/// Everything needed to commit one problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub title_slug: String,
    pub last_submitted_at: DateTime<FixedOffset>,
    pub language: String,
    pub code: String,
}

impl Submission {
    pub fn from_parts(question: Question, overview: SubmissionOverview, code: String) -> Self {
        Self {
            id: question.id,
            title: question.title,
            title_slug: question.title_slug,
            last_submitted_at: question.last_submitted_at,
            language: overview.language,
            code,
        }
    }
}

/// File plus commit derived from a [`Submission`], built right before committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub folder_name: String,
    pub file_name: String,
    pub content: String,
    pub commit_message: String,
    pub timestamp: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Staging produced no changes; the commit was skipped.
    NothingToCommit,
}

/// Source of submissions for a run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SubmissionFetcher: Send + Sync {
    /// Fetch the latest accepted submission of every solved question.
    ///
    /// Individual questions that cannot be fetched are skipped. Returns
    /// [`FetchError::NoSubmissions`] when there were questions but none of
    /// them could be fetched, and `Ok(vec![])` when there were no questions.
    async fn fetch_submissions(&self) -> Result<Vec<Submission>, FetchError>;
}

/// A local working copy that artifacts are committed into.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait RepositoryBackend: Send + Sync {
    /// Write the artifact's file and commit it with the artifact's timestamp
    /// as both author and committer date.
    fn commit(&self, artifact: &Artifact) -> Result<CommitOutcome, RepositoryError>;

    /// Push the current branch and remove the working copy.
    fn push(&self) -> Result<(), RepositoryError>;
}
