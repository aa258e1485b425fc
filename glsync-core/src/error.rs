//! Error types for every stage of the pipeline.
//!
//! Fetch errors always carry the [`Operation`] that failed, repository errors
//! always carry the working-copy path, so a terminal error tells the operator
//! which stage broke and where to look.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by a [`crate::leetcode::QueryTransport`].
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// The remote query a fetch error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    QuestionList,
    SubmissionOverview,
    SubmissionCode,
}

impl Operation {
    /// GraphQL `operationName` sent for this query.
    pub fn operation_name(&self) -> &'static str {
        match self {
            Operation::QuestionList => "userProgressQuestionList",
            Operation::SubmissionOverview => "submissionList",
            Operation::SubmissionCode => "submissionDetails",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Operation::QuestionList => "question list",
            Operation::SubmissionOverview => "submission overview",
            Operation::SubmissionCode => "submission code",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure while fetching {operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("malformed {operation} response: {source}")]
    Parse {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} response for {subject} carried no data")]
    EmptyPayload {
        operation: Operation,
        subject: String,
    },

    #[error(
        "submission code for submission {submission_id} was still unavailable after {attempts} attempts; last response: {last_response}"
    )]
    RetriesExhausted {
        submission_id: String,
        attempts: u32,
        last_response: String,
    },

    #[error("none of the {attempted} solved questions could be fetched")]
    NoSubmissions { attempted: usize },
}

impl FetchError {
    /// Stage this error was raised in, if it belongs to a single query.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            FetchError::Transport { operation, .. }
            | FetchError::Parse { operation, .. }
            | FetchError::EmptyPayload { operation, .. } => Some(*operation),
            FetchError::RetriesExhausted { .. } => Some(Operation::SubmissionCode),
            FetchError::NoSubmissions { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(
        "failed to clone {url} into {path}; create the repository before running glsync: {stderr}"
    )]
    Clone {
        url: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("failed to launch git for `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("folder {path} already exists in the working copy")]
    FolderExists { path: PathBuf },

    #[error("{path} is not a git repository")]
    NotARepository { path: PathBuf },

    #[error("`git {command}` failed in {path}: {stderr}")]
    Git {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("`git push` failed; local commits are kept in {path} for a manual push: {stderr}")]
    Push { path: PathBuf, stderr: String },
}

impl RepositoryError {
    /// Errors after which no further commit in the same working copy can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RepositoryError::NotARepository { .. } | RepositoryError::Spawn { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching submissions failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("no submissions were fetched, nothing to commit")]
    NothingToSync,

    #[error("unrecoverable repository error: {0}")]
    Repository(#[source] RepositoryError),

    #[error("pushing commits failed: {0}")]
    Push(#[source] RepositoryError),
}
