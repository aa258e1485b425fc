#![doc = "glsync-core: fetches accepted LeetCode submissions and commits them to git."]

//! All pipeline logic lives here; the `glsync` crate only adds the CLI,
//! configuration loading and the tracing subscriber.
//!
//! # Layout
//! - [`leetcode`]: GraphQL client with bounded retry for submission code
//! - [`fetcher`]: turns the client's queries into a list of submissions
//! - [`git`]: working copy, timestamped commits and push
//! - [`synchronise`]: the run itself

pub mod config;
pub mod contract;
pub mod error;
pub mod fetcher;
pub mod git;
pub mod leetcode;
pub mod synchronise;

pub use config::SyncConfig;
pub use contract::{Artifact, CommitOutcome, Question, Submission, SubmissionOverview};
pub use error::{FetchError, Operation, RepositoryError, SyncError};
pub use synchronise::{SyncReport, Synchroniser};
pub use reqwest::Url;
