use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::contract::{Question, Submission, SubmissionFetcher};
use crate::error::FetchError;
use crate::leetcode::{LeetCodeClient, QueryTransport};

/// [`SubmissionFetcher`] backed by the LeetCode GraphQL queries.
///
/// One question-list query, then an overview and a code query per question.
/// A question whose lookups fail is logged and skipped.
pub struct LeetCodeFetcher<T> {
    client: LeetCodeClient<T>,
}

impl<T: QueryTransport> LeetCodeFetcher<T> {
    pub fn new(client: LeetCodeClient<T>) -> Self {
        Self { client }
    }

    async fn fetch_one(&self, question: Question) -> Result<Submission, FetchError> {
        let overview = self
            .client
            .fetch_submission_overview(&question.title_slug)
            .await?;
        let code = self.client.fetch_submission_code(&overview.id).await?;
        Ok(Submission::from_parts(question, overview, code))
    }
}

#[async_trait]
impl<T: QueryTransport> SubmissionFetcher for LeetCodeFetcher<T> {
    async fn fetch_submissions(&self) -> Result<Vec<Submission>, FetchError> {
        let questions = self.client.fetch_questions().await.map_err(|e| {
            error!(error = %e, "[FETCH][ERROR] Could not fetch the solved question list");
            e
        })?;

        let total = questions.len();
        let mut seen_ids = HashSet::new();
        let mut seen_slugs = HashSet::new();
        let mut submissions = Vec::with_capacity(total);
        let mut failed = 0usize;

        for question in questions {
            if !seen_ids.insert(question.id.clone()) || !seen_slugs.insert(question.title_slug.clone()) {
                warn!(
                    question_id = %question.id,
                    title_slug = %question.title_slug,
                    "[FETCH] Duplicate question in list, skipping"
                );
                continue;
            }

            let question_id = question.id.clone();
            let title = question.title.clone();
            match self.fetch_one(question).await {
                Ok(submission) => {
                    info!(
                        question_id = %submission.id,
                        lang = %submission.language,
                        progress = format!("{}/{}", submissions.len() + failed + 1, total),
                        "[FETCH] Fetched submission"
                    );
                    submissions.push(submission);
                }
                Err(e) => {
                    failed += 1;
                    error!(
                        question_id = %question_id,
                        title = %title,
                        stage = ?e.operation().map(|op| op.to_string()),
                        error = %e,
                        "[FETCH][ERROR] Skipping question"
                    );
                }
            }
        }

        if submissions.is_empty() && failed > 0 {
            return Err(FetchError::NoSubmissions { attempted: failed });
        }

        info!(
            fetched = submissions.len(),
            failed,
            "[FETCH] Finished fetching submissions"
        );
        Ok(submissions)
    }
}
