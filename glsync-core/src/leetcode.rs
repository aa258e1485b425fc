//! Typed client for the three LeetCode GraphQL queries glsync needs.
//!
//! The client never talks HTTP itself: it builds request bodies from the
//! injected [`QueryTemplates`] and hands them to a [`QueryTransport`]. The
//! production transport is [`HttpTransport`]; tests plug in `MockQueryTransport`.

use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use reqwest::header;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::contract::{Question, SubmissionOverview};
use crate::error::{FetchError, Operation, TransportError};

pub const DEFAULT_ENDPOINT: &str = "https://leetcode.com/graphql/";
pub const SESSION_COOKIE_NAME: &str = "LEETCODE_SESSION";

/// Upper bound on solved questions requested in one question-list query.
const QUESTION_LIST_LIMIT: u32 = 4000;
/// Submission status code of an accepted answer.
const ACCEPTED_STATUS: u32 = 10;
const BODY_PREVIEW_CHARS: usize = 512;

const QUESTION_LIST_QUERY: &str = r#"
query userProgressQuestionList($filters: UserProgressQuestionListInput) {
  userProgressQuestionList(filters: $filters) {
    questions {
      frontendId
      title
      titleSlug
      lastSubmittedAt
      questionStatus
      lastResult
    }
  }
}
"#;

const SUBMISSION_LIST_QUERY: &str = r#"
query submissionList($offset: Int!, $limit: Int!, $lastKey: String, $questionSlug: String!, $lang: Int, $status: Int) {
  questionSubmissionList(
    offset: $offset
    limit: $limit
    lastKey: $lastKey
    questionSlug: $questionSlug
    lang: $lang
    status: $status
  ) {
    lastKey
    hasNext
    submissions {
      id
      titleSlug
      status
      statusDisplay
      lang
      timestamp
    }
  }
}
"#;

const SUBMISSION_DETAILS_QUERY: &str = r#"
query submissionDetails($submissionId: Int!) {
  submissionDetails(submissionId: $submissionId) {
    code
    timestamp
    statusCode
    lang {
      name
    }
    question {
      questionId
      titleSlug
    }
  }
}
"#;

/// GraphQL documents for the three queries, injected at construction time.
#[derive(Debug, Clone)]
pub struct QueryTemplates {
    pub question_list: String,
    pub submission_list: String,
    pub submission_details: String,
}

impl Default for QueryTemplates {
    fn default() -> Self {
        Self {
            question_list: QUESTION_LIST_QUERY.to_string(),
            submission_list: SUBMISSION_LIST_QUERY.to_string(),
            submission_details: SUBMISSION_DETAILS_QUERY.to_string(),
        }
    }
}

/// Bounded retry for the submission-code query: one initial attempt plus
/// `max_retries` retries, sleeping `backoff` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Sends one GraphQL request body and returns the raw response text.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn post(&self, body: Value) -> Result<String, TransportError>;
}

/// [`QueryTransport`] over HTTPS, authenticated with the session cookie.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    session_cookie: String,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(
        endpoint: Url,
        session_cookie: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("glsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            session_cookie: session_cookie.into(),
            bearer_token,
        })
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn post(&self, body: Value) -> Result<String, TransportError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(
                header::COOKIE,
                format!("{SESSION_COOKIE_NAME}={}", self.session_cookie),
            )
            .header(header::REFERER, self.endpoint.origin().ascii_serialization())
            .json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
            return Err(format!("endpoint returned {status}: {preview}").into());
        }
        Ok(text)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionListData {
    user_progress_question_list: Option<QuestionList>,
}

#[derive(Deserialize)]
struct QuestionList {
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    frontend_id: String,
    title: String,
    title_slug: String,
    #[serde(default)]
    last_submitted_at: Option<String>,
}

impl RawQuestion {
    /// `None` when the submission time is missing or not RFC 3339.
    fn into_question(self) -> Option<Question> {
        let parsed = self
            .last_submitted_at
            .as_deref()
            .map(chrono::DateTime::parse_from_rfc3339);
        match parsed {
            Some(Ok(last_submitted_at)) => Some(Question {
                id: self.frontend_id,
                title: self.title,
                title_slug: self.title_slug,
                last_submitted_at,
            }),
            _ => {
                warn!(
                    question_id = %self.frontend_id,
                    title = %self.title,
                    last_submitted_at = ?self.last_submitted_at,
                    "[FETCH] Question has no usable submission time, skipping"
                );
                None
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionListData {
    question_submission_list: Option<SubmissionList>,
}

#[derive(Deserialize)]
struct SubmissionList {
    #[serde(default)]
    submissions: Vec<RawOverview>,
}

#[derive(Deserialize)]
struct RawOverview {
    id: String,
    lang: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionDetailsData {
    submission_details: Option<SubmissionDetails>,
}

#[derive(Deserialize)]
struct SubmissionDetails {
    code: Option<String>,
}

pub struct LeetCodeClient<T> {
    transport: T,
    templates: QueryTemplates,
    retry: RetryPolicy,
}

impl<T: QueryTransport> LeetCodeClient<T> {
    pub fn new(transport: T, templates: QueryTemplates, retry: RetryPolicy) -> Self {
        Self {
            transport,
            templates,
            retry,
        }
    }

    /// All questions the session's user has solved.
    pub async fn fetch_questions(&self) -> Result<Vec<Question>, FetchError> {
        let operation = Operation::QuestionList;
        let body = json!({
            "query": self.templates.question_list,
            "variables": {
                "filters": {
                    "questionStatus": "SOLVED",
                    "skip": 0,
                    "limit": QUESTION_LIST_LIMIT,
                }
            },
            "operationName": operation.operation_name(),
        });

        let raw = self.send(operation, body).await?;
        let list = parse_data::<QuestionListData>(operation, &raw)?
            .and_then(|data| data.user_progress_question_list)
            .ok_or_else(|| FetchError::EmptyPayload {
                operation,
                subject: "solved questions".to_string(),
            })?;

        let questions: Vec<Question> = list
            .questions
            .into_iter()
            .filter_map(RawQuestion::into_question)
            .collect();
        info!(count = questions.len(), "[FETCH] Fetched solved question list");
        Ok(questions)
    }

    /// Latest accepted submission for the question; only the first entry of
    /// the overview list is used.
    pub async fn fetch_submission_overview(
        &self,
        title_slug: &str,
    ) -> Result<SubmissionOverview, FetchError> {
        let operation = Operation::SubmissionOverview;
        let body = json!({
            "query": self.templates.submission_list,
            "variables": {
                "questionSlug": title_slug,
                "offset": 0,
                "limit": 1,
                "lastKey": null,
                "status": ACCEPTED_STATUS,
            },
            "operationName": operation.operation_name(),
        });

        let raw = self.send(operation, body).await?;
        let latest = parse_data::<SubmissionListData>(operation, &raw)?
            .and_then(|data| data.question_submission_list)
            .and_then(|list| list.submissions.into_iter().next())
            .ok_or_else(|| FetchError::EmptyPayload {
                operation,
                subject: title_slug.to_string(),
            })?;

        debug!(title_slug, submission_id = %latest.id, lang = %latest.lang, "[FETCH] Fetched submission overview");
        Ok(SubmissionOverview {
            id: latest.id,
            language: latest.lang,
        })
    }

    /// Source code of one submission.
    ///
    /// The endpoint intermittently answers with an empty `code` (or no
    /// details object at all) for submissions that do exist. Such answers and
    /// transport failures are retried under the client's [`RetryPolicy`];
    /// malformed responses are returned immediately.
    pub async fn fetch_submission_code(&self, submission_id: &str) -> Result<String, FetchError> {
        let operation = Operation::SubmissionCode;
        let id_variable = submission_id
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(submission_id));
        let body = json!({
            "query": self.templates.submission_details,
            "variables": { "submissionId": id_variable },
            "operationName": operation.operation_name(),
        });

        let max_attempts = self.retry.max_attempts();
        let mut attempt: u32 = 1;
        loop {
            let last_response = match self.send(operation, body.clone()).await {
                Ok(raw) => {
                    let code = parse_data::<SubmissionDetailsData>(operation, &raw)?
                        .and_then(|data| data.submission_details)
                        .and_then(|details| details.code)
                        .filter(|code| !code.is_empty());
                    match code {
                        Some(code) => {
                            if attempt > 1 {
                                info!(submission_id, attempt, "[FETCH] Submission code recovered after retry");
                            }
                            return Ok(code);
                        }
                        None => raw,
                    }
                }
                Err(FetchError::Transport { source, .. }) => source.to_string(),
                Err(other) => return Err(other),
            };

            if attempt >= max_attempts {
                return Err(FetchError::RetriesExhausted {
                    submission_id: submission_id.to_string(),
                    attempts: attempt,
                    last_response,
                });
            }

            warn!(
                submission_id,
                attempt,
                max_attempts,
                backoff_ms = self.retry.backoff.as_millis() as u64,
                "[FETCH] Submission code unavailable, retrying"
            );
            tokio::time::sleep(self.retry.backoff).await;
            attempt += 1;
        }
    }

    async fn send(&self, operation: Operation, body: Value) -> Result<String, FetchError> {
        debug!(%operation, "[FETCH] Sending query");
        self.transport
            .post(body)
            .await
            .map_err(|source| FetchError::Transport { operation, source })
    }
}

fn parse_data<P: DeserializeOwned>(operation: Operation, raw: &str) -> Result<Option<P>, FetchError> {
    serde_json::from_str::<Envelope<P>>(raw)
        .map(|envelope| envelope.data)
        .map_err(|source| FetchError::Parse { operation, source })
}
