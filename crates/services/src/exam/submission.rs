use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use exam_core::model::{Answer, ExamId, HotspotResponse, ItemKey, TestItem};

use crate::error::EvaluationError;

//
// ─── PAYLOADS ──────────────────────────────────────────────────────────────────
//

/// Finalized learner data for one sitting, handed to results whatever the evaluator says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionBundle {
    pub answers: BTreeMap<String, Answer>,
    pub exercise_responses: BTreeMap<String, BTreeMap<String, HotspotResponse>>,
    pub elapsed_seconds: u64,
    pub item_order: Vec<ItemKey>,
}

/// Why the session was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    Manual,
    TimeExpired,
}

/// Everything needed to evaluate a submission, detached from the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTicket {
    pub exam_id: ExamId,
    pub reason: SubmitReason,
    pub bundle: SubmissionBundle,
    pub items: Vec<TestItem>,
}

/// Scored result returned by an evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    #[serde(default)]
    pub breakdown: serde_json::Value,
}

/// What the results screen receives.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub reason: SubmitReason,
    pub bundle: SubmissionBundle,
    pub evaluation: Option<Evaluation>,
    /// Why evaluation failed, when it did.
    pub evaluation_error: Option<String>,
}

impl SessionOutcome {
    /// True when results show raw answers because evaluation failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.evaluation.is_none()
    }
}

//
// ─── EVALUATORS ────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Score a submission.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` if the submission cannot be scored.
    async fn evaluate_session(
        &self,
        exam_id: ExamId,
        ticket: &SubmissionTicket,
    ) -> Result<Evaluation, EvaluationError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluatorConfig {
    base_url: Url,
}

impl EvaluatorConfig {
    /// # Errors
    ///
    /// Returns `EvaluationError::InvalidUrl` unless `base_url` is an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, EvaluationError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| EvaluationError::InvalidUrl(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(EvaluationError::InvalidUrl(format!(
                "unsupported scheme {}",
                base_url.scheme()
            )));
        }
        Ok(Self { base_url })
    }

    /// Read `EXAM_EVALUATOR_URL`. Unset or blank means no evaluator.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError::InvalidUrl` for a malformed value.
    pub fn from_env() -> Result<Option<Self>, EvaluationError> {
        match env::var("EXAM_EVALUATOR_URL") {
            Ok(value) if !value.trim().is_empty() => Self::new(&value).map(Some),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn evaluate_url(&self, exam_id: ExamId) -> String {
        format!(
            "{}/exams/{}/evaluate",
            self.base_url.as_str().trim_end_matches('/'),
            exam_id
        )
    }
}

/// Evaluator backed by the remote scoring service.
#[derive(Clone)]
pub struct HttpEvaluator {
    client: Client,
    config: Option<EvaluatorConfig>,
}

impl HttpEvaluator {
    #[must_use]
    pub fn new(config: Option<EvaluatorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    async fn evaluate_session(
        &self,
        exam_id: ExamId,
        ticket: &SubmissionTicket,
    ) -> Result<Evaluation, EvaluationError> {
        let config = self.config.as_ref().ok_or(EvaluationError::Disabled)?;
        let payload = EvaluateRequest {
            answers: &ticket.bundle.answers,
            exercise_responses: &ticket.bundle.exercise_responses,
            items: &ticket.items,
        };

        let response = self
            .client
            .post(config.evaluate_url(exam_id))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EvaluationError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    answers: &'a BTreeMap<String, Answer>,
    exercise_responses: &'a BTreeMap<String, BTreeMap<String, HotspotResponse>>,
    items: &'a [TestItem],
}

//
// ─── PIPELINE ──────────────────────────────────────────────────────────────────
//

/// Where a session is in its single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Open,
    InFlight,
    Finalized,
}

/// Runs a ticket through the evaluator and always produces an outcome.
#[derive(Clone)]
pub struct SubmissionPipeline {
    evaluator: Arc<dyn Evaluator>,
}

impl SubmissionPipeline {
    #[must_use]
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self { evaluator }
    }

    pub async fn run(&self, ticket: SubmissionTicket) -> SessionOutcome {
        let result = self
            .evaluator
            .evaluate_session(ticket.exam_id, &ticket)
            .await;
        let SubmissionTicket { reason, bundle, .. } = ticket;
        match result {
            Ok(evaluation) => {
                tracing::info!(
                    score = evaluation.score,
                    elapsed_seconds = bundle.elapsed_seconds,
                    reason = ?reason,
                    "Session evaluated"
                );
                SessionOutcome {
                    reason,
                    bundle,
                    evaluation: Some(evaluation),
                    evaluation_error: None,
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    elapsed_seconds = bundle.elapsed_seconds,
                    reason = ?reason,
                    "Evaluation failed, showing unevaluated answers"
                );
                SessionOutcome {
                    reason,
                    bundle,
                    evaluation: None,
                    evaluation_error: Some(err.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    #[async_trait]
    impl Evaluator for Fixed {
        async fn evaluate_session(
            &self,
            _exam_id: ExamId,
            _ticket: &SubmissionTicket,
        ) -> Result<Evaluation, EvaluationError> {
            Ok(Evaluation {
                score: self.0,
                breakdown: serde_json::json!({ "q-1": 1 }),
            })
        }
    }

    fn ticket() -> SubmissionTicket {
        let mut answers = BTreeMap::new();
        answers.insert("q-1".to_string(), Answer::Boolean(true));
        SubmissionTicket {
            exam_id: ExamId::new(9),
            reason: SubmitReason::Manual,
            bundle: SubmissionBundle {
                answers,
                exercise_responses: BTreeMap::new(),
                elapsed_seconds: 42,
                item_order: Vec::new(),
            },
            items: Vec::new(),
        }
    }

    #[test]
    fn config_builds_evaluate_url() {
        let config = EvaluatorConfig::new("https://scoring.example.com/api/").unwrap();
        assert_eq!(
            config.evaluate_url(ExamId::new(3)),
            "https://scoring.example.com/api/exams/3/evaluate"
        );
    }

    #[test]
    fn config_rejects_non_http_urls() {
        assert!(matches!(
            EvaluatorConfig::new("ftp://example.com"),
            Err(EvaluationError::InvalidUrl(_))
        ));
        assert!(matches!(
            EvaluatorConfig::new("not a url"),
            Err(EvaluationError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn successful_evaluation_is_attached() {
        let outcome = SubmissionPipeline::new(Arc::new(Fixed(0.75)))
            .run(ticket())
            .await;
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.evaluation.map(|e| e.score), Some(0.75));
        assert_eq!(outcome.bundle.elapsed_seconds, 42);
    }

    #[tokio::test]
    async fn disabled_http_evaluator_degrades_but_keeps_answers() {
        let outcome = SubmissionPipeline::new(Arc::new(HttpEvaluator::new(None)))
            .run(ticket())
            .await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.bundle, ticket().bundle);
        assert!(outcome.evaluation_error.is_some());
    }
}
