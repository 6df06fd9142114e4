//! Follow-up question generation.
//!
//! Asks the model for exactly two follow-up questions as a JSON array,
//! validates strictly, and never loops forever: parse failures are retried
//! a bounded number of times and then replaced by a fixed default pair.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::{sleep, timeout};

use crate::core::config::{EngineSettings, ModelSettings};
use crate::core::errors::ApiError;
use crate::llm::{CompletionModel, CompletionRequest};

use super::backoff_delay;
use super::prompt;

/// Returned when the model cannot produce a valid pair within the retry
/// budget.
pub const DEFAULT_FOLLOW_UPS: [&str; 2] = [
    "Which of our environmental metrics has the most room for improvement?",
    "How do our social and governance indicators compare with industry peers?",
];

pub struct FollowUpGenerator {
    model: Arc<dyn CompletionModel>,
    engine_cfg: EngineSettings,
    sampling: ModelSettings,
}

impl FollowUpGenerator {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        engine_cfg: EngineSettings,
        sampling: ModelSettings,
    ) -> Self {
        Self {
            model,
            engine_cfg,
            sampling,
        }
    }

    /// Generate exactly two follow-up questions from a full ESG report.
    ///
    /// Malformed output exhausting the retry budget yields the default
    /// pair; an unreachable model backend surfaces as `Upstream`.
    pub async fn generate(&self, company: &str, report: &Value) -> Result<Vec<String>, ApiError> {
        let prompt = prompt::follow_up_prompt(company, report);
        let attempts = self.engine_cfg.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            let request = CompletionRequest::new(prompt.clone()).with_settings(&self.sampling);
            let outcome = timeout(self.engine_cfg.deadline, self.model.complete(request)).await;

            let err = match outcome {
                Ok(Ok(raw)) => match parse_questions(&raw) {
                    Ok(questions) => return Ok(questions),
                    Err(err) => err,
                },
                Ok(Err(err)) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    err
                }
                Err(_) => ApiError::Upstream(format!(
                    "follow-up generation exceeded the {}s deadline",
                    self.engine_cfg.deadline.as_secs()
                )),
            };

            tracing::warn!(
                "Follow-up attempt {}/{} failed: {}",
                attempt,
                attempts,
                err
            );
            last_err = Some(err);

            if attempt < attempts {
                sleep(backoff_delay(self.engine_cfg.backoff_base, attempt)).await;
            }
        }

        match last_err {
            Some(ApiError::Parse(reason)) => {
                tracing::warn!("Falling back to default follow-ups: {}", reason);
                Ok(DEFAULT_FOLLOW_UPS.iter().map(|q| q.to_string()).collect())
            }
            Some(err) => Err(err),
            None => Err(ApiError::internal("retry loop made no attempts")),
        }
    }
}

/// Decode the model's output into exactly two question strings.
///
/// Strict parse of the whole (trimmed) output first; falls back to the
/// first-`[`-to-last-`]` substring for output wrapped in prose or a code
/// fence. The decoded value must be an array of at least two strings.
fn parse_questions(raw: &str) -> Result<Vec<String>, ApiError> {
    let trimmed = raw.trim();

    let decoded = serde_json::from_str::<Vec<String>>(trimmed).or_else(|_| {
        match (trimmed.find('['), trimmed.rfind(']')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Vec<String>>(&trimmed[start..=end])
                    .map_err(|e| ApiError::Parse(format!("follow-up array did not decode: {}", e)))
            }
            _ => Err(ApiError::Parse("no JSON array in follow-up output".into())),
        }
    })?;

    if decoded.len() < 2 {
        return Err(ApiError::Parse(format!(
            "expected 2 follow-up questions, got {}",
            decoded.len()
        )));
    }

    Ok(decoded.into_iter().take(2).collect())
}
