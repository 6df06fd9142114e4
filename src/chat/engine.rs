//! Retrieval-augmented conversation engine.
//!
//! Owns one session's conversational state: the active company and the
//! accumulated history. Each turn decides what supporting facts to retrieve,
//! assembles the prompt, calls the model under a bounded retry policy, and
//! records the exchange.

use std::sync::Arc;

use tokio::time::{sleep, timeout};

use crate::core::config::{EngineSettings, ModelSettings};
use crate::core::errors::ApiError;
use crate::llm::{CompletionModel, CompletionRequest};
use crate::report::REPORT_SECTIONS;
use crate::store::{MetricFact, MetricStore, Topic, VectorIndex};

use super::prompt::{self, CLARIFICATION_REPLY};
use super::backoff_delay;

/// One completed user/assistant turn.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Upper bound on facts carried into a single prompt.
const MAX_CONTEXT_FACTS: usize = 6;
/// Upper bound on metric-store lookups per turn.
const MAX_LOOKUP_TARGETS: usize = 4;

struct RetrievalPlan {
    targets: Vec<(Topic, &'static str)>,
    similarity_topic: Option<Topic>,
}

pub struct ConversationEngine {
    company: String,
    model: Arc<dyn CompletionModel>,
    metrics: MetricStore,
    index: VectorIndex,
    engine_cfg: EngineSettings,
    sampling: ModelSettings,
    history: Vec<Exchange>,
}

impl ConversationEngine {
    pub fn new(
        company: String,
        model: Arc<dyn CompletionModel>,
        metrics: MetricStore,
        index: VectorIndex,
        engine_cfg: EngineSettings,
        sampling: ModelSettings,
    ) -> Self {
        Self {
            company,
            model,
            metrics,
            index,
            engine_cfg,
            sampling,
            history: Vec::new(),
        }
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Clear the conversation history. Idempotent.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Produce a grounded reply for one user turn.
    ///
    /// Expected failure modes (empty retrieval, blank or malformed model
    /// output) degrade to a deterministic clarification reply. Transport
    /// failures that survive the retry budget surface as `Upstream`.
    pub async fn get_response(&mut self, user_message: &str) -> Result<String, ApiError> {
        let message = user_message.trim();
        if message.is_empty() {
            return Ok(CLARIFICATION_REPLY.to_string());
        }

        let facts = self.retrieve_context(message).await?;
        if !facts.is_empty() {
            tracing::debug!("Retrieved {} supporting facts for turn", facts.len());
        }

        let prompt = prompt::chat_prompt(&self.company, &self.history, &facts, message);
        let request = CompletionRequest::new(prompt).with_settings(&self.sampling);

        let reply = match self.complete_with_retry(request).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    CLARIFICATION_REPLY.to_string()
                } else {
                    trimmed.to_string()
                }
            }
            Err(ApiError::Parse(reason)) => {
                tracing::warn!("Model output unusable after retries: {}", reason);
                CLARIFICATION_REPLY.to_string()
            }
            Err(err) => return Err(err),
        };

        self.history.push(Exchange {
            user: message.to_string(),
            assistant: reply.clone(),
        });
        let limit = self.engine_cfg.history_limit.max(1);
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }

        Ok(reply)
    }

    /// Gather supporting facts for the turn.
    ///
    /// Subcategory mentions drive exact metric lookups; any topical mention
    /// also consults the embedding index. Similarity absence or an
    /// unreachable embedding backend degrade to fewer facts, never an error.
    async fn retrieve_context(&self, message: &str) -> Result<Vec<MetricFact>, ApiError> {
        let plan = retrieval_plan(message);
        let mut facts: Vec<MetricFact> = Vec::new();

        for (topic, phrase) in plan.targets.iter().take(MAX_LOOKUP_TARGETS) {
            for fact in self.metrics.get_metrics(&self.company, *topic, phrase).await? {
                if !facts.contains(&fact) {
                    facts.push(fact);
                }
            }
        }

        if let Some(topic) = plan.similarity_topic {
            match self.similar_fact(message, topic).await {
                Ok(fact) => {
                    if !facts.contains(&fact) {
                        facts.push(fact);
                    }
                }
                Err(err) => tracing::debug!("Similarity retrieval skipped: {}", err),
            }
        }

        facts.truncate(MAX_CONTEXT_FACTS);
        Ok(facts)
    }

    async fn similar_fact(&self, message: &str, topic: Topic) -> Result<MetricFact, ApiError> {
        let embedding = self
            .model
            .embed(&[message.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Parse("embedding response was empty".into()))?;

        self.index.closest_fact(&self.company, topic, &embedding).await
    }

    async fn complete_with_retry(&self, request: CompletionRequest) -> Result<String, ApiError> {
        let attempts = self.engine_cfg.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            let outcome = timeout(self.engine_cfg.deadline, self.model.complete(request.clone())).await;

            let err = match outcome {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(err)) => err,
                Err(_) => ApiError::Upstream(format!(
                    "model call exceeded the {}s deadline",
                    self.engine_cfg.deadline.as_secs()
                )),
            };

            if !err.is_retryable() {
                return Err(err);
            }

            tracing::warn!("Model attempt {}/{} failed: {}", attempt, attempts, err);
            last_err = Some(err);

            if attempt < attempts {
                sleep(backoff_delay(self.engine_cfg.backoff_base, attempt)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| ApiError::internal("retry loop made no attempts")))
    }
}

fn retrieval_plan(message: &str) -> RetrievalPlan {
    let lowered = message.to_lowercase();
    let mut targets = Vec::new();
    let mut similarity_topic = None;

    for (pillar, topic, cells) in REPORT_SECTIONS {
        if similarity_topic.is_none() && lowered.contains(&pillar.to_lowercase()) {
            similarity_topic = Some(*topic);
        }

        for (_, phrase) in *cells {
            if lowered.contains(phrase) {
                targets.push((*topic, *phrase));
                if similarity_topic.is_none() {
                    similarity_topic = Some(*topic);
                }
            }
        }
    }

    RetrievalPlan {
        targets,
        similarity_topic,
    }
}
