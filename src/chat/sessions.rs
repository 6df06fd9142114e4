//! Session registry.
//!
//! Conversation state is keyed by an explicit session id; each session's
//! engine sits behind its own async lock so concurrent requests for
//! different sessions never share mutable state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::core::config::{EngineSettings, ModelSettings};
use crate::llm::CompletionModel;
use crate::store::{MetricStore, VectorIndex};

use super::engine::ConversationEngine;

/// Session id used when a request does not carry one.
pub const DEFAULT_SESSION: &str = "default";

struct SessionEntry {
    company: String,
    engine: Arc<Mutex<ConversationEngine>>,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    model: Arc<dyn CompletionModel>,
    metrics: MetricStore,
    index: VectorIndex,
    engine_cfg: EngineSettings,
    sampling: ModelSettings,
    default_company: String,
}

impl SessionManager {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        metrics: MetricStore,
        index: VectorIndex,
        engine_cfg: EngineSettings,
        sampling: ModelSettings,
        default_company: String,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            model,
            metrics,
            index,
            engine_cfg,
            sampling,
            default_company,
        }
    }

    fn make_engine(&self, company: &str) -> Arc<Mutex<ConversationEngine>> {
        Arc::new(Mutex::new(ConversationEngine::new(
            company.to_string(),
            self.model.clone(),
            self.metrics.clone(),
            self.index.clone(),
            self.engine_cfg.clone(),
            self.sampling.clone(),
        )))
    }

    /// The engine for a session, created lazily with the default company.
    pub async fn engine(&self, session_id: &str) -> Arc<Mutex<ConversationEngine>> {
        if let Some(entry) = self.sessions.read().await.get(session_id) {
            return entry.engine.clone();
        }

        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                company: self.default_company.clone(),
                engine: self.make_engine(&self.default_company),
            });
        entry.engine.clone()
    }

    /// The company a session is currently talking about.
    pub async fn active_company(&self, session_id: &str) -> String {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.company.clone())
            .unwrap_or_else(|| self.default_company.clone())
    }

    /// Reset a session: same company clears its history, a different
    /// company installs a fresh engine. Stale handles keep pointing at the
    /// retired engine and cannot touch the new one.
    pub async fn reset(&self, session_id: &str, company: &str) {
        let existing = {
            let sessions = self.sessions.read().await;
            sessions
                .get(session_id)
                .map(|entry| (entry.company.clone(), entry.engine.clone()))
        };

        match existing {
            Some((current, engine)) if current == company => {
                engine.lock().await.reset();
                tracing::debug!("Session '{}' history cleared", session_id);
            }
            _ => {
                let mut sessions = self.sessions.write().await;
                sessions.insert(
                    session_id.to_string(),
                    SessionEntry {
                        company: company.to_string(),
                        engine: self.make_engine(company),
                    },
                );
                tracing::info!("Session '{}' now tracking '{}'", session_id, company);
            }
        }
    }
}
