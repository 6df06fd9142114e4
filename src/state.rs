use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chat::{FollowUpGenerator, SessionManager};
use crate::core::config::Settings;
use crate::llm::{CompletionModel, TogetherProvider};
use crate::store::{MetricStore, VectorIndex};

pub struct AppState {
    pub settings: Settings,
    pub metrics: MetricStore,
    pub index: VectorIndex,
    pub model: Arc<dyn CompletionModel>,
    pub sessions: SessionManager,
    pub follow_ups: FollowUpGenerator,
    #[allow(dead_code)]
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let settings = Settings::from_env();
        let model: Arc<dyn CompletionModel> = Arc::new(TogetherProvider::new(&settings.model)?);
        Self::with_model(settings, model).await
    }

    /// Assemble the state around an explicit model handle. Lets tests swap
    /// in a scripted provider.
    pub async fn with_model(
        settings: Settings,
        model: Arc<dyn CompletionModel>,
    ) -> anyhow::Result<Arc<Self>> {
        let metrics = MetricStore::new(&settings.paths).await?;
        let index = VectorIndex::new(&settings.paths).await?;

        if let Some(seed) = &settings.seed_path {
            if let Err(err) = metrics.seed_from_file(seed).await {
                tracing::warn!("Failed to seed metric store: {}", err);
            }
        }

        let sessions = SessionManager::new(
            model.clone(),
            metrics.clone(),
            index.clone(),
            settings.engine.clone(),
            settings.model.clone(),
            settings.default_company.clone(),
        );

        let follow_ups = FollowUpGenerator::new(
            model.clone(),
            settings.engine.clone(),
            settings.model.clone(),
        );

        Ok(Arc::new(AppState {
            settings,
            metrics,
            index,
            model,
            sessions,
            follow_ups,
            started_at: Utc::now(),
        }))
    }
}
