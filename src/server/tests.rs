#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::extract::State;
    use axum::response::IntoResponse;
    use axum::Json;
    use serde_json::Value;

    use crate::core::config::{AppPaths, EngineSettings, ModelSettings, Settings};
    use crate::core::errors::ApiError;
    use crate::llm::{CompletionModel, CompletionRequest};
    use crate::server::handlers::{chat, reports};
    use crate::state::AppState;
    use crate::store::{MetricRecord, Topic};

    struct CannedModel;

    #[async_trait]
    impl CompletionModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, ApiError> {
            if request.prompt.contains("follow up questions") {
                Ok(r#"["How can we push renewables past 86%?", "Where is waste reduction lagging?"]"#
                    .to_string())
            } else {
                Ok("Renewable share stands at 86%.".to_string())
            }
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn test_settings(dir: &Path) -> Settings {
        Settings {
            port: 0,
            paths: AppPaths {
                data_dir: dir.to_path_buf(),
                log_dir: dir.join("logs"),
                db_path: dir.join("core.db"),
            },
            model: ModelSettings::default(),
            engine: EngineSettings {
                max_attempts: 1,
                backoff_base: Duration::ZERO,
                deadline: Duration::from_secs(5),
                history_limit: 20,
            },
            default_company: "NVIDIA Corporation".to_string(),
            seed_path: None,
            allowed_origins: Vec::new(),
        }
    }

    async fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::with_model(test_settings(dir.path()), Arc::new(CannedModel))
            .await
            .unwrap();
        (dir, state)
    }

    async fn body_json(response: impl IntoResponse) -> Value {
        let response = response.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn record(company: &str, topic: Topic, tags: &str, value: &str, description: &str) -> MetricRecord {
        MetricRecord {
            company: company.to_string(),
            topic,
            tags: tags.to_string(),
            is_metric: true,
            value: value.to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn chat_rejects_missing_prompt() {
        let (_dir, state) = test_state().await;

        let err = chat::chat(
            State(state),
            Json(chat::ChatRequestBody {
                prompt: None,
                session: None,
            }),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn chat_returns_model_reply() {
        let (_dir, state) = test_state().await;

        let response = chat::chat(
            State(state),
            Json(chat::ChatRequestBody {
                prompt: Some("What is our renewable share?".to_string()),
                session: None,
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["response"], "Renewable share stands at 86%.");
    }

    #[tokio::test]
    async fn reset_requires_company_and_switches_it() {
        let (_dir, state) = test_state().await;

        let err = chat::reset(
            State(state.clone()),
            Json(chat::ResetRequestBody {
                company: None,
                session: None,
            }),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let response = chat::reset(
            State(state.clone()),
            Json(chat::ResetRequestBody {
                company: Some("Acme".to_string()),
                session: None,
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["message"], "Conversation history reset");
        assert_eq!(state.sessions.active_company("default").await, "Acme");
    }

    #[tokio::test]
    async fn compare_excludes_the_active_company() {
        let (_dir, state) = test_state().await;

        state
            .metrics
            .insert_batch(&[
                record("NVIDIA Corporation", Topic::Environmental, "water", "3 ML", "withdrawal"),
                record("Acme", Topic::Environmental, "water", "5 ML", "withdrawal"),
                record("Zeta Corp", Topic::Social, "education", "12h", "training"),
            ])
            .await
            .unwrap();

        let response = reports::compare(State(state), None).await.unwrap();
        let body = body_json(response).await;

        let companies: Vec<&str> = body["companies"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(companies, vec!["Acme", "Zeta Corp"]);
    }

    #[tokio::test]
    async fn company_info_has_metadata_and_full_report() {
        let (_dir, state) = test_state().await;

        state
            .metrics
            .insert_batch(&[
                record("Acme", Topic::Environmental, "renewable", "86%", "renewable share"),
                record("Acme", Topic::Social, "diversity", "44%", "workforce diversity"),
                record("Acme", Topic::Governance, "compliance", "97%", "training completion"),
            ])
            .await
            .unwrap();

        let response = reports::company_info(
            State(state),
            Json(reports::CompanyInfoBody {
                company: Some("Acme".to_string()),
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["metadata"]["companyName"], "Acme");
        assert_eq!(body["metadata"]["stockExchange"], "NASDAQ");

        let data = body["data"].as_object().unwrap();
        let subcategories: usize = data
            .values()
            .map(|section| section.as_object().unwrap().len())
            .sum();
        assert_eq!(subcategories, 11);

        let renewable = body["data"]["Environmental"]["Renewable Energy"]
            .as_array()
            .unwrap();
        assert_eq!(renewable.len(), 1);
    }

    #[tokio::test]
    async fn comparison_without_company_data_is_empty() {
        let (_dir, state) = test_state().await;

        let response = reports::comparison_company_info(
            State(state),
            Json(reports::ComparisonBody {
                comparison_company: Some("Acme".to_string()),
                company_data: None,
            }),
        )
        .await
        .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["metadata"]["companyName"], "Acme");
        assert_eq!(body["data"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn follow_up_questions_returns_a_pair() {
        let (_dir, state) = test_state().await;

        let response = chat::follow_up_questions(State(state), None).await.unwrap();
        let body = body_json(response).await;

        let questions = body["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 2);
    }
}
