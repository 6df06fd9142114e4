//! ESG report assembly.
//!
//! Pure composition over the metric store and the embedding index: a fixed
//! three-pillar table of subcategories, one lookup per cell.

use serde_json::{json, Map, Value};

use crate::core::errors::ApiError;
use crate::llm::CompletionModel;
use crate::store::{MetricStore, Topic, VectorIndex};

/// The fixed report layout: pillar, topic code, (subcategory, tag phrase).
pub const REPORT_SECTIONS: &[(&str, Topic, &[(&str, &str)])] = &[
    (
        "Environmental",
        Topic::Environmental,
        &[
            ("Energy Efficiency", "efficiency"),
            ("Renewable Energy", "renewable"),
            ("Carbon Emissions", "emissions"),
            ("Waste Management", "waste"),
            ("Water Management", "water"),
        ],
    ),
    (
        "Social",
        Topic::Social,
        &[
            ("Diversity", "diversity"),
            ("Inclusion", "inclusion"),
            ("Gender Diversity", "gender"),
            ("Education", "education"),
        ],
    ),
    (
        "Governance",
        Topic::Governance,
        &[("Compliance", "compliance"), ("Supply Chain", "supply")],
    ),
];

/// Build the full report for one company: every subcategory cell holds the
/// 0-2 shortest matching facts.
pub async fn company_report(store: &MetricStore, company: &str) -> Result<Value, ApiError> {
    let mut report = Map::new();

    for (pillar, topic, cells) in REPORT_SECTIONS {
        let mut section = Map::new();
        for (subcategory, phrase) in *cells {
            let facts = store.get_metrics(company, *topic, phrase).await?;
            section.insert(subcategory.to_string(), json!(facts));
        }
        report.insert(pillar.to_string(), Value::Object(section));
    }

    Ok(Value::Object(report))
}

/// Rebuild a client-provided report against a second company.
///
/// Each leaf item is replaced by the nearest indexed fact from
/// `comparison_company`, matched on the item's description within the same
/// pillar. Leaves with no indexed counterpart are dropped rather than
/// failing the report.
pub async fn comparison_report(
    model: &dyn CompletionModel,
    index: &VectorIndex,
    comparison_company: &str,
    company_data: &Value,
) -> Result<Value, ApiError> {
    let mut result = Map::new();

    let Some(categories) = company_data.get("data").and_then(|v| v.as_object()) else {
        return Ok(Value::Object(result));
    };

    for (category, subcategories) in categories {
        let Some(topic) = Topic::parse(category) else {
            tracing::warn!("Skipping unknown report category '{}'", category);
            continue;
        };

        let mut section = Map::new();
        let Some(subcategories) = subcategories.as_object() else {
            continue;
        };

        for (subcategory, items) in subcategories {
            let mut matched = Vec::new();
            let Some(items) = items.as_array() else {
                section.insert(subcategory.clone(), json!(matched));
                continue;
            };

            for item in items {
                let Some(description) = item.get("description").and_then(|v| v.as_str()) else {
                    continue;
                };

                let embedding = model
                    .embed(&[description.to_string()])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| ApiError::Parse("embedding response was empty".into()))?;

                match index.closest_fact(comparison_company, topic, &embedding).await {
                    Ok(fact) => matched.push(json!(fact)),
                    Err(ApiError::NotFound(_)) => {
                        tracing::debug!(
                            "No comparison fact for '{}' in {} / {}",
                            description,
                            comparison_company,
                            category
                        );
                    }
                    Err(err) => return Err(err),
                }
            }

            section.insert(subcategory.clone(), json!(matched));
        }

        result.insert(category.clone(), Value::Object(section));
    }

    Ok(Value::Object(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionRequest;
    use crate::store::{IndexedFact, MetricRecord};
    use async_trait::async_trait;

    struct KeywordEmbedder;

    #[async_trait]
    impl CompletionModel for KeywordEmbedder {
        fn name(&self) -> &str {
            "stub"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<String, ApiError> {
            Err(ApiError::Upstream("stub has no completion backend".into()))
        }

        // Axis per keyword, so cosine ranking is exact in tests.
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs
                .iter()
                .map(|text| {
                    let text = text.to_lowercase();
                    vec![
                        text.contains("renewable") as u8 as f32,
                        text.contains("emission") as u8 as f32,
                        text.contains("diversity") as u8 as f32,
                    ]
                })
                .collect())
        }
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
    async fn report_contains_all_eleven_subcategories() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricStore::with_path(dir.path().join("metrics.db"))
            .await
            .unwrap();

        store
            .insert_batch(&[
                record("Acme", Topic::Environmental, "renewable energy", "86%", "renewable share"),
                record("Acme", Topic::Environmental, "renewable target", "100%", "goal by 2030"),
                record("Acme", Topic::Environmental, "renewable capacity", "1.2 GW", "installed solar and wind capacity"),
                record("Acme", Topic::Social, "gender balance", "44%", "women in workforce"),
                record("Acme", Topic::Governance, "compliance training", "97%", "completion"),
            ])
            .await
            .unwrap();

        let report = company_report(&store, "Acme").await.unwrap();

        let mut cells = 0;
        for (pillar, _, expected) in REPORT_SECTIONS {
            let section = report.get(*pillar).and_then(|v| v.as_object()).unwrap();
            for (subcategory, _) in *expected {
                let items = section.get(*subcategory).and_then(|v| v.as_array()).unwrap();
                assert!(items.len() <= 2, "{}: {} items", subcategory, items.len());
                cells += 1;
            }
        }
        assert_eq!(cells, 11);

        // Three renewable records exist but the cell is capped at two.
        let renewables = report["Environmental"]["Renewable Energy"].as_array().unwrap();
        assert_eq!(renewables.len(), 2);
    }

    #[tokio::test]
    async fn comparison_replaces_leaves_and_drops_unmatched() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::with_path(dir.path().join("index.db"))
            .await
            .unwrap();
        let model = KeywordEmbedder;

        index
            .insert_batch(&[
                (
                    IndexedFact {
                        company: "Rival".to_string(),
                        topic: Topic::Environmental,
                        is_metric: true,
                        value: "52%".to_string(),
                        description: "renewable electricity".to_string(),
                    },
                    vec![1.0, 0.0, 0.0],
                ),
                (
                    IndexedFact {
                        company: "Rival".to_string(),
                        topic: Topic::Environmental,
                        is_metric: true,
                        value: "30 kt".to_string(),
                        description: "scope 1 emissions".to_string(),
                    },
                    vec![0.0, 1.0, 0.0],
                ),
            ])
            .await
            .unwrap();

        let company_data = serde_json::json!({
            "data": {
                "Environmental": {
                    "Renewable Energy": [
                        {"value": "86%", "description": "renewable energy share"}
                    ],
                    "Carbon Emissions": [
                        {"value": "12 kt", "description": "total emissions"}
                    ]
                },
                "Social": {
                    "Diversity": [
                        {"value": "44%", "description": "workforce diversity"}
                    ]
                }
            }
        });

        let result = comparison_report(&model, &index, "Rival", &company_data)
            .await
            .unwrap();

        let renewable = result["Environmental"]["Renewable Energy"].as_array().unwrap();
        assert_eq!(renewable.len(), 1);
        assert_eq!(renewable[0]["value"], "52%");

        let emissions = result["Environmental"]["Carbon Emissions"].as_array().unwrap();
        assert_eq!(emissions[0]["value"], "30 kt");

        // Rival has nothing indexed under Social, so the leaf is dropped.
        let diversity = result["Social"]["Diversity"].as_array().unwrap();
        assert!(diversity.is_empty());
    }

    #[tokio::test]
    async fn missing_company_data_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::with_path(dir.path().join("index.db"))
            .await
            .unwrap();

        let result = comparison_report(&KeywordEmbedder, &index, "Rival", &json!({}))
            .await
            .unwrap();
        assert_eq!(result, json!({}));
    }
}
