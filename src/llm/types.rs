use crate::core::config::ModelSettings;

/// A single prompt-in/text-out completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_k: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
            top_k: None,
            stop: None,
        }
    }

    /// Apply the configured sampling defaults where the request leaves them
    /// unset.
    pub fn with_settings(mut self, settings: &ModelSettings) -> Self {
        self.temperature = self.temperature.or(Some(settings.temperature));
        self.max_tokens = self.max_tokens.or(Some(settings.max_tokens));
        self.top_k = self.top_k.or(Some(settings.top_k));
        self
    }
}
