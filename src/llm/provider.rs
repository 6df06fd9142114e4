use async_trait::async_trait;

use super::types::CompletionRequest;
use crate::core::errors::ApiError;

/// Stateless interface to a hosted generative model.
///
/// Implementations wrap one remote API. Callers own retry policy and
/// deadlines; a provider performs exactly one upstream call per invocation.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Provider name (e.g. "together").
    fn name(&self) -> &str;

    /// Check whether the provider is reachable.
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// Text completion for a fully assembled prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ApiError>;

    /// Embed the given inputs with the provider's embedding model.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
