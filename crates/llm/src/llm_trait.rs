use async_trait::async_trait;
use recap_common::Result;

use crate::types::{GenerationRequest, GenerationResponse};

/// Text-generation backend used by the summarizer
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text for a single prompt
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;

    /// Generate text for every request concurrently
    ///
    /// Responses are aligned with `requests`. Fails as a whole if any single
    /// request fails.
    async fn generate_concurrently(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<GenerationResponse>>;

    /// Best-effort reachability probe; never fails
    async fn test_connection(&self) -> bool;

    /// Whether the configured model is installed on the backend
    async fn check_model_availability(&self) -> bool;

    /// Backend-reported metadata for the configured model
    async fn model_info(&self) -> Result<serde_json::Value>;
}
