use async_trait::async_trait;
use recap_common::{RecapError, Result, SummarizerConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dispatch::fan_out;
use crate::llm_trait::GenerationBackend;
use crate::types::{
    GenerateOptions, GenerateRequest, GenerateResponse, GenerationRequest, GenerationResponse,
    ModelRequest, TagsResponse,
};

/// Timeout for tag listing and model introspection
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Model downloads can take a while
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

/// Upper bound on the delay between retries
const MAX_BACKOFF_SECS: u64 = 60;

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout: Duration,
    num_predict: i32,
    max_in_flight: usize,
    max_attempts: u32,
    client: Client,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = build_http_client(timeout)?;

        info!("Ollama client initialized: {} (model: {})", base_url, model);
        Ok(Self {
            base_url,
            model,
            timeout,
            num_predict: -1,
            max_in_flight: 3,
            max_attempts: 1,
            client,
        })
    }

    /// Create client from resolved configuration
    pub fn from_config(config: &SummarizerConfig) -> Result<Self> {
        Ok(Self::new(
            &config.ollama_base_url,
            &config.model_name,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_max_in_flight(config.max_concurrent_requests)
        .with_max_attempts(config.max_attempts)
        .with_num_predict(config.num_predict))
    }

    /// Cap on concurrent requests in `generate_concurrently`
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Attempts per request, including the first
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_num_predict(mut self, num_predict: i32) -> Self {
        self.num_predict = num_predict;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text for one request over the client's connection pool
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        self.generate_with_retry(&self.client, &request).await
    }

    /// Generate text for all requests concurrently
    ///
    /// The batch runs on its own HTTP session, opened here and dropped when
    /// the batch ends. At most `max_in_flight` requests are outstanding; the
    /// first failure aborts the batch and drops the rest.
    pub async fn generate_concurrently(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<GenerationResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let session = build_http_client(self.timeout)?;
        let session = &session;

        info!(
            "Dispatching {} generate requests (max in flight: {})",
            requests.len(),
            self.max_in_flight
        );

        fan_out(requests, self.max_in_flight, move |_, request| async move {
            self.generate_with_retry(session, &request).await
        })
        .await
    }

    /// Generate with retry and exponential backoff
    async fn generate_with_retry(
        &self,
        client: &Client,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            stream: false,
            system: request.system_prompt.clone(),
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: self.num_predict,
            },
        };

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            body.model,
            body.prompt.len()
        );

        let mut attempt = 1;
        loop {
            match self.try_generate(client, &url, &body).await {
                Ok(response) => {
                    debug!(
                        "Received response from Ollama - Model: {}, Length: {}",
                        response.model_name,
                        response.content.len()
                    );
                    return Ok(response);
                }
                Err(e) if attempt < self.max_attempts => {
                    let delay = Duration::from_secs(backoff_secs(attempt));
                    warn!(
                        "Ollama request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single attempt to generate text
    async fn try_generate(
        &self,
        client: &Client,
        url: &str,
        body: &GenerateRequest,
    ) -> Result<GenerationResponse> {
        let response = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RecapError::backend(format!(
                "Ollama API error: {} {}",
                status,
                detail.trim()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| self.request_error(e))?;
        let result: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RecapError::parse(format!("Failed to parse response: {}", e)))?;

        Ok(result.into_generation_response(&self.model))
    }

    fn request_error(&self, e: reqwest::Error) -> RecapError {
        if e.is_timeout() {
            RecapError::backend(format!("Request timed out after {:?}", self.timeout))
        } else {
            RecapError::backend(format!("Failed to communicate with Ollama: {}", e))
        }
    }

    /// Test connection to Ollama
    pub async fn test_connection(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama unreachable at {}: {}", self.base_url, e);
                false
            }
        }
    }

    /// List installed model names
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.request_error(e))?
            .error_for_status()
            .map_err(|e| RecapError::backend(format!("Ollama API error: {}", e)))?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| RecapError::parse(format!("Failed to parse model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check whether the configured model is installed
    ///
    /// Matches by prefix so `llama3` finds `llama3:latest`.
    pub async fn check_model_availability(&self) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|name| name.starts_with(&self.model)),
            Err(e) => {
                debug!("Could not list Ollama models: {}", e);
                false
            }
        }
    }

    /// Get backend metadata for the configured model
    pub async fn model_info(&self) -> Result<serde_json::Value> {
        let url = format!("{}/api/show", self.base_url);
        let body = ModelRequest {
            name: self.model.clone(),
            stream: None,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.request_error(e))?
            .error_for_status()
            .map_err(|e| RecapError::backend(format!("Could not get model info: {}", e)))?;

        response
            .json()
            .await
            .map_err(|e| RecapError::parse(format!("Failed to parse model info: {}", e)))
    }

    /// Pull the configured model onto the backend
    pub async fn pull_model(&self) -> bool {
        let url = format!("{}/api/pull", self.base_url);
        let body = ModelRequest {
            name: self.model.clone(),
            stream: Some(false),
        };

        info!("Pulling model {} from {}", self.model, self.base_url);
        match self.client.post(&url).json(&body).timeout(PULL_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Failed to pull model {}: {}", self.model, e);
                false
            }
        }
    }
}

/// Exponential backoff in seconds before retrying after `attempt`
fn backoff_secs(attempt: u32) -> u64 {
    2u64.saturating_pow(attempt.saturating_sub(1)).min(MAX_BACKOFF_SECS)
}

fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RecapError::backend(format!("Failed to create HTTP client: {}", e)))
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        self.generate(request).await
    }

    async fn generate_concurrently(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<GenerationResponse>> {
        self.generate_concurrently(requests).await
    }

    async fn test_connection(&self) -> bool {
        self.test_connection().await
    }

    async fn check_model_availability(&self) -> bool {
        self.check_model_availability().await
    }

    async fn model_info(&self) -> Result<serde_json::Value> {
        self.model_info().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(server.uri(), "llama3", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3", Duration::from_secs(30))
            .unwrap()
            .with_max_in_flight(0);
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "llama3");
        assert_eq!(client.max_in_flight, 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_secs(1), 1);
        assert_eq!(backoff_secs(2), 2);
        assert_eq!(backoff_secs(4), 8);
        assert_eq!(backoff_secs(7), MAX_BACKOFF_SECS);
        assert_eq!(backoff_secs(100), MAX_BACKOFF_SECS);
    }

    #[tokio::test]
    async fn test_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llama3",
                "prompt": "Summarize this",
                "stream": false,
                "system": "Be brief",
                "options": { "num_predict": -1 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3:latest",
                "response": "  A short summary.\n",
                "done": true,
                "total_duration": 5000,
                "eval_count": 12
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = GenerationRequest::new("Summarize this", 0.3).with_system_prompt("Be brief");
        let response = client_for(&server).generate(request).await.unwrap();

        assert_eq!(response.content, "  A short summary.\n");
        assert_eq!(response.trimmed(), "A short summary.");
        assert_eq!(response.model_name, "llama3:latest");
        assert_eq!(response.metrics.unwrap().eval_count, Some(12));
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate(GenerationRequest::new("p", 0.3))
            .await
            .unwrap_err();
        assert!(matches!(err, RecapError::Backend(_)));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_generate_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate(GenerationRequest::new("p", 0.3))
            .await
            .unwrap_err();
        assert!(matches!(err, RecapError::Parse(_)));
        assert!(err.is_backend());
    }

    #[tokio::test]
    async fn test_generate_missing_content_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .generate(GenerationRequest::new("p", 0.3))
            .await
            .unwrap();
        assert_eq!(response.content, "");
        assert_eq!(response.model_name, "llama3");
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), "llama3", Duration::from_millis(200)).unwrap();
        let err = client.generate(GenerationRequest::new("p", 0.3)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_generate_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server).with_max_attempts(2);
        assert!(client.generate(GenerationRequest::new("p", 0.3)).await.is_err());
    }

    #[tokio::test]
    async fn test_generate_concurrently_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains("first"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "one" }))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains("second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "two" })))
            .mount(&server)
            .await;

        let responses = client_for(&server)
            .generate_concurrently(vec![
                GenerationRequest::new("first", 0.3),
                GenerationRequest::new("second", 0.3),
            ])
            .await
            .unwrap();

        let contents: Vec<&str> = responses.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_generate_concurrently_fails_as_a_whole() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains("bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .generate_concurrently(vec![
                GenerationRequest::new("good", 0.3),
                GenerationRequest::new("bad", 0.3),
            ])
            .await;
        assert!(matches!(result, Err(RecapError::Backend(_))));
    }

    #[tokio::test]
    async fn test_connection_and_model_availability() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "llama3:latest" }, { "name": "nomic-embed-text:latest" }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.test_connection().await);
        assert!(client.check_model_availability().await);

        let other = OllamaClient::new(server.uri(), "mistral", Duration::from_secs(5)).unwrap();
        assert!(!other.check_model_availability().await);
    }

    #[tokio::test]
    async fn test_connection_unreachable() {
        // Nothing listens on the discard port
        let client = OllamaClient::new("http://127.0.0.1:9", "llama3", Duration::from_secs(1)).unwrap();
        assert!(!client.test_connection().await);
        assert!(!client.check_model_availability().await);
    }

    #[tokio::test]
    async fn test_model_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .and(body_partial_json(json!({ "name": "llama3" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "details": { "family": "llama", "parameter_size": "8B" }
            })))
            .mount(&server)
            .await;

        let info = client_for(&server).model_info().await.unwrap();
        assert_eq!(info["details"]["parameter_size"], "8B");
    }
}
