//! In-process backend for exercising the summarizer without a server

use async_trait::async_trait;
use recap_common::{RecapError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::dispatch::fan_out;
use crate::llm_trait::GenerationBackend;
use crate::types::{GenerationRequest, GenerationResponse};

/// Backend whose replies and failures are fixed up front
///
/// Chunk requests are answered with `"  summary N  "` (1-based, padded to
/// exercise trimming).
pub struct ScriptedBackend {
    pub final_reply: String,
    pub fail_chunk: Option<usize>,
    pub fail_final: bool,
    /// Later chunks answer sooner
    pub reverse_latency: bool,
    pub max_in_flight: usize,
    pub connected: bool,
    pub model_available: bool,
    pub model_info: Option<serde_json::Value>,

    pub generate_calls: AtomicUsize,
    pub chunk_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            final_reply: "  The final summary.  ".to_string(),
            fail_chunk: None,
            fail_final: false,
            reverse_latency: false,
            max_in_flight: 8,
            connected: true,
            model_available: true,
            model_info: None,
            generate_calls: AtomicUsize::new(0),
            chunk_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedBackend {
    /// Every backend round trip, chunk or final
    pub fn total_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst) + self.chunk_calls.load(Ordering::SeqCst)
    }

    /// Prompts sent through `generate`, in call order
    pub fn final_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    async fn answer_chunk(&self, index: usize, total: usize) -> Result<GenerationResponse> {
        self.chunk_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = if self.reverse_latency {
            Duration::from_millis(15 * (total - index) as u64)
        } else {
            Duration::from_millis(10)
        };
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_chunk == Some(index) {
            return Err(RecapError::backend("connection refused"));
        }
        Ok(GenerationResponse::new(format!("  summary {}  ", index + 1), "scripted"))
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt);

        if self.fail_final {
            return Err(RecapError::backend("Ollama API error: 500 Internal Server Error"));
        }
        Ok(GenerationResponse::new(self.final_reply.clone(), "scripted"))
    }

    async fn generate_concurrently(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<GenerationResponse>> {
        let total = requests.len();
        fan_out(requests, self.max_in_flight, move |index, _| self.answer_chunk(index, total)).await
    }

    async fn test_connection(&self) -> bool {
        self.connected
    }

    async fn check_model_availability(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.model_available
    }

    async fn model_info(&self) -> Result<serde_json::Value> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.model_info
            .clone()
            .ok_or_else(|| RecapError::backend("Could not get model info: 404 Not Found"))
    }
}
