//! Recap LLM integration
//!
//! Chunking, prompt construction, the Ollama client and the map-reduce
//! transcript summarizer

mod chunking;
mod client;
mod dispatch;
mod health;
mod llm_trait;
mod prompts;
mod result;
mod summarize;
mod types;

#[cfg(test)]
mod testing;

pub use chunking::{chunk_text, Chunk};
pub use client::OllamaClient;
pub use dispatch::fan_out;
pub use health::{check_backend_health, HealthReport};
pub use llm_trait::GenerationBackend;
pub use prompts::{chunk_prompt, reduction_prompt, BASE_PROMPT, SUMMARY_SEPARATOR};
pub use result::{compression_ratio, SummarizationResult, NO_CONTENT_MESSAGE};
pub use summarize::Summarizer;
pub use types::{
    GenerateOptions, GenerateRequest, GenerateResponse, GenerationMetrics, GenerationRequest,
    GenerationResponse,
};
