use recap_common::{RecapError, Result, SummarizerConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::chunking::{chunk_text, Chunk};
use crate::client::OllamaClient;
use crate::health::{check_backend_health, HealthReport};
use crate::llm_trait::GenerationBackend;
use crate::prompts::{chunk_prompt, reduction_prompt, SUMMARY_SEPARATOR};
use crate::result::SummarizationResult;
use crate::types::GenerationRequest;

/// Where a summarization run currently stands
///
/// Stages consume one state and return the next. A stage handed a state it
/// does not act on returns it untouched, so `NoContent` and `Failed` flow
/// through to the end without further backend calls.
#[derive(Debug)]
enum WorkflowState<'a> {
    Pending(&'a str),
    NoContent,
    Chunked(Vec<Chunk>),
    ChunkSummarized {
        summaries: Vec<String>,
        chunks_processed: usize,
    },
    Reduced {
        summary: String,
        chunks_processed: usize,
    },
    Failed(String),
}

impl WorkflowState<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Pending(_) => "pending",
            Self::NoContent => "no-content",
            Self::Chunked(_) => "chunked",
            Self::ChunkSummarized { .. } => "chunk-summarized",
            Self::Reduced { .. } => "reduced",
            Self::Failed(_) => "failed",
        }
    }
}

/// Summarizer for long transcripts using map-reduce
///
/// Text is split into overlapping chunks, each chunk is summarized
/// concurrently, and the chunk summaries are merged in one final request.
/// A text that fits in a single chunk skips the map step: its raw text goes
/// straight to the final request, so it costs exactly one backend call.
pub struct Summarizer {
    backend: Arc<dyn GenerationBackend>,
    config: SummarizerConfig,
}

impl Summarizer {
    /// Create summarizer backed by Ollama
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        config.validate()?;
        let client = OllamaClient::from_config(&config)?;

        Ok(Self {
            backend: Arc::new(client),
            config,
        })
    }

    /// Create summarizer over any generation backend
    pub fn with_backend(backend: Arc<dyn GenerationBackend>, config: SummarizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize plain text
    ///
    /// Never fails: backend and chunking problems are reported through
    /// `SummarizationResult::error`.
    pub async fn summarize(&self, text: &str) -> SummarizationResult {
        let span = info_span!("summarize", run_id = %Uuid::new_v4());
        self.run(text).instrument(span).await
    }

    /// Summarize transcript text produced by an external parser
    pub async fn summarize_transcript(&self, transcript: &str) -> SummarizationResult {
        self.summarize(transcript).await
    }

    /// Check backend reachability and model availability
    pub async fn check_backend_health(&self) -> HealthReport {
        check_backend_health(self.backend.as_ref()).await
    }

    async fn run(&self, text: &str) -> SummarizationResult {
        let started = Instant::now();
        let original_length = text.chars().count();
        info!("Starting summarization - Text length: {} chars", original_length);

        let state = parse_input(text);
        let state = self.chunk(state);
        let state = self.summarize_chunks(state).await;
        let state = self.reduce(state).await;

        finish(state, original_length, started.elapsed())
    }

    fn chunk<'a>(&self, state: WorkflowState<'a>) -> WorkflowState<'a> {
        let WorkflowState::Pending(text) = state else {
            return state;
        };

        // Constructors validate the config, so errors here are unexpected
        match chunk_text(text, self.config.chunk_size, self.config.chunk_overlap) {
            Ok(chunks) if chunks.is_empty() => WorkflowState::Failed(format!(
                "chunking failed: {}",
                RecapError::chunking("no chunks produced from non-empty input")
            )),
            Ok(chunks) => {
                info!(
                    "Split text into {} chunks (size: {}, overlap: {})",
                    chunks.len(),
                    self.config.chunk_size,
                    self.config.chunk_overlap
                );
                WorkflowState::Chunked(chunks)
            }
            Err(e) => WorkflowState::Failed(format!("chunking failed: {}", e)),
        }
    }

    async fn summarize_chunks<'a>(&self, state: WorkflowState<'a>) -> WorkflowState<'a> {
        let WorkflowState::Chunked(chunks) = state else {
            return state;
        };

        if chunks.len() == 1 {
            debug!("Single chunk, sending raw text to the final summary");
            return WorkflowState::ChunkSummarized {
                summaries: chunks.into_iter().map(|chunk| chunk.content).collect(),
                chunks_processed: 1,
            };
        }

        let total = chunks.len();
        let requests = chunks
            .iter()
            .map(|chunk| {
                GenerationRequest::new(
                    chunk_prompt(&chunk.content, chunk.index, total),
                    self.config.temperature,
                )
            })
            .collect();

        let responses = match self.backend.generate_concurrently(requests).await {
            Ok(responses) => responses,
            Err(e) => {
                warn!("Chunk summarization failed: {}", e);
                return WorkflowState::Failed(format!("summarizing chunks failed: {}", e));
            }
        };

        if responses.len() != total {
            return WorkflowState::Failed(format!(
                "summarizing chunks failed: expected {} summaries, got {}",
                total,
                responses.len()
            ));
        }

        let summaries: Vec<String> = responses
            .iter()
            .map(|response| response.trimmed().to_string())
            .collect();

        info!(
            "Summarized {} chunks - Combined length: {} chars",
            total,
            summaries.iter().map(|s| s.chars().count()).sum::<usize>()
        );

        WorkflowState::ChunkSummarized {
            summaries,
            chunks_processed: total,
        }
    }

    async fn reduce<'a>(&self, state: WorkflowState<'a>) -> WorkflowState<'a> {
        let WorkflowState::ChunkSummarized {
            summaries,
            chunks_processed,
        } = state
        else {
            return state;
        };

        let combined = summaries.join(SUMMARY_SEPARATOR);
        let request = GenerationRequest::new(reduction_prompt(&combined), self.config.temperature);

        match self.backend.generate(request).await {
            Ok(response) => {
                let summary = response.trimmed();
                if summary.is_empty() {
                    warn!("Backend returned an empty final summary");
                    return WorkflowState::Failed(
                        "final summary failed: backend returned an empty summary".to_string(),
                    );
                }

                debug!("Final summary from {} - Length: {} chars", response.model_name, summary.chars().count());
                WorkflowState::Reduced {
                    summary: summary.to_string(),
                    chunks_processed,
                }
            }
            Err(e) => {
                warn!("Final summarization failed: {}", e);
                WorkflowState::Failed(format!("final summary failed: {}", e))
            }
        }
    }
}

fn parse_input(text: &str) -> WorkflowState<'_> {
    if text.trim().is_empty() {
        info!("Input is empty, nothing to summarize");
        WorkflowState::NoContent
    } else {
        WorkflowState::Pending(text)
    }
}

fn finish(state: WorkflowState<'_>, original_length: usize, elapsed: Duration) -> SummarizationResult {
    match state {
        WorkflowState::Reduced {
            summary,
            chunks_processed,
        } => {
            let result = SummarizationResult::completed(summary, original_length, chunks_processed, elapsed);
            info!(
                "Summarization complete - {} chunks, {} -> {} chars (ratio {:.2}) in {:.2}s",
                result.chunks_processed,
                result.original_length,
                result.summary_length,
                result.compression_ratio,
                result.processing_time_seconds
            );
            result
        }
        WorkflowState::NoContent => SummarizationResult::no_content(original_length, elapsed),
        WorkflowState::Failed(error) => SummarizationResult::failed(error, original_length, elapsed),
        other => SummarizationResult::failed(
            format!("workflow stopped in {} state", other.name()),
            original_length,
            elapsed,
        ),
    }
}
