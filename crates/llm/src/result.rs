use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary reported for empty or whitespace-only input
pub const NO_CONTENT_MESSAGE: &str = "No content to summarize.";

/// Outcome of one summarization call
///
/// Either `summary` is set and `error` is `None`, or `error` is set and
/// `summary` is empty. Lengths are counted in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizationResult {
    /// Final summary text
    pub summary: String,

    pub original_length: usize,

    pub summary_length: usize,

    /// Chunks that went through summarization
    pub chunks_processed: usize,

    /// Wall time since the call started
    pub processing_time_seconds: f64,

    /// `original_length / summary_length`, or 0.0 without a summary
    pub compression_ratio: f64,

    pub error: Option<String>,
}

impl SummarizationResult {
    /// Successful summarization
    pub fn completed(
        summary: String,
        original_length: usize,
        chunks_processed: usize,
        elapsed: Duration,
    ) -> Self {
        let summary_length = summary.chars().count();

        Self {
            summary,
            original_length,
            summary_length,
            chunks_processed,
            processing_time_seconds: elapsed.as_secs_f64(),
            compression_ratio: compression_ratio(original_length, summary_length),
            error: None,
        }
    }

    /// Input had nothing to summarize; not a failure
    pub fn no_content(original_length: usize, elapsed: Duration) -> Self {
        Self {
            summary: NO_CONTENT_MESSAGE.to_string(),
            original_length,
            summary_length: 0,
            chunks_processed: 0,
            processing_time_seconds: elapsed.as_secs_f64(),
            compression_ratio: 0.0,
            error: None,
        }
    }

    /// Failed summarization carrying the stage error
    pub fn failed(error: impl Into<String>, original_length: usize, elapsed: Duration) -> Self {
        Self {
            summary: String::new(),
            original_length,
            summary_length: 0,
            chunks_processed: 0,
            processing_time_seconds: elapsed.as_secs_f64(),
            compression_ratio: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Ratio of original to summary length; 0.0 for an empty summary
pub fn compression_ratio(original_length: usize, summary_length: usize) -> f64 {
    if summary_length == 0 {
        0.0
    } else {
        original_length as f64 / summary_length as f64
    }
}
