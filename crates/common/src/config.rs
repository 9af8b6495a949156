use crate::error::RecapError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Summarizer configuration
///
/// Resolved once at startup and handed to the summarizer by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Generation model name
    pub model_name: String,

    /// Maximum chunk size in words
    pub chunk_size: usize,

    /// Words re-included from the end of the previous chunk
    pub chunk_overlap: usize,

    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum chunk-summary requests in flight at once
    pub max_concurrent_requests: usize,

    /// Attempts per backend request (1 = no retry)
    pub max_attempts: u32,

    /// Maximum tokens to generate (-1 = until the model stops)
    pub num_predict: i32,

    /// Log level
    pub log_level: String,

    /// Log directory (console only when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            model_name: "llama3".to_string(),
            chunk_size: 2000,
            chunk_overlap: 200,
            temperature: 0.3,
            request_timeout_secs: 300,
            max_concurrent_requests: 3,
            max_attempts: 1,
            num_predict: -1,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl SummarizerConfig {
    /// Load configuration from environment variables, after loading the
    /// given .env file (or one found from the working directory)
    ///
    /// Not validated here: callers apply their overrides first and then
    /// call [`validate`](Self::validate).
    pub fn from_env(env_file: Option<&Path>) -> Self {
        // Missing .env is fine
        let _ = match env_file {
            Some(path) => dotenv::from_path(path),
            None => dotenv::dotenv().map(|_| ()),
        };

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to
    /// defaults for missing or unparsable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            ollama_base_url: lookup("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            model_name: lookup("MODEL_NAME").unwrap_or(defaults.model_name),
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: parse_or(&lookup, "CHUNK_OVERLAP", defaults.chunk_overlap),
            temperature: parse_or(&lookup, "TEMPERATURE", defaults.temperature),
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT", defaults.request_timeout_secs),
            max_concurrent_requests: parse_or(
                &lookup,
                "MAX_CONCURRENT_REQUESTS",
                defaults.max_concurrent_requests,
            ),
            max_attempts: parse_or(&lookup, "MAX_ATTEMPTS", defaults.max_attempts),
            num_predict: parse_or(&lookup, "NUM_PREDICT", defaults.num_predict),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: lookup("LOG_DIR").map(PathBuf::from),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), RecapError> {
        if self.chunk_size == 0 {
            return Err(RecapError::config("Chunk size must be greater than 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(RecapError::config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RecapError::config(format!(
                "Temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(RecapError::config("Request timeout cannot be 0"));
        }

        if self.max_concurrent_requests == 0 {
            return Err(RecapError::config("Max concurrent requests cannot be 0"));
        }

        if self.max_attempts == 0 {
            return Err(RecapError::config("Max attempts cannot be 0"));
        }

        if self.model_name.trim().is_empty() {
            return Err(RecapError::config("Model name cannot be empty"));
        }

        // Validate Ollama URL
        if !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://") {
            return Err(RecapError::config(
                "Ollama base URL must start with http:// or https://"
            ));
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
