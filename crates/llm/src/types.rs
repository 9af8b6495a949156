use serde::{Deserialize, Serialize};

/// Backend-agnostic generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt text
    pub prompt: String,

    /// Temperature (0.0 - 1.0)
    pub temperature: f32,

    /// Optional system prompt
    pub system_prompt: Option<String>,
}

impl GenerationRequest {
    /// Create new request; temperature is clamped to [0, 1]
    pub fn new(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: temperature.clamp(0.0, 1.0),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Timing and token counters reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    /// Total time spent on the request (nanoseconds)
    pub total_duration: Option<u64>,

    /// Time spent loading the model (nanoseconds)
    pub load_duration: Option<u64>,

    /// Prompt tokens evaluated
    pub prompt_eval_count: Option<u64>,

    /// Tokens generated
    pub eval_count: Option<u64>,
}

impl GenerationMetrics {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Generated text plus what the backend reported about it
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    /// Generated text, untrimmed
    pub content: String,

    /// Model name declared by the backend
    pub model_name: String,

    pub metrics: Option<GenerationMetrics>,
}

impl GenerationResponse {
    pub fn new(content: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model_name: model_name.into(),
            metrics: None,
        }
    }

    /// Content with surrounding whitespace removed
    pub fn trimmed(&self) -> &str {
        self.content.trim()
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model name (e.g., "llama3", "mistral")
    pub model: String,

    /// Prompt text
    pub prompt: String,

    /// Always false: the client reads one JSON body per request
    pub stream: bool,

    /// System prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Generation options
    pub options: GenerateOptions,
}

/// Generation options
#[derive(Debug, Clone, Serialize, Default)]
pub struct GenerateOptions {
    /// Temperature (0.0 - 1.0)
    pub temperature: f32,

    /// Maximum tokens to generate (-1 = until the model stops)
    pub num_predict: i32,
}

/// Ollama generate response
///
/// Every field is optional on the wire; a body without `response`
/// decodes to empty content.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// Generated text
    #[serde(default)]
    pub response: String,

    /// Model name
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub total_duration: Option<u64>,

    #[serde(default)]
    pub load_duration: Option<u64>,

    #[serde(default)]
    pub prompt_eval_count: Option<u64>,

    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl GenerateResponse {
    /// Convert to the backend-agnostic response, falling back to the
    /// requested model when the backend does not name one
    pub fn into_generation_response(self, requested_model: &str) -> GenerationResponse {
        let metrics = GenerationMetrics {
            total_duration: self.total_duration,
            load_duration: self.load_duration,
            prompt_eval_count: self.prompt_eval_count,
            eval_count: self.eval_count,
        };

        GenerationResponse {
            content: self.response,
            model_name: self.model.unwrap_or_else(|| requested_model.to_string()),
            metrics: (!metrics.is_empty()).then_some(metrics),
        }
    }
}

/// Ollama `/api/tags` response
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}

/// Body for `/api/show` and `/api/pull`
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}
