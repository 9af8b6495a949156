/// Recap error types
#[derive(Debug, thiserror::Error)]
pub enum RecapError {
    /// Invalid settings (chunk size, overlap, temperature, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure while segmenting text into chunks
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Generation backend failure (network, timeout, non-success status)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Malformed backend response body
    #[error("Backend response parse error: {0}")]
    Parse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecapError {
    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create chunking error
    pub fn chunking<S: Into<String>>(msg: S) -> Self {
        Self::Chunking(msg.into())
    }

    /// Create backend error
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }

    /// Create response parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure came from the generation backend.
    ///
    /// Parse failures count: a body the backend sent that cannot be decoded
    /// is as much a backend fault as a refused connection.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Parse(_))
    }
}

// Process exit codes for the CLI
impl RecapError {
    /// Get process exit code
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::Backend(_) | Self::Parse(_) => 69,
            Self::Io(_) => 74,
            Self::Chunking(_) | Self::Internal(_) => 70,
        }
    }
}
