pub mod announce;
pub mod config;
pub mod essay;
pub mod fallback;
pub mod generator;
pub mod geo;
pub mod latency;
pub mod model;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod queues;
pub mod session;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SkytaleError {
    #[error("Generation busy: {0}")]
    Busy(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("LLM error: {0}")]
    LlmFailed(String),

    #[error("TTS error: {0}")]
    TtsFailed(String),

    #[error("Rescue error: {0}")]
    RescueFailed(String),

    #[error("Audio error: {0}")]
    AudioError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for SkytaleError {
    fn from(e: std::io::Error) -> Self {
        SkytaleError::IoError(e.to_string())
    }
}

impl SkytaleError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The caller can queue instead or retry later
            SkytaleError::Busy(_) => true,
            // Bad identifier, nothing to retry
            SkytaleError::NotFound(_) => false,
            // Provider chain exhausted for this request only
            SkytaleError::LlmFailed(_) => true,
            SkytaleError::TtsFailed(_) => true,
            // Handled locally by keeping the original script
            SkytaleError::RescueFailed(_) => true,
            SkytaleError::AudioError(_) => true,
            // A broken template stays broken
            SkytaleError::RenderError(_) => false,
            // Store writes are best-effort
            SkytaleError::StoreError(_) => true,
            SkytaleError::ConfigError(_) => false,
            SkytaleError::ChannelError(_) => false,
            SkytaleError::Cancelled(_) => false,
            SkytaleError::IoError(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, SkytaleError>;
