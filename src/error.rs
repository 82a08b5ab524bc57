use thiserror::Error;

/// Terminal outcomes a caller can observe for a submitted request
#[derive(Debug, Clone, Error)]
pub enum PacerError {
    #[error("{request} failed before a response arrived: {message}")]
    Transport { request: String, message: String },

    #[error("{request} returned a body that could not be decoded: {message}")]
    Decode { request: String, message: String },

    #[error("{request} failed: {status} {status_text} {body}")]
    Exhausted {
        request: String,
        status: u16,
        status_text: String,
        body: String,
        attempts: u32,
    },

    #[error("Scheduler is no longer running")]
    Closed,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl PacerError {
    /// HTTP status carried by the error, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            PacerError::Exhausted { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, PacerError::Exhausted { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, PacerError::Decode { .. })
    }
}

pub type PacerResult<T> = Result<T, PacerError>;
