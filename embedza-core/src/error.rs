use thiserror::Error;

/// Network-level failure: DNS, connection refused, timeouts, invalid URLs.
///
/// Some transports report HTTP status failures as errors rather than
/// responses, so a status code may be attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Cache backend failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cache error: {0}")]
pub struct StoreError(pub String);

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{message}")]
    HttpStatus { status: u16, message: String },

    #[error("Unrecognized content: {0}")]
    Content(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Stage {stage} failed: {message}")]
    Stage { stage: String, message: String },
}

impl EmbedError {
    /// HTTP status code associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            EmbedError::HttpStatus { status, .. } => Some(*status),
            EmbedError::Transport(e) => e.status,
            _ => None,
        }
    }
}
