//! # Scaling Error Types Module
//!
//! This module defines the error types produced by remote scaling calls.
//! None of these cross the orchestrator boundary: the coordinator turns them
//! into a readable error field and falls back to original quantities.

/// Custom error types for remote scaling operations
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleError {
    /// The call was superseded by a newer request or the session ended
    Cancelled,
    /// Network or service errors
    Remote(String),
    /// Response could not be decoded or was incomplete
    MalformedResponse(String),
    /// Timeout errors
    Timeout(String),
    /// Circuit breaker is open, the service is not being called
    CircuitOpen(String),
}

impl ScaleError {
    /// Whether this error comes from cancellation rather than a real failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ScaleError::Cancelled)
    }

    /// Short message suitable for display next to the serving controls
    pub fn user_message(&self) -> String {
        match self {
            ScaleError::Cancelled => String::new(),
            ScaleError::Timeout(_) => {
                "Scaling took too long. Showing original quantities.".to_string()
            }
            ScaleError::CircuitOpen(_) => {
                "Scaling is temporarily unavailable. Showing original quantities.".to_string()
            }
            ScaleError::Remote(_) | ScaleError::MalformedResponse(_) => {
                "Could not scale ingredients. Showing original quantities.".to_string()
            }
        }
    }
}

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::Cancelled => write!(f, "Scaling request cancelled"),
            ScaleError::Remote(msg) => write!(f, "Remote scaling error: {msg}"),
            ScaleError::MalformedResponse(msg) => write!(f, "Malformed scaling response: {msg}"),
            ScaleError::Timeout(msg) => write!(f, "Timeout error: {msg}"),
            ScaleError::CircuitOpen(msg) => write!(f, "Circuit open: {msg}"),
        }
    }
}

impl std::error::Error for ScaleError {}

impl From<anyhow::Error> for ScaleError {
    fn from(err: anyhow::Error) -> Self {
        ScaleError::Remote(err.to_string())
    }
}

impl From<reqwest::Error> for ScaleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScaleError::Timeout(err.to_string())
        } else if err.is_decode() {
            ScaleError::MalformedResponse(err.to_string())
        } else {
            ScaleError::Remote(err.to_string())
        }
    }
}
