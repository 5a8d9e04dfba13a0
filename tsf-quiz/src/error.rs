//! Error types for tsf-quiz

use thiserror::Error;

use crate::session::QuizPhase;

/// Quiz client errors
#[derive(Debug, Error)]
pub enum QuizError {
    /// Operation not allowed in the session's current phase
    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: QuizPhase,
    },

    /// Request never produced a response (connect, timeout, reset)
    #[error("Network error: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Guest result cache could not be read or written
    #[error("Guest cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuizError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            QuizError::Transport(_) => true,
            QuizError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type QuizResult<T> = Result<T, QuizError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(QuizError::Transport("timeout".into()).is_retryable());
        assert!(QuizError::Status {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!QuizError::Status {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!QuizError::InvalidTransition {
            action: "answer",
            phase: QuizPhase::AwaitingLevel1
        }
        .is_retryable());
    }
}
