use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки разбора транспортного фрейма `[topic, payload]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame part too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("frame truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("topic is not valid UTF-8: {0}")]
    InvalidTopic(String),
}

impl ErrorExt for FrameError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::SizeLimit,
            Self::Truncated { .. } => StatusCode::UnexpectedEof,
            Self::InvalidTopic(_) => StatusCode::InvalidUtf8,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_codes() {
        let err = FrameError::TooLarge { size: 10, max: 4 };
        assert_eq!(err.status_code(), StatusCode::SizeLimit);
        assert_eq!(err.to_string(), "frame part too large: 10 bytes (max 4)");
        assert_eq!(
            FrameError::Truncated { expected: 8, got: 3 }.status_code(),
            StatusCode::UnexpectedEof
        );
    }
}
