use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки сериализации полезной нагрузки.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("failed to serialize payload as {codec}: {reason}")]
    Serialize { codec: &'static str, reason: String },

    #[error("failed to deserialize {codec} payload: {reason}")]
    Deserialize { codec: &'static str, reason: String },
}

impl ErrorExt for CodecError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Serialize { .. } => StatusCode::SerializationFailed,
            Self::Deserialize { .. } => StatusCode::DeserializationFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let codec = match self {
            Self::Serialize { codec, .. } | Self::Deserialize { codec, .. } => codec,
        };
        vec![
            ("error_type", "payload_codec".to_string()),
            ("status_code", self.status_code().to_string()),
            ("codec", codec.to_string()),
        ]
    }
}
