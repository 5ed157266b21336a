use std::any::Any;

use thiserror::Error;

use crate::{CodecError, ErrorExt, StatusCode, SubscriberError, TransportError};

/// Ошибки вызова `notify`.
///
/// Отказ подписчика не перехватывается: первый упавший подписчик прерывает
/// рассылку, а его ошибка возвращается вызывающему `notify`.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("subscriber '{subscriber}' failed on topic '{topic}': {source}")]
    Subscriber {
        subscriber: String,
        topic: String,
        #[source]
        source: SubscriberError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ErrorExt for NotifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Subscriber { .. } => StatusCode::SubscriberFailed,
            Self::Codec(e) => e.status_code(),
            Self::Transport(e) => e.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Subscriber {
                subscriber, topic, ..
            } => vec![
                ("error_type", "notify".to_string()),
                ("status_code", self.status_code().to_string()),
                ("subscriber", subscriber.clone()),
                ("topic", topic.clone()),
            ],
            Self::Codec(e) => e.metrics_tags(),
            Self::Transport(e) => e.metrics_tags(),
        }
    }
}
