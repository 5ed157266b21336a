use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Ошибка, которую подписчик возвращает из `update`.
///
/// Содержит человекочитаемое сообщение и, опционально, исходную ошибку.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SubscriberError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl SubscriberError {
    /// Создаёт ошибку только с сообщением.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Создаёт ошибку с сообщением и исходной причиной.
    pub fn with_source<E>(
        message: impl Into<String>,
        source: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Оборачивает произвольную ошибку; сообщение берётся из её `Display`.
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ErrorExt for SubscriberError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SubscriberFailed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
