use std::{any::Any, io, time::Duration};

use thiserror::Error;

use crate::{ErrorExt, FrameError, StatusCode};

/// Ошибки транспортного уровня (сокеты pub/sub).
///
/// Ошибки создания сокета (`InvalidEndpoint`, `UnsupportedScheme`,
/// `AddressInUse`, `Bind`, `Connect`, `Timeout` при подключении) возникают
/// только в конструкторе. Во время приёма фатальными считаются
/// `ConnectionLost`, `Closed`, `Frame` и `Io`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("unsupported transport scheme '{scheme}' in endpoint '{endpoint}'")]
    UnsupportedScheme { endpoint: String, scheme: String },

    #[error("endpoint '{endpoint}' is already bound")]
    AddressInUse { endpoint: String },

    #[error("failed to bind '{endpoint}': {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to '{endpoint}': {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("operation on '{endpoint}' timed out after {}ms", .after.as_millis())]
    Timeout { endpoint: String, after: Duration },

    #[error("socket for '{endpoint}' is closed")]
    Closed { endpoint: String },

    #[error("connection to '{endpoint}' lost: {reason}")]
    ConnectionLost { endpoint: String, reason: String },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Ошибки неблокирующего приёма.
///
/// `Empty` — ожидаемое частое состояние цикла опроса, а не сбой.
#[derive(Debug, Error)]
pub enum TryRecvError {
    #[error("no message available")]
    Empty,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl TransportError {
    /// `true`, если ошибка возникла при создании сокета.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEndpoint { .. }
                | Self::UnsupportedScheme { .. }
                | Self::AddressInUse { .. }
                | Self::Bind { .. }
                | Self::Connect { .. }
        )
    }
}

impl TryRecvError {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl ErrorExt for TransportError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidEndpoint { .. } => StatusCode::InvalidEndpoint,
            Self::UnsupportedScheme { .. } => StatusCode::UnsupportedScheme,
            Self::AddressInUse { .. } => StatusCode::AlreadyExists,
            Self::Bind { .. } => StatusCode::BindFailed,
            Self::Connect { .. } => StatusCode::ConnectionFailed,
            Self::Timeout { .. } => StatusCode::Timeout,
            Self::Closed { .. } | Self::ConnectionLost { .. } => StatusCode::ConnectionClosed,
            Self::Frame(e) => e.status_code(),
            Self::Io(_) => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "transport".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::InvalidEndpoint { endpoint, .. }
            | Self::UnsupportedScheme { endpoint, .. }
            | Self::AddressInUse { endpoint }
            | Self::Bind { endpoint, .. }
            | Self::Connect { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::Closed { endpoint }
            | Self::ConnectionLost { endpoint, .. } => {
                tags.push(("endpoint", endpoint.clone()));
            }
            _ => {}
        }

        tags
    }
}

impl ErrorExt for TryRecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Empty => StatusCode::NotFound,
            Self::Transport(e) => e.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
