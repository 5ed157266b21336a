use std::{fmt, str::FromStr};

use crate::TransportError;

/// Адрес транспортного сокета.
///
/// Поддерживаемые схемы:
/// - `inproc://<name>` — внутри процесса, через общий [`Context`](super::Context);
/// - `tcp://<host>:<port>` — TCP; `*` в качестве хоста означает все
///   интерфейсы (только для `bind`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Inproc(String),
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> Result<Self, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = endpoint
            .split_once("://")
            .ok_or_else(|| invalid("expected '<scheme>://<address>'"))?;

        match scheme {
            "inproc" => {
                if rest.is_empty() {
                    return Err(invalid("in-process endpoint name is empty"));
                }
                Ok(Self::Inproc(rest.to_string()))
            }
            "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected '<host>:<port>'"))?;
                if host.is_empty() {
                    return Err(invalid("host is empty"));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid("port must be a number in 0..=65535"))?;
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            other => Err(TransportError::UnsupportedScheme {
                endpoint: endpoint.to_string(),
                scheme: other.to_string(),
            }),
        }
    }

    /// Адрес для `TcpListener::bind`.
    pub(crate) fn bind_addr(
        host: &str,
        port: u16,
    ) -> String {
        let host = if host == "*" { "0.0.0.0" } else { host };
        format!("{host}:{port}")
    }

    pub fn is_inproc(&self) -> bool {
        matches!(self, Self::Inproc(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Inproc(name) => write!(f, "inproc://{name}"),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
