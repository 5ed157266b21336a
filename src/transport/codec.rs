use std::fmt;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::CodecError;

/// Формат сериализации полезной нагрузки фрейма.
///
/// По умолчанию используется JSON; MessagePack компактнее и удобен, когда
/// обе стороны написаны на Rust.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadCodec {
    #[default]
    Json,
    #[serde(alias = "msgpack")]
    MessagePack,
}

impl PayloadCodec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MessagePack => "messagepack",
        }
    }

    pub fn encode<P>(
        &self,
        payload: &P,
    ) -> Result<Bytes, CodecError>
    where
        P: Serialize + ?Sized,
    {
        let encoded = match self {
            Self::Json => serde_json::to_vec(payload).map_err(|e| e.to_string()),
            Self::MessagePack => rmp_serde::to_vec_named(payload).map_err(|e| e.to_string()),
        };
        encoded.map(Bytes::from).map_err(|reason| CodecError::Serialize {
            codec: self.name(),
            reason,
        })
    }

    pub fn decode<P>(
        &self,
        bytes: &[u8],
    ) -> Result<P, CodecError>
    where
        P: DeserializeOwned,
    {
        let decoded = match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Self::MessagePack => rmp_serde::from_slice(bytes).map_err(|e| e.to_string()),
        };
        decoded.map_err(|reason| CodecError::Deserialize {
            codec: self.name(),
            reason,
        })
    }
}

impl fmt::Display for PayloadCodec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}
