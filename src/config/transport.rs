use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{transport::DEFAULT_MAX_FRAME_SIZE, ListenMode, PayloadCodec};

/// Стратегия цикла приёма в конфигурации.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenStrategy {
    #[default]
    Blocking,
    Polling,
}

/// Параметры транспорта, общие для всех сокетов одного
/// [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Ёмкость очереди на одного получателя; при переполнении новые
    /// фреймы для этого получателя отбрасываются
    pub high_water_mark: usize,
    pub connect_timeout_ms: u64,
    /// Пауза между попытками в режиме опроса
    pub poll_interval_ms: u64,
    /// Максимальный размер темы или нагрузки одного фрейма, байт
    pub max_frame_size: usize,
    pub codec: PayloadCodec,
    pub listen_mode: ListenStrategy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            high_water_mark: 1000,
            connect_timeout_ms: 5000,
            poll_interval_ms: 10,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            codec: PayloadCodec::default(),
            listen_mode: ListenStrategy::default(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Режим приёма для [`RemoteSubscriber`](crate::RemoteSubscriber).
    pub fn listen_mode(&self) -> ListenMode {
        match self.listen_mode {
            ListenStrategy::Blocking => ListenMode::Blocking,
            ListenStrategy::Polling => ListenMode::Polling {
                interval: self.poll_interval(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.high_water_mark == 0 {
            return Err("transport.high_water_mark must be greater than zero".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("transport.poll_interval_ms must be greater than zero".into());
        }
        if self.max_frame_size == 0 || self.max_frame_size > u32::MAX as usize {
            return Err(format!(
                "transport.max_frame_size must be in 1..={}",
                u32::MAX
            ));
        }
        Ok(())
    }
}
