use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use super::TransportConfig;
use crate::logging::LoggingConfig;

/// Имя необязательного файла конфигурации в рабочем каталоге
/// (`topicast.toml`, `topicast.yaml` и т.д.).
pub const CONFIG_FILE_STEM: &str = "topicast";
/// Префикс переменных окружения.
pub const ENV_PREFIX: &str = "TOPICAST";
/// Адрес публикации по умолчанию.
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:5556";

/// Настройки приложения.
///
/// Источники, в порядке приоритета (последний побеждает):
/// 1. значения по умолчанию;
/// 2. файл `topicast.*` в рабочем каталоге, если есть;
/// 3. явно указанный файл ([`Settings::load_from`]);
/// 4. переменные окружения `TOPICAST_<SECTION>__<KEY>`, например
///    `TOPICAST_TRANSPORT__HIGH_WATER_MARK=50`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Адрес, на котором демо-издатель публикует и к которому
    /// подключаются подписчики
    pub endpoint: String,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            transport: TransportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .add_source(File::with_name(CONFIG_FILE_STEM).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = cfg.try_deserialize()?;
        settings
            .transport
            .validate()
            .map_err(ConfigError::Message)?;
        Ok(settings)
    }
}
