use std::{env, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Переменная окружения, переопределяющая уровень логирования.
pub const LOG_LEVEL_ENV: &str = "TOPICAST_LOG_LEVEL";
/// Переменная окружения, переопределяющая формат вывода.
pub const LOG_FORMAT_ENV: &str = "TOPICAST_LOG_FORMAT";

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат строк лога.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Настройки консольного вывода.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень: trace, debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
    /// Дополнительные директивы `EnvFilter`, например
    /// `topicast::transport=debug`
    pub directives: Vec<String>,
    pub console: ConsoleConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            directives: Vec::new(),
            console: ConsoleConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Применяет `TOPICAST_LOG_LEVEL` и `TOPICAST_LOG_FORMAT`.
    ///
    /// Некорректный формат из окружения игнорируется с предупреждением в
    /// stderr: логирование ещё не инициализировано.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var(LOG_LEVEL_ENV) {
            self.level = level;
        }
        if let Ok(format) = env::var(LOG_FORMAT_ENV) {
            match format.parse() {
                Ok(format) => self.format = format,
                Err(e) => eprintln!("Ignoring {LOG_FORMAT_ENV}: {e}"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let level = self.level.to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "invalid log level '{}', expected one of {}",
                self.level,
                LEVELS.join(", ")
            ));
        }
        if let Some(empty) = self.directives.iter().position(|d| d.trim().is_empty()) {
            return Err(format!("log directive #{empty} is empty"));
        }
        Ok(())
    }

    /// Строка для `EnvFilter`: уровень, затем дополнительные директивы.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.to_ascii_lowercase())
            .chain(self.directives.iter().map(|d| d.trim().to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }
}
