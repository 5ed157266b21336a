pub mod config;
mod filters;
mod formatter;
pub mod handle;

pub use config::{ConsoleConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация глобального логирования.
///
/// Порядок применения: значения `config`, затем `TOPICAST_LOG_LEVEL` /
/// `TOPICAST_LOG_FORMAT`, затем `RUST_LOG` (если задан, заменяет фильтр
/// целиком). Вывод идёт в stdout через неблокирующий writer; возвращённый
/// handle нужно держать до завершения программы.
///
/// Повторная инициализация в том же процессе возвращает ошибку.
pub fn init_logging(
    mut config: LoggingConfig
) -> Result<LoggingHandle, Box<dyn std::error::Error + Send + Sync>> {
    config.apply_env_overrides();
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let layer = formatter::build_formatter_from_config(&config, writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = %config.format,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(Some(guard)))
}
