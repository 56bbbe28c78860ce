//! Логирование: `tracing` + `tracing-subscriber`, консоль и файл.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{LogFormat, LoggingConfig};
pub use handle::LoggingHandle;

use framebus_error::{FrameBusResult, GenericError, ResultExt, StackError, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный подписчик по конфигурации.
///
/// Повторный вызов в том же процессе возвращает ошибку.
pub fn init_logging(mut config: LoggingConfig) -> FrameBusResult<LoggingHandle> {
    config.apply_env_overrides();
    config.validate().context("invalid logging configuration")?;
    config
        .ensure_log_dir()
        .context("cannot create log directory")?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if config.console_enabled {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = match sinks::file::layer_with_config(&config) {
        Some((layer, guard)) => {
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| {
            StackError::new(GenericError::new(StatusCode::Internal, e.to_string()))
                .context("global tracing subscriber already installed")
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = %config.format,
        console_enabled = config.console_enabled,
        file_enabled = config.file_enabled(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard, config.dir))
}
