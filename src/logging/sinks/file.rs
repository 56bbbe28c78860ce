use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling::daily};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{config::LoggingConfig, formatter};

/// Файловый слой с ежедневной ротацией. Возвращает `None`, если каталог
/// для логов не задан.
///
/// `WorkerGuard` нужно держать, пока идёт запись: при его уничтожении
/// буфер сбрасывается на диск.
pub fn layer_with_config<S>(
    config: &LoggingConfig
) -> Option<(Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let dir = config.dir.as_ref()?;
    let (writer, guard) = non_blocking(daily(dir, &config.file_name));
    let layer = formatter::build_formatter(config, config.format, false, writer);
    Some((layer, guard))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;
    use crate::logging::config::LogFormat;

    #[test]
    fn test_no_dir_no_layer() {
        assert!(layer_with_config::<Registry>(&LoggingConfig::default()).is_none());
    }

    /// Тест проверяет, что события попадают в файл после сброса буфера.
    #[test]
    fn test_events_written_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            dir: Some(tmp.path().to_path_buf()),
            file_name: "bus.log".to_string(),
            format: LogFormat::Json,
            ..Default::default()
        };

        let (layer, guard) = layer_with_config::<Registry>(&cfg).unwrap();
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(event = "ping", "file sink check");
        });
        drop(guard);

        let contents: String = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("bus.log"))
            .map(|entry| fs::read_to_string(entry.path()).unwrap())
            .collect();
        assert!(contents.contains("file sink check"));
        assert!(contents.contains("\"event\":\"ping\""));
    }
}
