use std::{env, fmt, path::PathBuf, str::FromStr};

use framebus_error::{ensure, FrameBusResult, StatusCode};
use serde::{Deserialize, Serialize};

/// Формат вывода логов.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        };
        f.write_str(s)
    }
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень или полная директива `EnvFilter` ("debug",
    /// "framebus=trace,warn")
    pub level: String,
    pub format: LogFormat,
    /// Цветной вывод в консоль
    pub ansi: bool,
    pub console_enabled: bool,
    /// Каталог для файла логов. `None` означает без файла.
    pub dir: Option<PathBuf>,
    /// Имя файла; к нему добавляется дата ротации
    pub file_name: String,
    pub with_target: bool,
    pub with_line_numbers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            ansi: true,
            console_enabled: true,
            dir: None,
            file_name: "framebus.log".to_string(),
            with_target: true,
            with_line_numbers: false,
        }
    }
}

impl LoggingConfig {
    /// Переопределения из окружения: `FRAMEBUS_LOG_LEVEL`,
    /// `FRAMEBUS_LOG_FORMAT`, `FRAMEBUS_LOG_DIR`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("FRAMEBUS_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("FRAMEBUS_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.format = format,
                // Подписчик ещё не установлен, tracing здесь бесполезен.
                Err(e) => eprintln!("Ignoring FRAMEBUS_LOG_FORMAT: {e}"),
            }
        }
        if let Ok(dir) = env::var("FRAMEBUS_LOG_DIR") {
            self.dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> FrameBusResult<()> {
        ensure!(
            !self.level.trim().is_empty(),
            StatusCode::InvalidConfig,
            "log level must not be empty"
        );
        ensure!(
            self.dir.is_none() || !self.file_name.is_empty(),
            StatusCode::InvalidConfig,
            "log file name must not be empty when a log directory is set"
        );
        Ok(())
    }

    /// Создаёт каталог для файла логов, если он задан.
    pub fn ensure_log_dir(&self) -> FrameBusResult<()> {
        if let Some(dir) = &self.dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn file_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn build_filter_directive(&self) -> String {
        self.level.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("FRAMEBUS_LOG_LEVEL", "debug");
        env::set_var("FRAMEBUS_LOG_FORMAT", "json");
        env::set_var("FRAMEBUS_LOG_DIR", "/tmp/framebus-logs");

        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();

        env::remove_var("FRAMEBUS_LOG_LEVEL");
        env::remove_var("FRAMEBUS_LOG_FORMAT");
        env::remove_var("FRAMEBUS_LOG_DIR");

        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.dir, Some(PathBuf::from("/tmp/framebus-logs")));
        assert!(cfg.file_enabled());
    }

    /// Тест проверяет, что неизвестный формат из окружения игнорируется.
    #[test]
    #[serial]
    fn test_bad_format_override_ignored() {
        env::set_var("FRAMEBUS_LOG_FORMAT", "yaml");
        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();
        env::remove_var("FRAMEBUS_LOG_FORMAT");

        assert_eq!(cfg.format, LogFormat::Compact);
    }

    #[test]
    fn test_validate() {
        assert!(LoggingConfig::default().validate().is_ok());

        let cfg = LoggingConfig {
            level: "  ".to_string(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);

        let cfg = LoggingConfig {
            dir: Some(PathBuf::from("logs")),
            file_name: String::new(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_ensure_log_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = LoggingConfig {
            dir: Some(tmp.path().join("nested").join("logs")),
            ..Default::default()
        };
        cfg.ensure_log_dir().unwrap();
        assert!(tmp.path().join("nested/logs").is_dir());
    }
}
