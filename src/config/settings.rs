use std::path::Path;

use ::config::{Config, ConfigError, Environment, File};
use framebus_error::{ensure, FrameBusResult, GenericError, ResultExt, StackError, StatusCode};
use serde::Deserialize;

use crate::{agent::AgentConfig, bus::BusConfig, logging::LoggingConfig, transport::WILDCARD_ORIGIN};

/// Файл настроек, который ищется в текущем каталоге.
pub const DEFAULT_CONFIG_FILE: &str = "framebus.toml";

/// Префикс переменных окружения: `FRAMEBUS_BUS__TARGET_ORIGIN` и т.п.
pub const ENV_PREFIX: &str = "FRAMEBUS";

/// Настройки контекста, в котором работает Agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentSettings {
    /// Origin страницы
    pub origin: String,
    pub target_origin: String,
}

impl AgentSettings {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            target_origin: self.target_origin.clone(),
        }
    }
}

/// Параметры демонстрационного сценария.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DemoSettings {
    /// Сколько фреймов встроить в страницу
    pub frames: usize,
    pub event: String,
    /// Сколько публикаций сделать
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bus: BusConfig,
    pub agent: AgentSettings,
    pub logging: LoggingConfig,
    pub demo: DemoSettings,
}

fn config_error(err: ConfigError) -> StackError {
    StackError::new(GenericError::new(StatusCode::InvalidConfig, err.to_string()))
}

impl Settings {
    /// Загружает настройки из `framebus.toml` (если есть) и окружения.
    pub fn load() -> FrameBusResult<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// То же, что [`Settings::load`], но с явным путём к файлу. Отсутствие
    /// файла не ошибка.
    pub fn load_from(path: &Path) -> FrameBusResult<Self> {
        let cfg = Self::builder(path)
            .map_err(config_error)
            .context("cannot assemble configuration sources")?;

        let settings: Settings = cfg
            .try_deserialize()
            .map_err(config_error)
            .with_context(|| format!("cannot parse configuration from {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    fn builder(path: &Path) -> Result<Config, ConfigError> {
        Config::builder()
            // Значения по умолчанию
            .set_default("bus.target_origin", WILDCARD_ORIGIN)?
            .set_default("agent.origin", "https://host.local")?
            .set_default("agent.target_origin", WILDCARD_ORIGIN)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "compact")?
            .set_default("logging.ansi", true)?
            .set_default("demo.frames", 2)?
            .set_default("demo.event", "ping")?
            .set_default("demo.count", 3)?
            .add_source(File::from(path).required(false))
            // FRAMEBUS_DEMO__FRAMES=4 -> demo.frames
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
    }

    pub fn validate(&self) -> FrameBusResult<()> {
        ensure!(
            !self.bus.target_origin.is_empty(),
            StatusCode::InvalidConfig,
            "bus.target_origin must not be empty"
        );
        ensure!(
            !self.agent.origin.is_empty(),
            StatusCode::InvalidConfig,
            "agent.origin must not be empty"
        );
        ensure!(
            !self.demo.event.is_empty(),
            StatusCode::InvalidConfig,
            "demo.event must not be empty"
        );
        self.logging.validate()
    }
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use serial_test::serial;

    use super::*;
    use crate::logging::LogFormat;

    fn missing_file() -> std::path::PathBuf {
        Path::new("definitely-missing-framebus.toml").to_path_buf()
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let settings = Settings::load_from(&missing_file()).unwrap();
        assert_eq!(settings.bus.target_origin, "*");
        assert_eq!(settings.agent.origin, "https://host.local");
        assert_eq!(settings.agent.agent_config(), AgentConfig::default());
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Compact);
        assert_eq!(settings.demo.frames, 2);
        assert_eq!(settings.demo.event, "ping");
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("framebus.toml");
        fs::write(
            &path,
            r#"
[bus]
target_origin = "https://host.example"

[agent]
origin = "https://host.example"

[logging]
level = "debug"
format = "json"

[demo]
frames = 5
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.bus.target_origin, "https://host.example");
        assert_eq!(settings.agent.origin, "https://host.example");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.demo.frames, 5);
        assert_eq!(settings.demo.count, 3);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        env::set_var("FRAMEBUS_DEMO__FRAMES", "7");
        env::set_var("FRAMEBUS_BUS__TARGET_ORIGIN", "https://env.example");
        let settings = Settings::load_from(&missing_file());
        env::remove_var("FRAMEBUS_DEMO__FRAMES");
        env::remove_var("FRAMEBUS_BUS__TARGET_ORIGIN");

        let settings = settings.unwrap();
        assert_eq!(settings.demo.frames, 7);
        assert_eq!(settings.bus.target_origin, "https://env.example");
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("framebus.toml");
        fs::write(&path, "[agent]\norigin = \"\"\n").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);

        fs::write(&path, "[demo]\nframes = \"many\"\n").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }
}
