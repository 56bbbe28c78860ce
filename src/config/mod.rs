//! Загрузка настроек: значения по умолчанию, `framebus.toml`, окружение.

pub mod settings;

pub use settings::{AgentSettings, DemoSettings, Settings, DEFAULT_CONFIG_FILE, ENV_PREFIX};
