use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки ролей Agent и Bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Транспорт не умеет пересылать сообщения. Фатально, возникает при
    /// создании Agent или Bus.
    #[error("cross-context messaging is not supported by this host")]
    UnsupportedEnvironment,

    /// Неверный бюджет выполнений или имя события. Ничего не
    /// зарегистрировано.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Колбэк подписчика упал во время доставки.
    #[error("callback for event '{event}' failed: {reason}")]
    CallbackFailure { event: String, reason: String },
}

impl BusError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl ErrorExt for BusError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedEnvironment => StatusCode::Unsupported,
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
            Self::CallbackFailure { .. } => StatusCode::CallbackFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::UnsupportedEnvironment => "Messaging unsupported".to_string(),
            Self::InvalidArgument { reason } => format!("Invalid argument: {reason}"),
            Self::CallbackFailure { event, .. } => format!("Listener for '{event}' failed"),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "bus".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::CallbackFailure { event, .. } = self {
            tags.push(("event", event.clone()));
        }
        tags
    }
}
