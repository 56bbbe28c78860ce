use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки разбора и сериализации конвертов.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Входящие данные не являются объектом, это не наш конверт.
    #[error("message data is not an object")]
    NotAnObject,

    /// Поле присутствует, но имеет неверный тип.
    #[error("field '{field}' must be a {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    /// Байтовое представление не разобралось как JSON.
    #[error("malformed envelope bytes: {reason}")]
    Malformed { reason: String },

    /// Конверт не удалось сериализовать.
    #[error("envelope serialization failed: {reason}")]
    Encode { reason: String },
}

impl ErrorExt for CodecError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAnObject => StatusCode::InvalidEnvelope,
            Self::InvalidField { .. } => StatusCode::InvalidField,
            Self::Malformed { .. } => StatusCode::DecodingError,
            Self::Encode { .. } => StatusCode::EncodingError,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::InvalidField {
            field: "eventName",
            expected: "string",
        };
        assert_eq!(err.to_string(), "field 'eventName' must be a string");
        assert!(err.status_code().is_protocol_error());
    }
}
