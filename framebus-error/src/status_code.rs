use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок framebus.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки (аргументы, окружение, колбэки)
/// - 2xxx: Ошибки данных
/// - 6xxx: Транспорт
/// - 8xxx: Протокол (конверты, кодек)
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,
    CallbackFailed = 1005,
    InvalidConfig = 1006,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,

    // === 6xxx: Транспорт ===
    Io = 6000,

    // === 8xxx: Протокол ===
    InvalidEnvelope = 8000,
    InvalidField = 8001,
    EncodingError = 8002,
    DecodingError = 8003,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    ///
    /// Возвращает `None`, если значение не соответствует ни одному варианту.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Ошибка вызывающей стороны: неверные аргументы или данные.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgs) || (2000..=2999).contains(&self.code())
    }

    /// Внутренняя или инфраструктурная ошибка.
    pub fn is_server_error(&self) -> bool {
        let c = self.code();
        !matches!(self, Self::InvalidArgs) && matches!(c, 1000..=1999 | 6000..=6999)
    }

    /// Ошибка протокола или разбора конверта (диапазон 8xxx).
    pub fn is_protocol_error(&self) -> bool {
        (8000..=8999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound => LogLevel::Debug,
            Self::InvalidArgs | Self::InvalidConfig => LogLevel::Info,
            // Кривые конверты из чужих фреймов: обычное дело.
            Self::InvalidEnvelope | Self::InvalidField | Self::DecodingError => LogLevel::Trace,
            Self::Internal | Self::Unsupported | Self::CallbackFailed => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет разделение клиентских и серверных ошибок.
    #[test]
    fn test_client_vs_server() {
        assert!(StatusCode::InvalidArgs.is_client_error());
        assert!(StatusCode::NotFound.is_client_error());
        assert!(!StatusCode::InvalidArgs.is_server_error());
        assert!(StatusCode::Internal.is_server_error());
        assert!(StatusCode::Unsupported.is_server_error());
        assert!(StatusCode::Io.is_server_error());
    }

    /// Тест проверяет принадлежность протокольных кодов диапазону 8xxx.
    #[test]
    fn test_protocol_range() {
        assert!(StatusCode::InvalidEnvelope.is_protocol_error());
        assert!(StatusCode::DecodingError.is_protocol_error());
        assert!(!StatusCode::CallbackFailed.is_protocol_error());
    }

    /// Тест проверяет конвертацию через `TryFrom<u32>` и вспомогательную
    /// `from_u32`.
    #[test]
    fn test_from_u32_roundtrip() {
        assert_eq!(StatusCode::from_u32(1004), Some(StatusCode::InvalidArgs));
        assert_eq!(StatusCode::from_u32(8000), Some(StatusCode::InvalidEnvelope));
        assert_eq!(StatusCode::from_u32(4242), None);
        assert_eq!(StatusCode::from_u32(2001), None);
        assert_eq!(StatusCode::from_u32(6002), None);
        assert_eq!(u32::from(StatusCode::Unsupported), 1001);
        assert!(StatusCode::is_success(0));
    }

    /// Тест проверяет рекомендуемые уровни логирования.
    #[test]
    fn test_log_levels() {
        assert_eq!(StatusCode::CallbackFailed.log_level(), LogLevel::Error);
        assert_eq!(StatusCode::InvalidArgs.log_level(), LogLevel::Info);
        assert_eq!(StatusCode::InvalidEnvelope.log_level(), LogLevel::Trace);
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::InvalidArgs.to_string(), "InvalidArgs (1004)");
    }
}
