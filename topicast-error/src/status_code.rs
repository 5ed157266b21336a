use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки (включая отказ подписчика)
/// - 2xxx: Ошибки данных и адресов
/// - 4xxx: Перегрузка (отставание получателя, переполнение очереди)
/// - 5xxx: Сериализация полезной нагрузки
/// - 6xxx: Сеть / IO
/// - 8xxx: Протокольные ошибки (фреймы, endpoint-строки)
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
    SubscriberFailed = 1006,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    AlreadyExists = 2001,

    // === 4xxx: Перегрузка ===
    RateLimited = 4000,
    QueueFull = 4004,

    // === 5xxx: Сериализация ===
    SerializationFailed = 5003,
    DeserializationFailed = 5004,

    // === 6xxx: Сеть/IO ===
    Io = 6000,
    ConnectionClosed = 6001,
    Timeout = 6002,
    ConnectionFailed = 6004,
    UnexpectedEof = 6007,
    BindFailed = 6008,

    // === 8xxx: Протокол ===
    InvalidFrame = 8000,
    InvalidUtf8 = 8004,
    SizeLimit = 8007,
    InvalidEndpoint = 8012,
    UnsupportedScheme = 8013,
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
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Возвращает `true`, если операцию имеет смысл повторить.
    ///
    /// Для транспорта это прежде всего таймауты и отказ в подключении:
    /// издатель мог ещё не успеть выполнить `bind`.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited | Self::QueueFull | Self::ConnectionFailed
        )
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Ошибка протокола или разбора (диапазон 8xxx).
    pub fn is_protocol_error(&self) -> bool {
        (8000..=8999).contains(&self.code())
    }

    /// Ошибка сети или ввода-вывода (диапазон 6xxx).
    pub fn is_network_error(&self) -> bool {
        (6000..=6999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::QueueFull => LogLevel::Debug,
            Self::InvalidArgs | Self::InvalidEndpoint | Self::UnsupportedScheme => LogLevel::Info,
            Self::RateLimited
            | Self::Timeout
            | Self::ConnectionClosed
            | Self::SubscriberFailed
            | Self::DeserializationFailed => LogLevel::Warn,
            Self::Internal | Self::BindFailed | Self::ConnectionFailed | Self::Io => {
                LogLevel::Error
            }
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
