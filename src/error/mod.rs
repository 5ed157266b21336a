//! Типы ошибок крейта. Определены в `topicast-error`, здесь только
//! реэкспорт.

pub use topicast_error::{
    CodecError, ErrorExt, FrameError, LogLevel, NotifyError, StatusCode, SubscriberError,
    TransportError, TransportResult, TryRecvError,
};
