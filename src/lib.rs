/// Remote publisher and subscriber on top of the pub/sub transport.
pub mod bridge;
/// Settings loading (defaults, `topicast.toml`, `TOPICAST_*` environment).
pub mod config;
/// Error types re-exported from `topicast-error`.
pub mod error;
/// Logging initialisation (formatting, filters, non-blocking output).
pub mod logging;
/// Topic-addressed observer: registry, notifier, subscriber contract.
pub mod observer;
/// Pub/sub sockets: endpoints, frames, subscription filters.
pub mod transport;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Network bridge.
pub use bridge::{ListenMode, ListenerStats, RemotePublisher, RemoteSubscriber};
/// Settings.
pub use config::{ListenStrategy, Settings, TransportConfig};
/// Errors and status codes.
pub use error::{
    CodecError, ErrorExt, FrameError, NotifyError, StatusCode, SubscriberError, TransportError,
    TransportResult, TryRecvError,
};
/// Logging.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
/// Local observer.
pub use observer::{FnSubscriber, Notifier, Publish, Subscriber, TopicRegistry, Topics, WILDCARD};
/// Transport.
pub use transport::{Context, Endpoint, Frame, PayloadCodec, PubSocket, SubSocket};
