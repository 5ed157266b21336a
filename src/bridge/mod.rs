//! Мост между локальным наблюдателем и транспортом pub/sub.
//!
//! [`RemotePublisher`] принимает `notify(payload, topic)` и отправляет
//! фрейм; [`RemoteSubscriber`] принимает фреймы и вызывает `update` у
//! своего обработчика, как это делал бы локальный `Notifier`.

pub mod publisher;
pub mod subscriber;

pub use publisher::RemotePublisher;
pub use subscriber::{ListenMode, ListenerStats, RemoteSubscriber, DEFAULT_POLL_INTERVAL};
