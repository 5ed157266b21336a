//! Паттерн «наблюдатель» с адресацией по темам.
//!
//! - `topics`: тип аргумента тем и имя wildcard-группы.
//! - `subscriber`: контракт подписчика `update(payload, topic)`.
//! - `registry`: реестр тема → упорядоченные подписчики.
//! - `notifier`: синхронная рассылка и общий контракт `Publish`.

pub mod notifier;
pub mod registry;
pub mod subscriber;
pub mod topics;

pub use notifier::*;
pub use registry::*;
pub(crate) use subscriber::same_subscriber;
pub use subscriber::{FnSubscriber, Subscriber};
pub use topics::*;
