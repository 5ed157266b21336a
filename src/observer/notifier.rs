use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use parking_lot::{RwLock, RwLockReadGuard};
use serde_json::Value;
use tracing::{trace, warn};

use super::{Subscriber, TopicRegistry, Topics};
use crate::NotifyError;

/// Контракт издателя: `notify(payload, topic)`.
///
/// Реализуется локальным [`Notifier`] и сетевым
/// [`RemotePublisher`](crate::RemotePublisher), поэтому асинхронный
/// производитель данных может работать с любым из них.
#[async_trait]
pub trait Publish<P: Sync = Value>: Send + Sync {
    async fn publish(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), NotifyError>;
}

/// Синхронная рассылка уведомлений внутри процесса.
///
/// `notify` вызывает подписчиков в вызывающем потоке:
/// 1. всех из wildcard-группы, в порядке регистрации;
/// 2. затем всех из группы темы, если такая группа существует.
///
/// Перед рассылкой делается снимок обеих групп, поэтому подписчик может
/// вызывать `register` / `unregister` / `reset` этого же `Notifier` прямо из
/// `update`: изменения вступят в силу со следующего `notify`.
///
/// Ошибка подписчика не перехватывается. Первый упавший подписчик
/// прерывает рассылку, оставшиеся в этом вызове не получают уведомления,
/// а вызывающий получает [`NotifyError::Subscriber`].
pub struct Notifier<P = Value> {
    registry: RwLock<TopicRegistry<P>>,
    /// Общее количество вызовов `notify`
    notify_count: AtomicU64,
    /// Количество успешных вызовов `update`
    delivered_count: AtomicU64,
}

impl<P: 'static> Notifier<P> {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(TopicRegistry::new()),
            notify_count: AtomicU64::new(0),
            delivered_count: AtomicU64::new(0),
        }
    }

    /// Регистрирует подписчика на темы (см. [`TopicRegistry::register`]).
    pub fn register(
        &self,
        subscriber: Arc<dyn Subscriber<P>>,
        topics: impl Into<Topics>,
    ) {
        let topics = topics.into();
        let name = subscriber.name().to_string();
        let added = self.registry.write().register(subscriber, topics.clone());
        trace!(subscriber = %name, %topics, added, "Subscriber registered");
    }

    /// Отписывает подписчика (см. [`TopicRegistry::unregister`]).
    pub fn unregister<S>(
        &self,
        subscriber: &Arc<S>,
        topics: impl Into<Topics>,
    ) -> bool
    where
        S: ?Sized,
    {
        let topics = topics.into();
        let removed = self.registry.write().unregister(subscriber, topics.clone());
        trace!(%topics, removed, "Subscriber unregistered");
        removed
    }

    /// Удаляет всех подписчиков.
    pub fn reset(&self) {
        self.registry.write().reset();
        trace!("Notifier reset");
    }

    /// Доступ к реестру на чтение (диагностика и тесты).
    ///
    /// Не удерживайте guard во время `notify` из другого потока дольше,
    /// чем нужно: он блокирует регистрацию.
    pub fn registry(&self) -> RwLockReadGuard<'_, TopicRegistry<P>> {
        self.registry.read()
    }

    /// Рассылает `payload` подписчикам `topic` и wildcard-группы.
    ///
    /// Отсутствие подписчиков у темы — не ошибка.
    pub fn notify(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), NotifyError> {
        self.notify_count.fetch_add(1, Ordering::Relaxed);

        // Блокировка снимается до вызова колбэков.
        let (wildcard, named) = self.registry.read().snapshot(topic);

        trace!(
            topic,
            wildcard = wildcard.len(),
            named = named.as_ref().map_or(0, Vec::len),
            "Notifying subscribers"
        );

        for subscriber in wildcard.iter().chain(named.iter().flatten()) {
            if let Err(source) = subscriber.update(payload, topic) {
                warn!(
                    subscriber = subscriber.name(),
                    topic,
                    error = %source,
                    "Subscriber failed, aborting fan-out"
                );
                return Err(NotifyError::Subscriber {
                    subscriber: subscriber.name().to_string(),
                    topic: topic.to_string(),
                    source,
                });
            }
            self.delivered_count.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }

    /// Количество вызовов `notify`.
    pub fn notify_count(&self) -> u64 {
        self.notify_count.load(Ordering::Relaxed)
    }

    /// Количество успешных доставок подписчикам.
    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }
}

impl<P: 'static> Default for Notifier<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for Notifier<P> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("registry", &*self.registry.read())
            .field("notify_count", &self.notify_count.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl<P> Publish<P> for Notifier<P>
where
    P: Send + Sync + 'static,
{
    async fn publish(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), NotifyError> {
        self.notify(payload, topic)
    }
}
