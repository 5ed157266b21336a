use std::sync::Arc;

use serde_json::Value;

use crate::SubscriberError;

/// Контракт подписчика: единственный колбэк `update(payload, topic)`.
///
/// Один и тот же подписчик может быть зарегистрирован локально в
/// [`Notifier`](crate::Notifier) или получать данные по сети через
/// [`RemoteSubscriber`](crate::RemoteSubscriber): сигнатура колбэка
/// одинакова, поэтому код подписчика не зависит от способа доставки.
///
/// Вызывающий `notify` узнаёт об ошибке подписчика: локальный
/// `Notifier` прекращает рассылку на первой ошибке.
pub trait Subscriber<P = Value>: Send + Sync {
    /// Вызывается при каждом уведомлении по интересующей теме.
    fn update(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), SubscriberError>;

    /// Имя подписчика для логов и ошибок.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Подписчик на основе замыкания.
///
/// Удобен в тестах и для небольших обработчиков:
///
/// ```
/// use topicast::{FnSubscriber, Subscriber};
///
/// let printer = FnSubscriber::new("printer", |payload: &serde_json::Value, topic: &str| {
///     println!("{topic}: {payload}");
///     Ok::<_, topicast::SubscriberError>(())
/// });
/// assert_eq!(Subscriber::<serde_json::Value>::name(&printer), "printer");
/// ```
pub struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> FnSubscriber<F> {
    pub fn new(
        name: impl Into<String>,
        callback: F,
    ) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<P, F> Subscriber<P> for FnSubscriber<F>
where
    F: Fn(&P, &str) -> Result<(), SubscriberError> + Send + Sync,
{
    fn update(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), SubscriberError> {
        (self.callback)(payload, topic)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Сравнивает подписчиков по адресу аллокации `Arc`, а не по значению.
pub(crate) fn same_subscriber<A, B>(
    a: &Arc<A>,
    b: &Arc<B>,
) -> bool
where
    A: ?Sized,
    B: ?Sized,
{
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
