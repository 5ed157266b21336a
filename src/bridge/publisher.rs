use async_trait::async_trait;
use serde::Serialize;
use tracing::trace;

use crate::{
    transport::{Context, Endpoint, Frame, PayloadCodec, PubSocket, PubStats},
    NotifyError, Publish, Subscriber, SubscriberError, TransportError,
};

/// Сетевой издатель: `notify(payload, topic)` превращается в фрейм
/// `[topic, payload]` на сокете издателя.
///
/// Отправка не ждёт подтверждений. Получатели, которых нет или чья очередь
/// переполнена, фрейм просто не получают. Ошибки адреса и bind возникают
/// при создании, а не при отправке.
#[derive(Debug)]
pub struct RemotePublisher {
    socket: PubSocket,
    codec: PayloadCodec,
}

impl RemotePublisher {
    /// Занимает `endpoint`. Кодек берётся из конфигурации контекста.
    pub async fn bind(
        ctx: &Context,
        endpoint: &str,
    ) -> Result<Self, TransportError> {
        let socket = PubSocket::bind(ctx, endpoint).await?;
        Ok(Self {
            socket,
            codec: ctx.config().codec,
        })
    }

    pub fn with_codec(
        mut self,
        codec: PayloadCodec,
    ) -> Self {
        self.codec = codec;
        self
    }

    pub fn codec(&self) -> PayloadCodec {
        self.codec
    }

    /// Кодирует и отправляет фрейм, не уступая планировщик.
    pub fn send<P>(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), NotifyError>
    where
        P: Serialize + ?Sized,
    {
        let payload = self.codec.encode(payload)?;
        trace!(topic, bytes = payload.len(), "Publishing frame");
        self.socket
            .send(Frame::new(topic.as_bytes().to_vec(), payload))?;
        Ok(())
    }

    /// Отправляет уведомление и уступает планировщик, давая получателям
    /// в том же runtime шанс обработать фрейм.
    pub async fn notify<P>(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), NotifyError>
    where
        P: Serialize + ?Sized,
    {
        self.send(payload, topic)?;
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Фактический адрес (с портом, выбранным ОС для `:0`).
    pub fn local_endpoint(&self) -> &Endpoint {
        self.socket.local_endpoint()
    }

    pub fn subscriber_count(&self) -> usize {
        self.socket.peer_count()
    }

    pub fn stats(&self) -> PubStats {
        self.socket.stats()
    }
}

/// Зарегистрированный в локальном [`Notifier`](crate::Notifier) издатель
/// пересылает его уведомления в сеть.
impl<P> Subscriber<P> for RemotePublisher
where
    P: Serialize,
{
    fn update(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), SubscriberError> {
        self.send(payload, topic)
            .map_err(SubscriberError::from_source)
    }

    fn name(&self) -> &str {
        "RemotePublisher"
    }
}

#[async_trait]
impl<P> Publish<P> for RemotePublisher
where
    P: Serialize + Send + Sync,
{
    async fn publish(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), NotifyError> {
        self.notify(payload, topic).await
    }
}
