use std::{
    fmt,
    future::Future,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::{debug, error, info, warn};

use crate::{
    transport::{
        topic_prefix, Context, Endpoint, Frame, PayloadCodec, SubSocket, SubscriptionFilter,
    },
    Subscriber, SubscriberError, Topics, TransportError, TryRecvError,
};

/// Пауза между попытками в режиме опроса по умолчанию.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Стратегия цикла приёма.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenMode {
    /// Ожидание следующего фрейма на сокете.
    #[default]
    Blocking,
    /// Неблокирующая попытка приёма; если фрейма нет, пауза `interval`.
    /// Полученный фрейм обрабатывается сразу, без паузы.
    Polling { interval: Duration },
}

impl ListenMode {
    pub fn polling() -> Self {
        Self::Polling {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl fmt::Display for ListenMode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Blocking => f.write_str("blocking"),
            Self::Polling { interval } => write!(f, "polling({}ms)", interval.as_millis()),
        }
    }
}

/// Счётчики цикла приёма.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Фреймы, прошедшие фильтр
    pub received: u64,
    /// Успешные вызовы обработчика
    pub delivered: u64,
    /// Фреймы с некорректной темой или нагрузкой
    pub decode_errors: u64,
    /// Ошибки, возвращённые обработчиком
    pub handler_errors: u64,
}

#[derive(Debug, Default)]
struct ListenerCounters {
    received: AtomicU64,
    delivered: AtomicU64,
    decode_errors: AtomicU64,
    handler_errors: AtomicU64,
}

impl ListenerCounters {
    fn snapshot(&self) -> ListenerStats {
        ListenerStats {
            received: self.received.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
        }
    }
}

/// Сетевой подписчик: владеет принимающим сокетом и передаёт каждый
/// полученный фрейм обработчику `S` как обычный `update(payload, topic)`.
///
/// Жизненный цикл:
/// - `connect` подключает сокет и ставит начальные фильтры
///   (пустой список тем означает wildcard);
/// - `listen` / `listen_until` крутят цикл приёма;
/// - любой выход из цикла (ошибка транспорта, сигнал остановки, отмена
///   future) закрывает сокет, повторный `listen` вернёт
///   [`TransportError::Closed`].
///
/// Ошибки декодирования и обработчика логируются и учитываются в
/// [`ListenerStats`], но цикл не прерывают.
pub struct RemoteSubscriber<S, P = Value> {
    endpoint: Endpoint,
    socket: AsyncMutex<SubSocket>,
    filter: Arc<SubscriptionFilter>,
    /// Имена тем в порядке подписки (с повторами, как и счётчики фильтра)
    topics: Mutex<Vec<String>>,
    handler: S,
    codec: PayloadCodec,
    mode: ListenMode,
    counters: ListenerCounters,
    _payload: PhantomData<fn() -> P>,
}

impl<S, P> RemoteSubscriber<S, P>
where
    S: Subscriber<P>,
    P: DeserializeOwned,
{
    /// Подключается к `endpoint` и подписывается на `topics`.
    ///
    /// Режим приёма и кодек берутся из конфигурации контекста.
    pub async fn connect(
        ctx: &Context,
        endpoint: &str,
        topics: impl Into<Topics>,
        handler: S,
    ) -> Result<Self, TransportError> {
        let socket = SubSocket::connect(ctx, endpoint).await?;
        let config = ctx.config();

        let subscriber = Self {
            endpoint: socket.endpoint().clone(),
            filter: socket.filter().clone(),
            socket: AsyncMutex::new(socket),
            topics: Mutex::new(Vec::new()),
            handler,
            codec: config.codec,
            mode: config.listen_mode(),
            counters: ListenerCounters::default(),
            _payload: PhantomData,
        };
        let topics: Topics = topics.into();
        subscriber.observe(topics.or_all());
        Ok(subscriber)
    }

    pub fn with_mode(
        mut self,
        mode: ListenMode,
    ) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_codec(
        mut self,
        codec: PayloadCodec,
    ) -> Self {
        self.codec = codec;
        self
    }

    pub fn mode(&self) -> ListenMode {
        self.mode
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn handler(&self) -> &S {
        &self.handler
    }

    /// Добавляет фильтры тем. Безопасно вызывать во время `listen`.
    pub fn observe(
        &self,
        topics: impl Into<Topics>,
    ) {
        let topics = topics.into();
        let mut observed = self.topics.lock();
        for topic in topics.iter() {
            self.filter.subscribe(topic_prefix(topic));
            observed.push(topic.to_string());
        }
        debug!(endpoint = %self.endpoint, %topics, "Observing topics");
    }

    /// Снимает фильтры тем. Тема, на которую не подписывались,
    /// пропускается.
    pub fn stop_observing(
        &self,
        topics: impl Into<Topics>,
    ) {
        let topics = topics.into();
        let mut observed = self.topics.lock();
        for topic in topics.iter() {
            if let Some(pos) = observed.iter().position(|t| t == topic) {
                observed.remove(pos);
                self.filter.unsubscribe(topic_prefix(topic));
            }
        }
        debug!(endpoint = %self.endpoint, %topics, "Stopped observing topics");
    }

    /// Темы, на которые сейчас есть подписка, без повторов, по алфавиту.
    pub fn observed_topics(&self) -> Vec<String> {
        let mut topics = self.topics.lock().clone();
        topics.sort_unstable();
        topics.dedup();
        topics
    }

    pub fn stats(&self) -> ListenerStats {
        self.counters.snapshot()
    }

    /// Цикл приёма без сигнала остановки.
    ///
    /// Завершается только ошибкой транспорта или отменой future.
    pub async fn listen(&self) -> Result<(), TransportError> {
        self.listen_until(std::future::pending()).await
    }

    /// Цикл приёма до срабатывания `shutdown`.
    ///
    /// Возвращает `Ok(())` после `shutdown` и ошибку транспорта, если
    /// соединение потеряно. В обоих случаях сокет закрыт.
    pub async fn listen_until<F>(
        &self,
        shutdown: F,
    ) -> Result<(), TransportError>
    where
        F: Future<Output = ()>,
    {
        let mut socket = CloseOnExit(self.socket.lock().await);
        if socket.is_closed() {
            return Err(TransportError::Closed {
                endpoint: self.endpoint.to_string(),
            });
        }

        tokio::pin!(shutdown);
        info!(endpoint = %self.endpoint, mode = %self.mode, "Listening");

        loop {
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(endpoint = %self.endpoint, "Listener stopped");
                    return Ok(());
                }
                received = next_frame(&mut socket, self.mode) => received,
            };

            match received {
                Ok(frame) => self.dispatch(frame),
                Err(e) => {
                    error!(
                        endpoint = %self.endpoint,
                        error = %e,
                        "Listener failed, closing socket"
                    );
                    return Err(e);
                }
            }
        }
    }

    fn dispatch(
        &self,
        frame: Frame,
    ) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let topic = match frame.topic_str() {
            Ok(topic) => topic,
            Err(e) => {
                self.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!(endpoint = %self.endpoint, error = %e, "Skipping frame with invalid topic");
                return;
            }
        };

        let payload: P = match self.codec.decode(&frame.payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    endpoint = %self.endpoint,
                    topic,
                    error = %e,
                    "Skipping undecodable payload"
                );
                return;
            }
        };

        match self.handler.update(&payload, topic) {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.handler_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    endpoint = %self.endpoint,
                    subscriber = self.handler.name(),
                    topic,
                    error = %e,
                    "Subscriber failed, continuing"
                );
            }
        }
    }
}

/// Следующий фрейм согласно режиму приёма.
async fn next_frame(
    socket: &mut SubSocket,
    mode: ListenMode,
) -> Result<Frame, TransportError> {
    match mode {
        ListenMode::Blocking => socket.recv().await,
        ListenMode::Polling { interval } => loop {
            match socket.try_recv() {
                Ok(frame) => return Ok(frame),
                Err(TryRecvError::Empty) => tokio::time::sleep(interval).await,
                Err(TryRecvError::Transport(e)) => return Err(e),
            }
        },
    }
}

/// Guard сокета на время `listen`: закрывает сокет при любом выходе.
struct CloseOnExit<'a>(AsyncMutexGuard<'a, SubSocket>);

impl Deref for CloseOnExit<'_> {
    type Target = SubSocket;

    fn deref(&self) -> &SubSocket {
        &self.0
    }
}

impl DerefMut for CloseOnExit<'_> {
    fn deref_mut(&mut self) -> &mut SubSocket {
        &mut self.0
    }
}

impl Drop for CloseOnExit<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Сетевой подписчик взаимозаменяем с локальным: `update` передаётся
/// обработчику.
impl<S, P> Subscriber<P> for RemoteSubscriber<S, P>
where
    S: Subscriber<P>,
{
    fn update(
        &self,
        payload: &P,
        topic: &str,
    ) -> Result<(), SubscriberError> {
        self.handler.update(payload, topic)
    }

    fn name(&self) -> &str {
        self.handler.name()
    }
}

impl<S, P> fmt::Debug for RemoteSubscriber<S, P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RemoteSubscriber")
            .field("endpoint", &self.endpoint)
            .field("topics", &*self.topics.lock())
            .field("codec", &self.codec)
            .field("mode", &self.mode)
            .field("stats", &self.counters.snapshot())
            .finish()
    }
}
