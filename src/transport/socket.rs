use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, trace, warn};

use super::{Context, Endpoint, Frame, FrameCodec, SubscriptionFilter};
use crate::{TransportError, TryRecvError};

const READ_BUFFER_SIZE: usize = 8 * 1024;
/// Пауза после ошибки `accept` (например, исчерпаны дескрипторы).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Счётчики отправляющего сокета.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PubStats {
    /// Вызовы `send`, прошедшие кодирование
    pub sent: u64,
    /// Фреймы, отброшенные для получателей с заполненной очередью
    pub dropped: u64,
}

/// Подключённый TCP-получатель.
struct Peer {
    addr: SocketAddr,
    tx: mpsc::Sender<Bytes>,
}

enum PubKind {
    Inproc {
        ctx: Context,
        name: String,
        tx: broadcast::Sender<Frame>,
    },
    Tcp {
        peers: Arc<Mutex<Vec<Peer>>>,
        acceptor: JoinHandle<()>,
        codec: FrameCodec,
    },
}

/// Отправляющая сторона pub/sub.
///
/// `send` никогда не ждёт получателей: фрейм уходит всем подключённым на
/// момент вызова, а получатели с заполненной очередью (`high_water_mark`)
/// его пропускают. Получатели, подключившиеся позже, ранее отправленных
/// фреймов не видят.
pub struct PubSocket {
    endpoint: Endpoint,
    kind: PubKind,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl PubSocket {
    /// Занимает адрес.
    ///
    /// Для `tcp://host:0` порт выбирает ОС; фактический адрес доступен
    /// через [`local_endpoint`](Self::local_endpoint).
    pub async fn bind(
        ctx: &Context,
        endpoint: &str,
    ) -> Result<Self, TransportError> {
        let parsed = Endpoint::parse(endpoint)?;
        let config = ctx.config();

        let (endpoint, kind) = match parsed {
            Endpoint::Inproc(name) => {
                let tx = ctx.bind_inproc(&name)?;
                let kind = PubKind::Inproc {
                    ctx: ctx.clone(),
                    name: name.clone(),
                    tx,
                };
                (Endpoint::Inproc(name), kind)
            }
            Endpoint::Tcp { host, port } => {
                let listener = TcpListener::bind(Endpoint::bind_addr(&host, port))
                    .await
                    .map_err(|source| bind_error(endpoint, source))?;
                let local = listener
                    .local_addr()
                    .map_err(|source| bind_error(endpoint, source))?;

                let peers = Arc::new(Mutex::new(Vec::new()));
                let acceptor = tokio::spawn(accept_loop(
                    listener,
                    peers.clone(),
                    config.high_water_mark.max(1),
                ));
                let kind = PubKind::Tcp {
                    peers,
                    acceptor,
                    codec: FrameCodec::new(config.max_frame_size),
                };
                let endpoint = Endpoint::Tcp {
                    host,
                    port: local.port(),
                };
                (endpoint, kind)
            }
        };

        debug!(endpoint = %endpoint, "Publisher socket bound");
        Ok(Self {
            endpoint,
            kind,
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Отправляет фрейм всем текущим получателям.
    ///
    /// Ошибка возвращается только для фрейма, превышающего
    /// `max_frame_size`; отсутствие получателей ошибкой не считается.
    pub fn send(
        &self,
        frame: Frame,
    ) -> Result<(), TransportError> {
        match &self.kind {
            PubKind::Inproc { tx, .. } => {
                // Err означает лишь отсутствие получателей.
                let _ = tx.send(frame);
            }
            PubKind::Tcp { peers, codec, .. } => {
                let mut buf = BytesMut::with_capacity(frame.encoded_len());
                codec.encode(&frame, &mut buf)?;
                let bytes = buf.freeze();

                peers.lock().retain(|peer| match peer.tx.try_send(bytes.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        debug!(peer = %peer.addr, "Peer queue full, frame dropped");
                        true
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(peer = %peer.addr, "Peer disconnected");
                        false
                    }
                });
            }
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Фактический адрес (с портом, выбранным ОС).
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Количество подключённых получателей.
    pub fn peer_count(&self) -> usize {
        match &self.kind {
            PubKind::Inproc { tx, .. } => tx.receiver_count(),
            PubKind::Tcp { peers, .. } => {
                let mut peers = peers.lock();
                peers.retain(|peer| !peer.tx.is_closed());
                peers.len()
            }
        }
    }

    pub fn stats(&self) -> PubStats {
        PubStats {
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PubSocket {
    fn drop(&mut self) {
        match &self.kind {
            PubKind::Inproc { ctx, name, .. } => ctx.unbind_inproc(name),
            PubKind::Tcp {
                acceptor, peers, ..
            } => {
                acceptor.abort();
                // Закрытые очереди завершают writer-задачи и соединения.
                peers.lock().clear();
            }
        }
        debug!(endpoint = %self.endpoint, "Publisher socket closed");
    }
}

impl std::fmt::Debug for PubSocket {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PubSocket")
            .field("endpoint", &self.endpoint)
            .field("stats", &self.stats())
            .finish()
    }
}

async fn accept_loop(
    listener: TcpListener,
    peers: Arc<Mutex<Vec<Peer>>>,
    high_water_mark: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    trace!(peer = %addr, error = %e, "Failed to set TCP_NODELAY");
                }
                let (tx, rx) = mpsc::channel(high_water_mark);
                peers.lock().push(Peer { addr, tx });
                tokio::spawn(write_loop(stream, rx, addr));
                debug!(peer = %addr, "Subscriber connected");
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept subscriber connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn write_loop(
    mut stream: TcpStream,
    mut rx: mpsc::Receiver<Bytes>,
    addr: SocketAddr,
) {
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = stream.write_all(&bytes).await {
            debug!(peer = %addr, error = %e, "Write to subscriber failed");
            return;
        }
    }
    let _ = stream.shutdown().await;
}

fn bind_error(
    endpoint: &str,
    source: std::io::Error,
) -> TransportError {
    if source.kind() == std::io::ErrorKind::AddrInUse {
        return TransportError::AddressInUse {
            endpoint: endpoint.to_string(),
        };
    }
    TransportError::Bind {
        endpoint: endpoint.to_string(),
        source,
    }
}

type TcpInbox = mpsc::Receiver<Result<Frame, TransportError>>;

enum Inbox {
    Inproc(broadcast::Receiver<Frame>),
    Tcp {
        rx: TcpInbox,
        reader: JoinHandle<()>,
    },
    Closed,
}

/// Принимающая сторона pub/sub.
///
/// Фреймы фильтруются по префиксу темы ([`SubscriptionFilter`]); без
/// подписок сокет не пропускает ничего. Фильтр разделяемый: его можно
/// менять из другой задачи, пока сокет ждёт в `recv`.
pub struct SubSocket {
    endpoint: Endpoint,
    filter: Arc<SubscriptionFilter>,
    inbox: Inbox,
}

impl SubSocket {
    /// Подключается к адресу.
    ///
    /// TCP-подключение ограничено `connect_timeout`; `inproc://` адрес
    /// может быть занят издателем и позже.
    pub async fn connect(
        ctx: &Context,
        endpoint: &str,
    ) -> Result<Self, TransportError> {
        let parsed = Endpoint::parse(endpoint)?;
        let config = ctx.config();

        let inbox = match &parsed {
            Endpoint::Inproc(name) => Inbox::Inproc(ctx.connect_inproc(name)),
            Endpoint::Tcp { host, port } => {
                let after = config.connect_timeout();
                let stream = timeout(after, TcpStream::connect(format!("{host}:{port}")))
                    .await
                    .map_err(|_| TransportError::Timeout {
                        endpoint: endpoint.to_string(),
                        after,
                    })?
                    .map_err(|source| TransportError::Connect {
                        endpoint: endpoint.to_string(),
                        source,
                    })?;
                if let Err(e) = stream.set_nodelay(true) {
                    trace!(error = %e, "Failed to set TCP_NODELAY");
                }

                let (tx, rx) = mpsc::channel(config.high_water_mark.max(1));
                let reader = tokio::spawn(read_loop(
                    stream,
                    tx,
                    FrameCodec::new(config.max_frame_size),
                    parsed.to_string(),
                ));
                Inbox::Tcp { rx, reader }
            }
        };

        debug!(endpoint = %parsed, "Subscriber socket connected");
        Ok(Self {
            endpoint: parsed,
            filter: Arc::new(SubscriptionFilter::new()),
            inbox,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn filter(&self) -> &Arc<SubscriptionFilter> {
        &self.filter
    }

    pub fn subscribe(
        &self,
        prefix: &[u8],
    ) {
        self.filter.subscribe(prefix);
    }

    pub fn unsubscribe(
        &self,
        prefix: &[u8],
    ) -> bool {
        self.filter.unsubscribe(prefix)
    }

    /// Ждёт следующий фрейм, прошедший фильтр.
    ///
    /// Отмена future безопасна: фреймы не теряются.
    pub async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            let frame = match &mut self.inbox {
                Inbox::Inproc(rx) => match rx.recv().await {
                    Ok(frame) => frame,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            endpoint = %self.endpoint,
                            skipped,
                            "Subscriber lagged, frames dropped"
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(closed(&self.endpoint));
                    }
                },
                Inbox::Tcp { rx, .. } => match rx.recv().await {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => return Err(e),
                    None => return Err(closed(&self.endpoint)),
                },
                Inbox::Closed => return Err(closed(&self.endpoint)),
            };

            if self.filter.matches(&frame.topic) {
                return Ok(frame);
            }
        }
    }

    /// Неблокирующий приём: [`TryRecvError::Empty`], если подходящего
    /// фрейма сейчас нет.
    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        loop {
            let frame = match &mut self.inbox {
                Inbox::Inproc(rx) => match rx.try_recv() {
                    Ok(frame) => frame,
                    Err(broadcast::error::TryRecvError::Empty) => return Err(TryRecvError::Empty),
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        warn!(
                            endpoint = %self.endpoint,
                            skipped,
                            "Subscriber lagged, frames dropped"
                        );
                        continue;
                    }
                    Err(broadcast::error::TryRecvError::Closed) => {
                        return Err(closed(&self.endpoint).into());
                    }
                },
                Inbox::Tcp { rx, .. } => match rx.try_recv() {
                    Ok(Ok(frame)) => frame,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(mpsc::error::TryRecvError::Empty) => return Err(TryRecvError::Empty),
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        return Err(closed(&self.endpoint).into());
                    }
                },
                Inbox::Closed => return Err(closed(&self.endpoint).into()),
            };

            if self.filter.matches(&frame.topic) {
                return Ok(frame);
            }
        }
    }

    pub async fn recv_timeout(
        &mut self,
        after: Duration,
    ) -> Result<Frame, TransportError> {
        match timeout(after, self.recv()).await {
            Ok(res) => res,
            Err(_) => Err(TransportError::Timeout {
                endpoint: self.endpoint.to_string(),
                after,
            }),
        }
    }

    /// Закрывает сокет. Повторный вызов ничего не делает; дальнейший
    /// приём возвращает [`TransportError::Closed`].
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.inbox, Inbox::Closed) {
            Inbox::Closed => return,
            Inbox::Tcp { reader, .. } => reader.abort(),
            Inbox::Inproc(_) => {}
        }
        debug!(endpoint = %self.endpoint, "Subscriber socket closed");
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.inbox, Inbox::Closed)
    }
}

impl Drop for SubSocket {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SubSocket {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SubSocket")
            .field("endpoint", &self.endpoint)
            .field("filter", &self.filter)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn closed(endpoint: &Endpoint) -> TransportError {
    TransportError::Closed {
        endpoint: endpoint.to_string(),
    }
}

/// Читает поток, режет его на фреймы и передаёт в очередь сокета.
///
/// Любая ошибка потока передаётся получателю последней и завершает задачу.
async fn read_loop(
    mut stream: TcpStream,
    tx: mpsc::Sender<Result<Frame, TransportError>>,
    codec: FrameCodec,
    endpoint: String,
) {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        loop {
            match codec.decode(&mut buf) {
                Ok(Some(frame)) => {
                    if tx.send(Ok(frame)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            }
        }

        let err = match stream.read_buf(&mut buf).await {
            Ok(0) if buf.is_empty() => TransportError::ConnectionLost {
                endpoint,
                reason: "publisher closed the connection".to_string(),
            },
            Ok(0) => crate::FrameError::Truncated {
                expected: codec.required_len(&buf),
                got: buf.len(),
            }
            .into(),
            Ok(_) => continue,
            Err(e) => TransportError::ConnectionLost {
                endpoint,
                reason: e.to_string(),
            },
        };
        debug!(error = %err, "Subscriber connection finished");
        let _ = tx.send(Err(err)).await;
        return;
    }
}
