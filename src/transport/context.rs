use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use once_cell::sync::Lazy;
use tokio::sync::broadcast;
use tracing::debug;

use super::Frame;
use crate::{config::TransportConfig, TransportError};

static GLOBAL: Lazy<Context> = Lazy::new(Context::new);

/// Слот внутрипроцессного адреса.
struct InprocSlot {
    tx: broadcast::Sender<Frame>,
    /// Есть ли у адреса живой издатель
    bound: bool,
}

struct ContextInner {
    config: TransportConfig,
    inproc: DashMap<String, InprocSlot>,
}

/// Общий транспортный контекст.
///
/// Хранит параметры транспорта и таблицу `inproc://` адресов. Клонирование
/// дешёвое: клоны разделяют одну таблицу. Сокеты `inproc://` видят друг
/// друга, только если созданы из одного контекста (или его клонов).
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                config,
                inproc: DashMap::new(),
            }),
        }
    }

    /// Процессный контекст по умолчанию.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    /// `true`, если оба значения ссылаются на один контекст.
    pub fn same_as(
        &self,
        other: &Context,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Внутрипроцессные адреса, у которых сейчас есть издатель.
    pub fn bound_endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .inproc
            .iter()
            .filter(|slot| slot.bound)
            .map(|slot| slot.key().clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Занимает адрес за издателем. Второй `bind` того же адреса
    /// возвращает [`TransportError::AddressInUse`].
    pub(crate) fn bind_inproc(
        &self,
        name: &str,
    ) -> Result<broadcast::Sender<Frame>, TransportError> {
        match self.inner.inproc.entry(name.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().bound {
                    return Err(TransportError::AddressInUse {
                        endpoint: format!("inproc://{name}"),
                    });
                }
                slot.get_mut().bound = true;
                Ok(slot.get().tx.clone())
            }
            Entry::Vacant(slot) => {
                let tx = self.channel();
                slot.insert(InprocSlot {
                    tx: tx.clone(),
                    bound: true,
                });
                Ok(tx)
            }
        }
    }

    /// Освобождает адрес. Подключённые подписчики остаются в слоте и
    /// начнут получать фреймы, когда адрес займёт новый издатель.
    pub(crate) fn unbind_inproc(
        &self,
        name: &str,
    ) {
        let remove = match self.inner.inproc.get_mut(name) {
            Some(mut slot) => {
                slot.bound = false;
                slot.tx.receiver_count() == 0
            }
            None => false,
        };
        if remove {
            self.inner.inproc.remove(name);
        }
        debug!(endpoint = name, "In-process endpoint released");
    }

    /// Подключение допускается и до `bind`.
    pub(crate) fn connect_inproc(
        &self,
        name: &str,
    ) -> broadcast::Receiver<Frame> {
        self.inner
            .inproc
            .entry(name.to_string())
            .or_insert_with(|| InprocSlot {
                tx: self.channel(),
                bound: false,
            })
            .tx
            .subscribe()
    }

    fn channel(&self) -> broadcast::Sender<Frame> {
        broadcast::channel(self.inner.config.high_water_mark.max(1)).0
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.inner.config)
            .field("inproc", &self.inner.inproc.len())
            .finish()
    }
}
