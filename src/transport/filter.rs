use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::WILDCARD;

/// Префиксный фильтр подписки принимающего сокета.
///
/// Фрейм проходит фильтр, если его тема начинается хотя бы с одного из
/// подписанных префиксов. Пустой префикс пропускает всё. Префиксы
/// считаются по ссылкам: два `subscribe` одного префикса требуют двух
/// `unsubscribe`.
#[derive(Debug, Default)]
pub struct SubscriptionFilter {
    prefixes: RwLock<BTreeMap<Vec<u8>, usize>>,
}

impl SubscriptionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &self,
        prefix: &[u8],
    ) {
        *self.prefixes.write().entry(prefix.to_vec()).or_insert(0) += 1;
    }

    /// Снимает одну ссылку на префикс. `false`, если префикса не было.
    pub fn unsubscribe(
        &self,
        prefix: &[u8],
    ) -> bool {
        let mut prefixes = self.prefixes.write();
        match prefixes.get_mut(prefix) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                prefixes.remove(prefix);
                true
            }
            None => false,
        }
    }

    pub fn matches(
        &self,
        topic: &[u8],
    ) -> bool {
        self.prefixes
            .read()
            .keys()
            .any(|prefix| topic.starts_with(prefix))
    }

    /// Подписанные префиксы без учёта счётчиков.
    pub fn prefixes(&self) -> Vec<Vec<u8>> {
        self.prefixes.read().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.read().is_empty()
    }

    pub fn clear(&self) {
        self.prefixes.write().clear();
    }
}

/// Префикс фильтра для имени темы: [`WILDCARD`] и пустая строка
/// превращаются в пустой префикс.
pub fn topic_prefix(topic: &str) -> &[u8] {
    if topic == WILDCARD {
        b""
    } else {
        topic.as_bytes()
    }
}
