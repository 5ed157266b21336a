use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use serde_json::Value;

use super::{same_subscriber, Subscriber, Topics, WILDCARD};

type Group<P> = Vec<Arc<dyn Subscriber<P>>>;

/// Реестр тем: имя темы → упорядоченный список подписчиков.
///
/// Инварианты:
/// - группа [`WILDCARD`] существует всегда, в том числе сразу после
///   создания и после [`reset`](Self::reset);
/// - порядок вставки в группу является порядком доставки;
/// - подписчик, уже состоящий в wildcard-группе, не добавляется в
///   именованные группы (повторная регистрация молча считается успешной).
///
/// Обратное направление не проверяется: подписчик, сначала
/// зарегистрированный на тему, а затем на wildcard, состоит в обеих группах
/// и получает такие уведомления дважды.
pub struct TopicRegistry<P = Value> {
    groups: HashMap<String, Group<P>>,
}

impl<P: 'static> TopicRegistry<P> {
    /// Создаёт пустой реестр с единственной wildcard-группой.
    pub fn new() -> Self {
        let mut groups = HashMap::new();
        groups.insert(WILDCARD.to_string(), Vec::new());
        Self { groups }
    }

    /// Регистрирует подписчика на одну или несколько тем.
    ///
    /// Для каждой темы: если подписчик уже состоит в её группе или в
    /// wildcard-группе, тема пропускается. Неизвестная тема создаёт новую
    /// группу. Возвращает количество групп, в которые подписчик был
    /// действительно добавлен.
    pub fn register(
        &mut self,
        subscriber: Arc<dyn Subscriber<P>>,
        topics: impl Into<Topics>,
    ) -> usize {
        let mut added = 0;
        for topic in topics.into().iter() {
            if self.contains(WILDCARD, &subscriber) {
                continue;
            }

            let group = self.groups.entry(topic.to_string()).or_default();
            if group.iter().any(|s| same_subscriber(s, &subscriber)) {
                continue;
            }

            group.push(subscriber.clone());
            added += 1;
        }
        added
    }

    /// Отписывает подписчика.
    ///
    /// [`WILDCARD`] означает «из всех групп, где он встречается».
    /// Отсутствующий подписчик или неизвестная тема не являются ошибкой.
    /// Возвращает `true`, если хотя бы одно членство было удалено.
    pub fn unregister<S>(
        &mut self,
        subscriber: &Arc<S>,
        topics: impl Into<Topics>,
    ) -> bool
    where
        S: ?Sized,
    {
        let mut removed = false;
        for topic in topics.into().iter() {
            if topic == WILDCARD {
                for group in self.groups.values_mut() {
                    removed |= remove_from(group, subscriber);
                }
            } else if let Some(group) = self.groups.get_mut(topic) {
                removed |= remove_from(group, subscriber);
            }
        }
        removed
    }

    /// Удаляет все группы и возвращает реестр в исходное состояние.
    pub fn reset(&mut self) {
        self.groups.clear();
        self.groups.insert(WILDCARD.to_string(), Vec::new());
    }

    /// Текущее отображение тема → подписчики (только чтение).
    pub fn groups(&self) -> &HashMap<String, Group<P>> {
        &self.groups
    }

    /// Подписчики темы в порядке доставки; пустой срез для неизвестной темы.
    pub fn subscribers(
        &self,
        topic: &str,
    ) -> &[Arc<dyn Subscriber<P>>] {
        self.groups.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Имена всех групп, отсортированные по алфавиту.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    pub fn contains<S>(
        &self,
        topic: &str,
        subscriber: &Arc<S>,
    ) -> bool
    where
        S: ?Sized,
    {
        self.subscribers(topic)
            .iter()
            .any(|s| same_subscriber(s, subscriber))
    }

    /// `true`, если подписчик состоит хотя бы в одной группе.
    pub fn is_registered<S>(
        &self,
        subscriber: &Arc<S>,
    ) -> bool
    where
        S: ?Sized,
    {
        self.groups
            .values()
            .any(|g| g.iter().any(|s| same_subscriber(s, subscriber)))
    }

    /// Тема → количество подписчиков, упорядочено по теме.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        self.groups
            .iter()
            .map(|(topic, group)| (topic.clone(), group.len()))
            .collect()
    }

    /// `true`, если состояние неотличимо от только что созданного реестра.
    pub fn is_pristine(&self) -> bool {
        self.groups.len() == 1
            && self
                .groups
                .get(WILDCARD)
                .is_some_and(|group| group.is_empty())
    }

    /// Снимок wildcard-группы и группы темы для рассылки.
    ///
    /// Вторая часть равна `None`, если тема не зарегистрирована или сама
    /// является wildcard.
    pub(crate) fn snapshot(
        &self,
        topic: &str,
    ) -> (Group<P>, Option<Group<P>>) {
        let wildcard = self.subscribers(WILDCARD).to_vec();
        let named = if topic == WILDCARD {
            None
        } else {
            self.groups.get(topic).cloned()
        };
        (wildcard, named)
    }
}

fn remove_from<P, S>(
    group: &mut Group<P>,
    subscriber: &Arc<S>,
) -> bool
where
    S: ?Sized,
{
    let before = group.len();
    group.retain(|s| !same_subscriber(s, subscriber));
    group.len() != before
}

impl<P: 'static> Default for TopicRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for TopicRegistry<P> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let groups: BTreeMap<&str, Vec<&str>> = self
            .groups
            .iter()
            .map(|(topic, group)| (topic.as_str(), group.iter().map(|s| s.name()).collect()))
            .collect();
        f.debug_struct("TopicRegistry")
            .field("groups", &groups)
            .finish()
    }
}
