use std::fmt;

/// Имя группы «все темы».
///
/// Подписчик из этой группы получает уведомления по любой теме, а на
/// транспортном уровне это имя отображается в пустой префикс-фильтр.
pub const WILDCARD: &str = "all";

/// Набор тем, передаваемый в `register` / `unregister` / `observe`.
///
/// Принимает одну тему, список тем или wildcard:
///
/// ```
/// use topicast::Topics;
///
/// let one: Topics = "temperature".into();
/// let many: Topics = ["temperature", "humidity"].into();
/// assert_eq!(many.len(), 2);
/// assert!(Topics::default().is_wildcard());
/// assert!(!one.is_wildcard());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topics(Vec<String>);

impl Topics {
    /// Только wildcard-группа.
    pub fn all() -> Self {
        Self(vec![WILDCARD.to_string()])
    }

    /// Пустой набор.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// `true`, если набор содержит wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.0.iter().any(|t| t == WILDCARD)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Пустой набор заменяется на wildcard.
    ///
    /// Так ведёт себя удалённый подписчик, созданный без тем.
    pub fn or_all(self) -> Self {
        if self.is_empty() {
            Self::all()
        } else {
            self
        }
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for Topics {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl From<&str> for Topics {
    fn from(topic: &str) -> Self {
        Self(vec![topic.to_string()])
    }
}

impl From<String> for Topics {
    fn from(topic: String) -> Self {
        Self(vec![topic])
    }
}

impl From<&String> for Topics {
    fn from(topic: &String) -> Self {
        Self(vec![topic.clone()])
    }
}

impl From<Vec<String>> for Topics {
    fn from(topics: Vec<String>) -> Self {
        Self(topics)
    }
}

impl From<Vec<&str>> for Topics {
    fn from(topics: Vec<&str>) -> Self {
        Self(topics.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Topics {
    fn from(topics: &[&str]) -> Self {
        Self(topics.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Topics {
    fn from(topics: [&str; N]) -> Self {
        Self(topics.iter().map(|t| t.to_string()).collect())
    }
}

impl<'a> IntoIterator for &'a Topics {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(String::as_str)
    }
}
