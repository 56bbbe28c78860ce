use dashmap::DashMap;

use crate::transport::{same_endpoint, EndpointRef, MessageEvent, PortId};

/// Удалённый подписчик, известный Agent-у.
#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    pub event_name: String,
    pub origin: String,
    pub source: EndpointRef,
    pub last_event_id: String,
    pub ports: Vec<PortId>,
}

impl SubscriptionRecord {
    /// Запись по метаданным входящего SUBSCRIBE. Без `source` ответить
    /// некуда, поэтому такой подписки не бывает.
    pub fn from_event(
        event_name: impl Into<String>,
        event: &MessageEvent,
    ) -> Option<Self> {
        let source = event.source.clone()?;
        Some(Self {
            event_name: event_name.into(),
            origin: event.origin.clone(),
            source,
            last_event_id: event.last_event_id.clone(),
            ports: event.ports.clone(),
        })
    }

    pub fn matches(
        &self,
        origin: &str,
        source: &EndpointRef,
    ) -> bool {
        self.origin == origin && same_endpoint(&self.source, source)
    }
}

/// Реестр подписок Agent-а: `eventName -> [SubscriptionRecord]`.
///
/// Повторные подписки одной и той же пары origin/source копятся.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    records: DashMap<String, Vec<SubscriptionRecord>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        record: SubscriptionRecord,
    ) {
        self.records
            .entry(record.event_name.clone())
            .or_default()
            .push(record);
    }

    /// Снимает все записи события с совпадающими origin и source. Пустой
    /// ключ удаляется. Возвращает число снятых записей.
    pub fn remove(
        &self,
        event: &str,
        origin: &str,
        source: &EndpointRef,
    ) -> usize {
        let removed = {
            let Some(mut list) = self.records.get_mut(event) else {
                return 0;
            };
            let before = list.len();
            list.retain(|record| !record.matches(origin, source));
            before - list.len()
        };
        self.records.remove_if(event, |_, list| list.is_empty());
        removed
    }

    /// Копия записей события в порядке подписки.
    pub fn snapshot(
        &self,
        event: &str,
    ) -> Vec<SubscriptionRecord> {
        self.records
            .get(event)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    pub fn len(
        &self,
        event: &str,
    ) -> usize {
        self.records.get(event).map(|list| list.len()).unwrap_or(0)
    }

    pub fn contains(
        &self,
        event: &str,
    ) -> bool {
        self.records.contains_key(event)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::transport::{Endpoint, EventLoop, MessageHost, Window};

    fn subscribe_event(from: &Window) -> MessageEvent {
        MessageEvent::new(Value::Null, from.origin(), Some(from.endpoint()))
    }

    #[test]
    fn test_record_requires_source() {
        let ev = MessageEvent::new(Value::Null, "https://a.example", None);
        assert!(SubscriptionRecord::from_event("e", &ev).is_none());
    }

    /// Тест проверяет, что повторные подписки копятся, а одна отписка
    /// снимает их все и удаляет ключ.
    #[test]
    fn test_duplicates_accumulate_and_unsubscribe_clears() {
        let el = EventLoop::new();
        let page = Window::new(&el, "https://host.example");
        let frame = page.create_frame("https://a.example");
        let reg = SubscriptionRegistry::new();

        for _ in 0..2 {
            reg.add(SubscriptionRecord::from_event("e", &subscribe_event(&frame)).unwrap());
        }
        assert_eq!(reg.len("e"), 2);

        assert_eq!(reg.remove("e", "https://a.example", &frame.endpoint()), 2);
        assert!(!reg.contains("e"));
        assert!(reg.is_empty());
    }

    /// Тест проверяет, что отписка сравнивает и origin, и source.
    #[test]
    fn test_remove_matches_origin_and_source() {
        let el = EventLoop::new();
        let page = Window::new(&el, "https://host.example");
        let a = page.create_frame("https://a.example");
        let b = page.create_frame("https://a.example");
        let reg = SubscriptionRegistry::new();

        reg.add(SubscriptionRecord::from_event("e", &subscribe_event(&a)).unwrap());
        reg.add(SubscriptionRecord::from_event("e", &subscribe_event(&b)).unwrap());
        reg.add(SubscriptionRecord::from_event("e", &subscribe_event(&a)).unwrap());

        assert_eq!(reg.remove("e", "https://other.example", &a.endpoint()), 0);
        assert_eq!(reg.remove("e", "https://a.example", &a.endpoint()), 2);

        let left = reg.snapshot("e");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].source.id(), b.id());
        assert_eq!(reg.remove("missing", "https://a.example", &a.endpoint()), 0);
    }

    #[test]
    fn test_event_names_sorted() {
        let el = EventLoop::new();
        let frame = Window::new(&el, "https://a.example");
        let reg = SubscriptionRegistry::new();
        for name in ["z", "a", "m"] {
            reg.add(SubscriptionRecord::from_event(name, &subscribe_event(&frame)).unwrap());
        }
        assert_eq!(reg.event_names(), vec!["a", "m", "z"]);
    }
}
