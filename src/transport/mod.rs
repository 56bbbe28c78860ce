//! Транспорт: абстракция над `postMessage`-подобным примитивом.
//!
//! Протокол Agent/Bus не знает, как именно сообщения пересекают границу
//! контекстов. Ему нужно только:
//!
//! - [`Endpoint`]: цель, в которую можно отправить сообщение, с устойчивой
//!   идентичностью (её использует Agent при сравнении `source`);
//! - [`MessageHost`]: контекст исполнения с `origin`, обработчиками входящих
//!   сообщений и ссылками на `parent`/`top`.
//!
//! В крейте есть детерминированная внутрипроцессная реализация:
//! [`EventLoop`] и [`Window`].

pub mod event_loop;
pub mod window;

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde_json::Value;

pub use event_loop::{EventLoop, EventLoopStats};
pub use window::{Window, WindowBuilder};

/// `targetOrigin`, совпадающий с любым получателем.
pub const WILDCARD_ORIGIN: &str = "*";

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

/// Идентичность конечной точки. Два `EndpointRef` указывают на один и тот
/// же контекст тогда и только тогда, когда их `id` равны.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(u64);

impl EndpointId {
    /// Выдаёт новый, ещё не использованный идентификатор.
    pub fn next() -> Self {
        Self(NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "endpoint#{}", self.0)
    }
}

/// Непрозрачный дескриптор переданного порта (`event.ports`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(pub u64);

/// Идентификатор установленного обработчика; по нему обработчик снимается.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Цель для отправки сообщений.
pub trait Endpoint: Send + Sync + fmt::Debug {
    fn id(&self) -> EndpointId;

    /// Доставляет событие получателю, если `target_origin` совпадает с его
    /// origin. Несовпадение, как и в браузере, молча отбрасывает сообщение.
    fn post_message(
        &self,
        event: MessageEvent,
        target_origin: &str,
    );
}

pub type EndpointRef = Arc<dyn Endpoint>;

/// Обработчик входящих сообщений контекста.
pub type MessageHandler = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// Контекст исполнения (страница или фрейм).
pub trait MessageHost: Endpoint {
    fn origin(&self) -> &str;

    /// Ссылка на самого себя, пригодная как `source` или цель.
    fn endpoint(&self) -> EndpointRef;

    fn parent(&self) -> Option<EndpointRef>;

    fn top(&self) -> Option<EndpointRef>;

    /// Устанавливает обработчик входящих сообщений.
    fn add_message_listener(
        &self,
        handler: MessageHandler,
    ) -> ListenerId;

    /// Снимает обработчик. Возвращает `false`, если его уже нет.
    fn remove_message_listener(
        &self,
        id: ListenerId,
    ) -> bool;

    /// Есть ли у контекста примитив обмена сообщениями вообще.
    fn supports_messaging(&self) -> bool {
        true
    }

    /// Отправляет `data` в `target` от имени этого контекста: получатель
    /// увидит наш `origin` и нас как `source`.
    fn post_to(
        &self,
        target: &EndpointRef,
        data: Value,
        target_origin: &str,
    ) {
        let event = MessageEvent::new(data, self.origin(), Some(self.endpoint()));
        target.post_message(event, target_origin);
    }
}

/// Сравнивает конечные точки по идентичности.
pub fn same_endpoint(
    a: &EndpointRef,
    b: &EndpointRef,
) -> bool {
    a.id() == b.id()
}

/// Совпадает ли `target_origin` с origin получателя.
pub fn origin_matches(
    target_origin: &str,
    receiver_origin: &str,
) -> bool {
    target_origin == WILDCARD_ORIGIN || target_origin == receiver_origin
}

/// Входящее сообщение вместе с метаданными транспорта.
#[derive(Clone)]
pub struct MessageEvent {
    pub data: Value,
    pub origin: String,
    pub last_event_id: String,
    pub source: Option<EndpointRef>,
    pub ports: Vec<PortId>,
}

impl MessageEvent {
    pub fn new(
        data: Value,
        origin: impl Into<String>,
        source: Option<EndpointRef>,
    ) -> Self {
        Self {
            data,
            origin: origin.into(),
            last_event_id: String::new(),
            source,
            ports: Vec::new(),
        }
    }

    pub fn with_ports(
        mut self,
        ports: Vec<PortId>,
    ) -> Self {
        self.ports = ports;
        self
    }

    pub fn source_id(&self) -> Option<EndpointId> {
        self.source.as_ref().map(|s| s.id())
    }
}

impl fmt::Debug for MessageEvent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("MessageEvent")
            .field("data", &self.data)
            .field("origin", &self.origin)
            .field("last_event_id", &self.last_event_id)
            .field("source", &self.source_id())
            .field("ports", &self.ports)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// Тест проверяет правила сопоставления `targetOrigin`.
    #[test]
    fn test_origin_matches() {
        assert!(origin_matches("*", "https://a.example"));
        assert!(origin_matches("https://a.example", "https://a.example"));
        assert!(!origin_matches("https://a.example", "https://b.example"));
        assert!(!origin_matches("", "https://a.example"));
    }

    /// Тест проверяет, что идентификаторы уникальны.
    #[test]
    fn test_endpoint_ids_are_unique() {
        let a = EndpointId::next();
        let b = EndpointId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_message_event_debug_hides_source_handle() {
        let ev = MessageEvent::new(json!({"eventName": "x"}), "https://a.example", None)
            .with_ports(vec![PortId(7)]);
        let dbg = format!("{ev:?}");
        assert!(dbg.contains("https://a.example"));
        assert!(dbg.contains("PortId(7)"));
        assert_eq!(ev.source_id(), None);
    }
}
