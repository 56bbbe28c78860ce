use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::RwLock;
use tracing::trace;

use super::{
    event_loop::{EventLoop, Task},
    origin_matches, Endpoint, EndpointId, EndpointRef, ListenerId, MessageEvent, MessageHandler,
    MessageHost,
};

/// Внутрипроцессный контекст просмотра: страница или фрейм.
///
/// Клонирование дешёвое, клоны указывают на один и тот же контекст.
/// Фрейм держит сильную ссылку на родителя, родитель на фреймы не ссылается.
#[derive(Clone)]
pub struct Window {
    inner: Arc<WindowInner>,
}

/// Слабая ссылка на [`Window`], не продлевающая ему жизнь.
#[derive(Clone)]
pub struct WeakWindow(Weak<WindowInner>);

pub(crate) struct WindowInner {
    id: EndpointId,
    origin: String,
    parent: Option<Window>,
    event_loop: EventLoop,
    listeners: RwLock<Vec<(ListenerId, MessageHandler)>>,
    next_listener: AtomicU64,
    messaging: bool,
    rejected: AtomicU64,
}

/// Построитель окна для нестандартных случаев (например, контекст без
/// поддержки обмена сообщениями).
pub struct WindowBuilder {
    event_loop: EventLoop,
    origin: String,
    parent: Option<Window>,
    messaging: bool,
}

impl WindowBuilder {
    pub fn origin(
        mut self,
        origin: impl Into<String>,
    ) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn parent(
        mut self,
        parent: &Window,
    ) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Выключает примитив обмена сообщениями: такой контекст ничего не
    /// принимает, а Agent и Bus в нём не создаются.
    pub fn messaging(
        mut self,
        enabled: bool,
    ) -> Self {
        self.messaging = enabled;
        self
    }

    pub fn build(self) -> Window {
        Window {
            inner: Arc::new(WindowInner {
                id: EndpointId::next(),
                origin: self.origin,
                parent: self.parent,
                event_loop: self.event_loop,
                listeners: RwLock::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                messaging: self.messaging,
                rejected: AtomicU64::new(0),
            }),
        }
    }
}

impl Window {
    /// Создаёт контекст верхнего уровня.
    pub fn new(
        event_loop: &EventLoop,
        origin: impl Into<String>,
    ) -> Self {
        Self::builder(event_loop).origin(origin).build()
    }

    pub fn builder(event_loop: &EventLoop) -> WindowBuilder {
        WindowBuilder {
            event_loop: event_loop.clone(),
            origin: String::new(),
            parent: None,
            messaging: true,
        }
    }

    /// Встраивает дочерний фрейм с указанным origin.
    pub fn create_frame(
        &self,
        origin: impl Into<String>,
    ) -> Window {
        Self::builder(&self.inner.event_loop)
            .origin(origin)
            .parent(self)
            .build()
    }

    pub fn downgrade(&self) -> WeakWindow {
        WeakWindow(Arc::downgrade(&self.inner))
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    pub fn parent_window(&self) -> Option<&Window> {
        self.inner.parent.as_ref()
    }

    /// Корень цепочки родителей. Для страницы верхнего уровня это `None`.
    pub fn top_window(&self) -> Option<&Window> {
        let mut current = self.inner.parent.as_ref()?;
        while let Some(parent) = current.inner.parent.as_ref() {
            current = parent;
        }
        Some(current)
    }

    pub fn is_top_level(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Сколько сообщений отброшено из-за несовпадения `targetOrigin`.
    pub fn rejected_count(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl WeakWindow {
    pub fn upgrade(&self) -> Option<Window> {
        self.0.upgrade().map(|inner| Window { inner })
    }
}

impl WindowInner {
    /// Отдаёт событие всем обработчикам по порядку установки.
    pub(crate) fn deliver(
        &self,
        event: &MessageEvent,
    ) {
        // Обработчики могут добавлять новых слушателей, поэтому работаем с
        // копией списка.
        let listeners: Vec<MessageHandler> = self
            .listeners
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl Endpoint for Window {
    fn id(&self) -> EndpointId {
        self.inner.id
    }

    fn post_message(
        &self,
        event: MessageEvent,
        target_origin: &str,
    ) {
        if !self.inner.messaging {
            trace!(target = %self.inner.id, "Messaging disabled, message dropped");
            return;
        }
        if !origin_matches(target_origin, &self.inner.origin) {
            self.inner.rejected.fetch_add(1, Ordering::Relaxed);
            trace!(
                target = %self.inner.id,
                target_origin,
                receiver_origin = %self.inner.origin,
                "Target origin mismatch, message dropped"
            );
            return;
        }
        self.inner.event_loop.enqueue(Task {
            target: Arc::downgrade(&self.inner),
            event,
        });
    }
}

impl MessageHost for Window {
    fn origin(&self) -> &str {
        &self.inner.origin
    }

    fn endpoint(&self) -> EndpointRef {
        Arc::new(self.clone())
    }

    fn parent(&self) -> Option<EndpointRef> {
        self.parent_window()
            .map(|parent| Arc::new(parent.clone()) as EndpointRef)
    }

    fn top(&self) -> Option<EndpointRef> {
        self.top_window()
            .map(|top| Arc::new(top.clone()) as EndpointRef)
    }

    fn add_message_listener(
        &self,
        handler: MessageHandler,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, handler));
        id
    }

    fn remove_message_listener(
        &self,
        id: ListenerId,
    ) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() < before
    }

    fn supports_messaging(&self) -> bool {
        self.inner.messaging
    }
}

impl fmt::Debug for Window {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.inner.id)
            .field("origin", &self.inner.origin)
            .field("parent", &self.inner.parent.as_ref().map(|p| p.inner.id))
            .finish()
    }
}
