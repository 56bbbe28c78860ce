//! Agent: брокер событий в контексте страницы.
//!
//! Agent держит реестр удалённых подписчиков и пересылает им публикации.
//! Сообщения, адресованные самому Agent-у (`send-to-agent` и конверты без
//! вида), доставляются его локальным слушателям.

pub mod metrics;

use std::sync::{Arc, Weak};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    local::{DeliveryReport, LocalCallback, LocalListeners},
    protocol::{Envelope, MessageKind},
    registry::{SubscriptionRecord, SubscriptionRegistry},
    transport::{EndpointRef, ListenerId, MessageEvent, MessageHost, WILDCARD_ORIGIN},
    BusError,
};

pub use metrics::{AgentMetrics, AgentStats};

/// Настройки Agent-а.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// `targetOrigin` для [`Agent::publish`].
    pub target_origin: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            target_origin: WILDCARD_ORIGIN.to_string(),
        }
    }
}

/// Что Agent сделал с входящим сообщением.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAction {
    Subscribed,
    Unsubscribed { removed: usize },
    Forwarded { recipients: usize },
    Local(DeliveryReport),
    Dropped,
}

/// Брокер событий. Клонирование дешёвое, клоны разделяют состояние.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    host: Arc<dyn MessageHost>,
    listener: ListenerId,
    config: AgentConfig,
    subscriptions: SubscriptionRegistry,
    local: LocalListeners,
    metrics: AgentMetrics,
}

impl Agent {
    /// Создаёт Agent и один раз устанавливает обработчик входящих сообщений
    /// контекста.
    pub fn new<H>(host: H) -> Result<Self, BusError>
    where
        H: MessageHost + 'static,
    {
        Self::with_config(host, AgentConfig::default())
    }

    pub fn with_config<H>(
        host: H,
        config: AgentConfig,
    ) -> Result<Self, BusError>
    where
        H: MessageHost + 'static,
    {
        if !host.supports_messaging() {
            warn!(origin = host.origin(), "Agent cannot start: messaging unsupported");
            return Err(BusError::UnsupportedEnvironment);
        }

        let host: Arc<dyn MessageHost> = Arc::new(host);
        let inner = Arc::new_cyclic(|weak: &Weak<AgentInner>| {
            let weak = weak.clone();
            let listener = host.add_message_listener(Arc::new(move |event: &MessageEvent| {
                if let Some(agent) = weak.upgrade() {
                    agent.dispatch(event);
                }
            }));
            AgentInner {
                host,
                listener,
                config,
                subscriptions: SubscriptionRegistry::new(),
                local: LocalListeners::new(),
                metrics: AgentMetrics::new(),
            }
        });

        debug!(origin = inner.host.origin(), endpoint = %inner.host.id(), "Agent started");
        Ok(Self { inner })
    }

    /// Обрабатывает одно входящее сообщение. Обычно вызывается обработчиком,
    /// установленным в конструкторе.
    pub fn dispatch(
        &self,
        event: &MessageEvent,
    ) -> AgentAction {
        self.inner.dispatch(event)
    }

    /// Регистрирует удалённого подписчика. Дубликаты не отсеиваются.
    pub fn add_listener(
        &self,
        event_name: &str,
        origin: &str,
        source: EndpointRef,
    ) {
        self.inner.subscriptions.add(SubscriptionRecord {
            event_name: event_name.to_string(),
            origin: origin.to_string(),
            source,
            last_event_id: String::new(),
            ports: Vec::new(),
        });
    }

    /// Снимает все записи подписчика на событие.
    pub fn remove_listener(
        &self,
        event_name: &str,
        origin: &str,
        source: &EndpointRef,
    ) -> usize {
        self.inner.subscriptions.remove(event_name, origin, source)
    }

    /// Рассылает `{eventName, payload}` всем подписчикам события.
    pub fn forward(
        &self,
        event_name: &str,
        payload: &Value,
    ) -> usize {
        self.inner.forward(event_name, payload)
    }

    /// Добавляет локального слушателя.
    pub fn on<F>(
        &self,
        event_name: &str,
        callback: F,
    ) -> LocalCallback
    where
        F: Fn(&Value, Option<&EndpointRef>) + Send + Sync + 'static,
    {
        let callback = LocalCallback::new(callback);
        self.inner.local.add(event_name, callback.clone());
        callback
    }

    /// Снимает всех локальных слушателей события.
    pub fn off(
        &self,
        event_name: &str,
    ) -> usize {
        self.inner.local.remove(event_name, None)
    }

    /// Снимает одного локального слушателя.
    pub fn off_callback(
        &self,
        event_name: &str,
        callback: &LocalCallback,
    ) -> usize {
        self.inner.local.remove(event_name, Some(callback))
    }

    /// Публикует событие через собственный контекст: PUBLISH вернётся к
    /// Agent-у и будет разослан подписчикам.
    pub fn publish(
        &self,
        event_name: &str,
        payload: Value,
    ) {
        let host = &self.inner.host;
        host.post_to(
            &host.endpoint(),
            Envelope::publish(event_name, payload).to_value(),
            &self.inner.config.target_origin,
        );
    }

    /// Синхронно вызывает локальных слушателей. Источником считается сам
    /// Agent.
    pub fn publish_local(
        &self,
        event_name: &str,
        payload: &Value,
    ) -> DeliveryReport {
        let source = self.inner.host.endpoint();
        self.inner.deliver_local(event_name, payload, Some(&source))
    }

    /// Число удалённых подписок на событие (с дубликатами).
    pub fn listener_count(
        &self,
        event_name: &str,
    ) -> usize {
        self.inner.subscriptions.len(event_name)
    }

    pub fn local_listener_count(
        &self,
        event_name: &str,
    ) -> usize {
        self.inner.local.len(event_name)
    }

    /// События, на которые есть удалённые подписки.
    pub fn event_names(&self) -> Vec<String> {
        self.inner.subscriptions.event_names()
    }

    pub fn subscriptions(
        &self,
        event_name: &str,
    ) -> Vec<SubscriptionRecord> {
        self.inner.subscriptions.snapshot(event_name)
    }

    pub fn endpoint(&self) -> EndpointRef {
        self.inner.host.endpoint()
    }

    pub fn origin(&self) -> &str {
        self.inner.host.origin()
    }

    pub fn stats(&self) -> AgentStats {
        self.inner.metrics.get_stats()
    }
}

impl AgentInner {
    fn dispatch(
        &self,
        event: &MessageEvent,
    ) -> AgentAction {
        let envelope = match Envelope::from_value(&event.data) {
            Ok(envelope) => envelope,
            Err(err) => {
                trace!(origin = %event.origin, error = %err, "Agent ignored undecodable message");
                self.metrics.record_dropped();
                return AgentAction::Dropped;
            }
        };

        match (envelope.kind, envelope.event_name()) {
            (MessageKind::Subscribe, Some(name)) => {
                let Some(record) = SubscriptionRecord::from_event(name, event) else {
                    trace!(event = name, "SUBSCRIBE without source dropped");
                    self.metrics.record_dropped();
                    return AgentAction::Dropped;
                };
                debug!(event = name, origin = %event.origin, source = ?event.source_id(), "Subscribed");
                self.subscriptions.add(record);
                self.metrics.record_subscribe();
                AgentAction::Subscribed
            }
            (MessageKind::Unsubscribe, Some(name)) => {
                let Some(source) = event.source.as_ref() else {
                    trace!(event = name, "UNSUBSCRIBE without source dropped");
                    self.metrics.record_dropped();
                    return AgentAction::Dropped;
                };
                let removed = self.subscriptions.remove(name, &event.origin, source);
                debug!(event = name, origin = %event.origin, removed, "Unsubscribed");
                self.metrics.record_unsubscribe();
                AgentAction::Unsubscribed { removed }
            }
            (MessageKind::Publish, Some(name)) => {
                let recipients = self.forward(name, &envelope.payload);
                self.metrics.record_publish(recipients);
                AgentAction::Forwarded { recipients }
            }
            (MessageKind::SendToAgent, Some(name)) => {
                let report = self.deliver_local(name, &envelope.payload, event.source.as_ref());
                AgentAction::Local(report)
            }
            (MessageKind::Implicit, Some(name)) if !name.is_empty() => {
                let report = self.deliver_local(name, &envelope.payload, event.source.as_ref());
                AgentAction::Local(report)
            }
            (kind, name) => {
                trace!(%kind, event = ?name, "Agent ignored message without a usable event name");
                self.metrics.record_dropped();
                AgentAction::Dropped
            }
        }
    }

    fn forward(
        &self,
        event_name: &str,
        payload: &Value,
    ) -> usize {
        let recipients = self.subscriptions.snapshot(event_name);
        if recipients.is_empty() {
            trace!(event = event_name, "No subscribers to forward to");
            return 0;
        }

        let data = Envelope::implicit(event_name, payload.clone()).to_value();
        for record in &recipients {
            self.host
                .post_to(&record.source, data.clone(), &record.origin);
        }
        debug!(event = event_name, recipients = recipients.len(), "Forwarded");
        recipients.len()
    }

    fn deliver_local(
        &self,
        event_name: &str,
        payload: &Value,
        source: Option<&EndpointRef>,
    ) -> DeliveryReport {
        let report = self.local.deliver(event_name, payload, source);
        self.metrics
            .record_local(report.delivered, report.failed.len());
        report
    }
}

impl Drop for AgentInner {
    fn drop(&mut self) {
        self.host.remove_message_listener(self.listener);
        trace!(origin = self.host.origin(), "Agent handler removed");
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("host", &self.inner.host)
            .field("subscriptions", &self.inner.subscriptions.event_names())
            .field("local", &self.inner.local.event_names())
            .finish()
    }
}
