//! Bus: клиент протокола внутри фрейма.
//!
//! Bus хранит колбэки с бюджетом выполнений, сообщает Agent-у о подписках
//! (SUBSCRIBE/UNSUBSCRIBE) и отправляет ему публикации. Agent-ом считается
//! родитель контекста, если его нет, то `top`, а для страницы верхнего
//! уровня сам контекст.

pub mod metrics;

use std::sync::{Arc, Weak};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
    local::{invoke_isolated, DeliveryReport},
    protocol::Envelope,
    registry::{Callback, CallbackRegistry, ExecutionBudget, IntoBudget, IntoEventNames},
    transport::{EndpointRef, ListenerId, MessageEvent, MessageHost, WILDCARD_ORIGIN},
    BusError,
};

pub use metrics::{BusMetrics, BusStats};

/// Настройки Bus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// `targetOrigin` для публикаций. SUBSCRIBE и UNSUBSCRIBE всегда
    /// отправляются с `"*"`.
    pub target_origin: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            target_origin: WILDCARD_ORIGIN.to_string(),
        }
    }
}

/// Фасад подписки и публикации для фрейма.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

struct BusInner {
    host: Arc<dyn MessageHost>,
    listener: ListenerId,
    agent: EndpointRef,
    config: BusConfig,
    callbacks: CallbackRegistry,
    metrics: BusMetrics,
}

impl Bus {
    pub fn new<H>(host: H) -> Result<Self, BusError>
    where
        H: MessageHost + 'static,
    {
        Self::with_config(host, BusConfig::default())
    }

    pub fn with_config<H>(
        host: H,
        config: BusConfig,
    ) -> Result<Self, BusError>
    where
        H: MessageHost + 'static,
    {
        if !host.supports_messaging() {
            warn!(origin = host.origin(), "Bus cannot start: messaging unsupported");
            return Err(BusError::UnsupportedEnvironment);
        }

        let agent = host
            .parent()
            .or_else(|| host.top())
            .unwrap_or_else(|| host.endpoint());

        let host: Arc<dyn MessageHost> = Arc::new(host);
        let inner = Arc::new_cyclic(|weak: &Weak<BusInner>| {
            let weak = weak.clone();
            let listener = host.add_message_listener(Arc::new(move |event: &MessageEvent| {
                if let Some(bus) = weak.upgrade() {
                    bus.dispatch(event);
                }
            }));
            BusInner {
                host,
                listener,
                agent,
                config,
                callbacks: CallbackRegistry::new(),
                metrics: BusMetrics::new(),
            }
        });

        debug!(
            origin = inner.host.origin(),
            agent = %inner.agent.id(),
            "Bus started"
        );
        Ok(Self { inner })
    }

    /// Подписывает колбэк без ограничения числа срабатываний.
    pub fn on<N, F>(
        &self,
        events: N,
        callback: F,
    ) -> Result<Callback, BusError>
    where
        N: IntoEventNames,
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.exactly(ExecutionBudget::Any, events, callback)
    }

    /// Колбэк сработает не больше одного раза.
    pub fn once<N, F>(
        &self,
        events: N,
        callback: F,
    ) -> Result<Callback, BusError>
    where
        N: IntoEventNames,
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.exactly(ExecutionBudget::ONCE, events, callback)
    }

    /// Колбэк сработает не больше `number` раз. `number` это неотрицательное
    /// целое или строка `"any"`; `0` означает «без ограничений».
    pub fn exactly<B, N, F>(
        &self,
        number: B,
        events: N,
        callback: F,
    ) -> Result<Callback, BusError>
    where
        B: IntoBudget,
        N: IntoEventNames,
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback = Callback::new(callback);
        self.register_listener(events, &callback, number)?;
        Ok(callback)
    }

    /// Регистрирует колбэк на одно или несколько событий и отправляет
    /// Agent-у по одному SUBSCRIBE на каждое имя.
    ///
    /// Аргументы проверяются целиком до первой регистрации: при ошибке
    /// ничего не меняется и ничего не отправляется.
    pub fn register_listener<N, B>(
        &self,
        events: N,
        callback: &Callback,
        number: B,
    ) -> Result<(), BusError>
    where
        N: IntoEventNames,
        B: IntoBudget,
    {
        let budget = number.into_budget()?;
        let names = events.into_event_names()?;

        for name in &names {
            self.inner.callbacks.register(name, callback.clone(), budget);
            self.inner
                .post(Envelope::subscribe(name.as_str()), WILDCARD_ORIGIN);
            self.inner.metrics.record_subscribe();
            debug!(event = %name, %budget, "Listener registered");
        }
        Ok(())
    }

    /// Обрабатывает одно входящее сообщение. Обычно вызывается обработчиком,
    /// установленным в конструкторе.
    pub fn dispatch(
        &self,
        event: &MessageEvent,
    ) -> DeliveryReport {
        self.inner.dispatch(event)
    }

    /// Снимает все колбэки события. Agent об этом не узнаёт.
    pub fn off(
        &self,
        event_name: &str,
    ) -> usize {
        self.inner.callbacks.remove_all(event_name)
    }

    /// Снимает колбэк события или, при `None`, все колбэки события.
    /// Agent об этом не узнаёт.
    pub fn detach(
        &self,
        event_name: &str,
        callback: Option<&Callback>,
    ) -> usize {
        match callback {
            Some(callback) => self.inner.callbacks.detach(event_name, callback),
            None => self.inner.callbacks.remove_all(event_name),
        }
    }

    /// Снимает все колбэки всех событий.
    pub fn detach_all(&self) -> usize {
        self.inner
            .callbacks
            .event_names()
            .iter()
            .map(|name| self.detach(name, None))
            .sum()
    }

    /// Отправляет PUBLISH: Agent разошлёт событие всем подписчикам.
    pub fn publish(
        &self,
        event_name: &str,
        payload: Value,
    ) {
        self.inner.post_data(Envelope::publish(event_name, payload));
    }

    /// Отправляет SEND_TO_AGENT: событие получат только локальные
    /// слушатели Agent-а.
    pub fn send_to_agent(
        &self,
        event_name: &str,
        payload: Value,
    ) {
        self.inner
            .post_data(Envelope::send_to_agent(event_name, payload));
    }

    /// Отправляет конверт без вида. Agent доставит его локальным
    /// слушателям так же, как SEND_TO_AGENT.
    pub fn publish_to_agent(
        &self,
        event_name: &str,
        payload: Value,
    ) {
        self.inner.post_data(Envelope::implicit(event_name, payload));
    }

    /// Явно сообщает Agent-у, что фрейм больше не слушает событие.
    /// Локальные колбэки не трогает.
    pub fn unsubscribe(
        &self,
        event_name: &str,
    ) {
        self.inner.announce_unsubscribe(event_name);
    }

    pub fn listener_count(
        &self,
        event_name: &str,
    ) -> usize {
        self.inner.callbacks.len(event_name)
    }

    pub fn event_names(&self) -> Vec<String> {
        self.inner.callbacks.event_names()
    }

    /// Конечная точка, которую Bus считает Agent-ом.
    pub fn agent_endpoint(&self) -> &EndpointRef {
        &self.inner.agent
    }

    pub fn stats(&self) -> BusStats {
        self.inner.metrics.get_stats()
    }
}

impl BusInner {
    fn post(
        &self,
        envelope: Envelope,
        target_origin: &str,
    ) {
        self.host
            .post_to(&self.agent, envelope.to_value(), target_origin);
    }

    fn post_data(
        &self,
        envelope: Envelope,
    ) {
        trace!(kind = %envelope.kind, event = ?envelope.event_name(), "Bus sending");
        self.post(envelope, &self.config.target_origin);
        self.metrics.record_published();
    }

    fn announce_unsubscribe(
        &self,
        event_name: &str,
    ) {
        self.post(Envelope::unsubscribe(event_name), WILDCARD_ORIGIN);
        self.metrics.record_unsubscribe();
        debug!(event = event_name, "Unsubscribe announced");
    }

    fn dispatch(
        &self,
        event: &MessageEvent,
    ) -> DeliveryReport {
        let envelope = match Envelope::from_value(&event.data) {
            Ok(envelope) => envelope,
            Err(err) => {
                trace!(origin = %event.origin, error = %err, "Bus ignored undecodable message");
                return DeliveryReport::default();
            }
        };

        if !envelope.kind.is_delivery() {
            trace!(kind = %envelope.kind, "Bus ignored control message");
            return DeliveryReport::default();
        }

        let name = envelope.event_name().unwrap_or_default();
        let Some(due) = self.callbacks.take_due(name) else {
            return DeliveryReport::default();
        };

        // Исчерпанные записи уже сняты; Agent узнаёт об этом до вызова
        // колбэков.
        if due.emptied {
            self.announce_unsubscribe(name);
        }

        let mut report = DeliveryReport::default();
        for callback in &due.callbacks {
            report.record(invoke_isolated(name, || callback.call(&envelope.payload)));
        }
        self.metrics
            .record_delivery(report.delivered, report.failed.len());
        report
    }
}

impl Drop for BusInner {
    fn drop(&mut self) {
        self.host.remove_message_listener(self.listener);
        trace!(origin = self.host.origin(), "Bus handler removed");
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("host", &self.inner.host)
            .field("agent", &self.inner.agent.id())
            .field("events", &self.inner.callbacks.event_names())
            .finish()
    }
}
