//! Локальная доставка: вызов колбэков в текущем контексте, без транспорта.
//!
//! Падение одного колбэка не мешает остальным: паника перехватывается,
//! превращается в [`BusError::CallbackFailure`] и попадает в отчёт.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use dashmap::DashMap;
use serde_json::Value;
use tracing::error;

use crate::{transport::EndpointRef, BusError};

/// Локальный слушатель Agent-а. Получает полезную нагрузку и источник.
#[derive(Clone)]
pub struct LocalCallback(Arc<dyn Fn(&Value, Option<&EndpointRef>) + Send + Sync>);

impl LocalCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, Option<&EndpointRef>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(
        &self,
        payload: &Value,
        source: Option<&EndpointRef>,
    ) {
        (self.0)(payload, source)
    }

    pub fn ptr_eq(
        &self,
        other: &LocalCallback,
    ) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for LocalCallback {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for LocalCallback {}

impl fmt::Debug for LocalCallback {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "LocalCallback({:p})", self.addr())
    }
}

/// Итог одной доставки.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Сколько колбэков отработало без ошибок.
    pub delivered: usize,
    pub failed: Vec<BusError>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record(
        &mut self,
        outcome: Result<(), BusError>,
    ) {
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(err) => self.failed.push(err),
        }
    }
}

/// Текст паники, если он есть.
fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}

/// Вызывает `f`, перехватывая панику.
pub fn invoke_isolated<F>(
    event: &str,
    f: F,
) -> Result<(), BusError>
where
    F: FnOnce(),
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|panic| {
        let reason = panic_reason(panic.as_ref());
        error!(event, %reason, "Listener callback failed");
        BusError::CallbackFailure {
            event: event.to_string(),
            reason,
        }
    })
}

/// Локальные слушатели Agent-а: `eventName -> [LocalCallback]`, без
/// ограничения числа срабатываний.
#[derive(Debug, Default)]
pub struct LocalListeners {
    listeners: DashMap<String, Vec<LocalCallback>>,
}

impl LocalListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &self,
        event: &str,
        callback: LocalCallback,
    ) {
        self.listeners
            .entry(event.to_owned())
            .or_default()
            .push(callback);
    }

    /// Снимает указанный колбэк или, при `None`, всех слушателей события.
    pub fn remove(
        &self,
        event: &str,
        callback: Option<&LocalCallback>,
    ) -> usize {
        let Some(callback) = callback else {
            return self
                .listeners
                .remove(event)
                .map(|(_, list)| list.len())
                .unwrap_or(0);
        };

        let removed = {
            let Some(mut list) = self.listeners.get_mut(event) else {
                return 0;
            };
            let before = list.len();
            list.retain(|cb| !cb.ptr_eq(callback));
            before - list.len()
        };
        self.listeners.remove_if(event, |_, list| list.is_empty());
        removed
    }

    /// Вызывает всех слушателей события по порядку добавления.
    ///
    /// Блокировка реестра снимается до первого вызова, так что слушатель
    /// может сам добавлять и снимать слушателей.
    pub fn deliver(
        &self,
        event: &str,
        payload: &Value,
        source: Option<&EndpointRef>,
    ) -> DeliveryReport {
        let snapshot = match self.listeners.get(event) {
            Some(list) => list.clone(),
            None => return DeliveryReport::default(),
        };

        let mut report = DeliveryReport::default();
        for callback in &snapshot {
            report.record(invoke_isolated(event, || callback.call(payload, source)));
        }
        report
    }

    pub fn len(
        &self,
        event: &str,
    ) -> usize {
        self.listeners.get(event).map(|list| list.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.listeners.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    /// Тест проверяет, что паника превращается в `CallbackFailure` с
    /// текстом паники.
    #[test]
    fn test_invoke_isolated_catches_panic() {
        assert_eq!(invoke_isolated("ok", || {}), Ok(()));

        let err = invoke_isolated("boom", || panic!("listener exploded")).unwrap_err();
        assert_eq!(
            err,
            BusError::CallbackFailure {
                event: "boom".to_string(),
                reason: "listener exploded".to_string(),
            }
        );

        let err = invoke_isolated("fmt", || panic!("code {}", 7)).unwrap_err();
        assert!(err.to_string().contains("code 7"));
    }

    /// Тест проверяет, что упавший слушатель не мешает следующим.
    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let listeners = LocalListeners::new();
        let hits = Arc::new(AtomicUsize::new(0));

        listeners.add("e", LocalCallback::new(|_, _| panic!("first fails")));
        let h = hits.clone();
        listeners.add(
            "e",
            LocalCallback::new(move |_, _| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let report = listeners.deliver("e", &json!(null), None);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.attempted(), 2);
        assert!(!report.is_clean());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deliver_passes_payload_in_order() {
        let listeners = LocalListeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let sink = seen.clone();
            listeners.add(
                "e",
                LocalCallback::new(move |payload, source| {
                    assert!(source.is_none());
                    sink.lock().push((tag, payload.clone()));
                }),
            );
        }

        listeners.deliver("e", &json!({"n": 1}), None);
        assert_eq!(
            *seen.lock(),
            vec![("first", json!({"n": 1})), ("second", json!({"n": 1}))]
        );
        assert_eq!(listeners.deliver("other", &json!(1), None).attempted(), 0);
    }

    #[test]
    fn test_remove_single_and_all() {
        let listeners = LocalListeners::new();
        let a = LocalCallback::new(|_, _| {});
        let b = LocalCallback::new(|_, _| {});
        listeners.add("e", a.clone());
        listeners.add("e", b.clone());
        listeners.add("f", a.clone());

        assert_eq!(listeners.remove("e", Some(&a)), 1);
        assert_eq!(listeners.len("e"), 1);
        assert_eq!(listeners.remove("e", Some(&b)), 1);
        assert_eq!(listeners.event_names(), vec!["f"]);
        assert_eq!(listeners.remove("f", None), 1);
        assert!(listeners.is_empty());
    }

    /// Тест проверяет, что слушатель может добавить слушателя того же
    /// события во время доставки, не вызвав взаимоблокировку.
    #[test]
    fn test_reentrant_add_during_delivery() {
        let listeners = Arc::new(LocalListeners::new());
        let inner = listeners.clone();
        listeners.add(
            "e",
            LocalCallback::new(move |_, _| {
                inner.add("e", LocalCallback::new(|_, _| {}));
            }),
        );

        let report = listeners.deliver("e", &json!(1), None);
        assert_eq!(report.delivered, 1);
        assert_eq!(listeners.len("e"), 2);
    }
}
