use std::{fmt, sync::Arc};

use dashmap::DashMap;
use serde_json::Value;

use super::ExecutionBudget;

/// Колбэк подписчика Bus.
///
/// Клонирование дешёвое. Два `Callback` равны, если это клоны одного и того
/// же замыкания: именно так [`CallbackRegistry::detach`] находит, что снять.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&Value) + Send + Sync>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(
        &self,
        payload: &Value,
    ) {
        (self.0)(payload)
    }

    pub fn ptr_eq(
        &self,
        other: &Callback,
    ) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for Callback {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Callback({:p})", self.addr())
    }
}

/// Запись подписки на стороне Bus.
#[derive(Debug, Clone)]
pub struct CallbackRecord {
    pub callback: Callback,
    pub budget: ExecutionBudget,
    pub execution: u64,
}

impl CallbackRecord {
    pub fn new(
        callback: Callback,
        budget: ExecutionBudget,
    ) -> Self {
        Self {
            callback,
            budget,
            execution: 0,
        }
    }

    /// Засчитывает одну доставку. Возвращает `true`, если бюджет исчерпан.
    fn record_execution(&mut self) -> bool {
        self.execution += 1;
        self.budget.is_exhausted_after(self.execution)
    }
}

/// Результат [`CallbackRegistry::take_due`].
#[derive(Debug, Default)]
pub struct DueCallbacks {
    /// Колбэки к вызову, в порядке регистрации.
    pub callbacks: Vec<Callback>,
    /// Список записей стал пустым из-за исчерпания бюджета.
    pub emptied: bool,
}

/// Реестр колбэков Bus: `eventName -> [CallbackRecord]`.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    records: DashMap<String, Vec<CallbackRecord>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        event: &str,
        callback: Callback,
        budget: ExecutionBudget,
    ) {
        self.records
            .entry(event.to_owned())
            .or_default()
            .push(CallbackRecord::new(callback, budget));
    }

    /// Засчитывает входящую публикацию каждой записи `event` и снимает
    /// исчерпанные.
    ///
    /// Возвращает `None`, если на событие никто не подписан. Колбэки
    /// не вызываются: вызывающий делает это сам, уже без блокировки реестра.
    pub fn take_due(
        &self,
        event: &str,
    ) -> Option<DueCallbacks> {
        let due = {
            let mut list = self.records.get_mut(event)?;
            let mut due = DueCallbacks {
                callbacks: Vec::with_capacity(list.len()),
                emptied: false,
            };
            let before = list.len();
            list.retain_mut(|record| {
                due.callbacks.push(record.callback.clone());
                !record.record_execution()
            });
            due.emptied = before > 0 && list.len() < before && list.is_empty();
            due
        };

        if due.emptied {
            self.records.remove_if(event, |_, list| list.is_empty());
        }
        Some(due)
    }

    /// Снимает все записи события. Возвращает их количество.
    pub fn remove_all(
        &self,
        event: &str,
    ) -> usize {
        self.records
            .remove(event)
            .map(|(_, list)| list.len())
            .unwrap_or(0)
    }

    /// Снимает записи события с указанным колбэком.
    pub fn detach(
        &self,
        event: &str,
        callback: &Callback,
    ) -> usize {
        let removed = match self.records.get_mut(event) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|record| !record.callback.ptr_eq(callback));
                before - list.len()
            }
            None => return 0,
        };
        self.records.remove_if(event, |_, list| list.is_empty());
        removed
    }

    pub fn len(
        &self,
        event: &str,
    ) -> usize {
        self.records.get(event).map(|list| list.len()).unwrap_or(0)
    }

    /// Общее число записей по всем событиям.
    pub fn total(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Копия записей события (для диагностики и тестов).
    pub fn records(
        &self,
        event: &str,
    ) -> Vec<CallbackRecord> {
        self.records
            .get(event)
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}
