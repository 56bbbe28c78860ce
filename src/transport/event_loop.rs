use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tracing::trace;

use super::{window::WindowInner, MessageEvent};

/// Одна отложенная доставка: кому и что.
pub(crate) struct Task {
    pub(crate) target: Weak<WindowInner>,
    pub(crate) event: MessageEvent,
}

/// Очередь задач, общая для группы контекстов (страница и её фреймы).
///
/// Сообщения доставляются строго по одному: обработчик получает событие,
/// отрабатывает до конца, и только потом берётся следующее. Всё, что
/// обработчики отправляют в процессе, встаёт в конец очереди.
#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<LoopInner>,
}

struct LoopInner {
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<mpsc::UnboundedReceiver<Task>>,
    wake: Notify,
    queued: AtomicU64,
    delivered: AtomicU64,
    orphaned: AtomicU64,
}

/// Счётчики цикла событий.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventLoopStats {
    /// Сколько задач было поставлено в очередь.
    pub queued: u64,
    /// Сколько задач доставлено живым получателям.
    pub delivered: u64,
    /// Получатель был уничтожен до доставки.
    pub orphaned: u64,
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(LoopInner {
                tx,
                rx: Mutex::new(rx),
                wake: Notify::new(),
                queued: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                orphaned: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn enqueue(
        &self,
        task: Task,
    ) {
        // Приёмник живёт столько же, сколько и отправитель, ошибки быть не может.
        if self.inner.tx.send(task).is_ok() {
            self.inner.queued.fetch_add(1, Ordering::Relaxed);
            self.inner.wake.notify_one();
        }
    }

    /// Выполняет одну задачу. Возвращает `false`, если очередь пуста.
    pub fn turn(&self) -> bool {
        // Замок отпускается до вызова обработчиков: они сами ставят задачи.
        let task = match self.inner.rx.lock().try_recv() {
            Ok(task) => task,
            Err(_) => return false,
        };

        match task.target.upgrade() {
            Some(window) => {
                self.inner.delivered.fetch_add(1, Ordering::Relaxed);
                window.deliver(&task.event);
            }
            None => {
                self.inner.orphaned.fetch_add(1, Ordering::Relaxed);
                trace!(origin = %task.event.origin, "Target context is gone, message dropped");
            }
        }
        true
    }

    /// Крутит цикл, пока очередь не опустеет. Возвращает число выполненных
    /// задач.
    pub fn run_until_idle(&self) -> usize {
        let mut turns = 0;
        while self.turn() {
            turns += 1;
        }
        turns
    }

    /// Как [`run_until_idle`](Self::run_until_idle), но не больше `max_turns`
    /// задач. Полезно против бесконечного эха.
    pub fn run_bounded(
        &self,
        max_turns: usize,
    ) -> usize {
        let mut turns = 0;
        while turns < max_turns && self.turn() {
            turns += 1;
        }
        turns
    }

    /// Асинхронно обслуживает очередь, пока не завершится `shutdown`.
    pub async fn run_until<F>(
        &self,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            self.run_until_idle();
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.inner.wake.notified() => {}
            }
        }
        self.run_until_idle();
    }

    /// Сколько задач ждёт в очереди.
    pub fn pending(&self) -> usize {
        self.inner.rx.lock().len()
    }

    pub fn stats(&self) -> EventLoopStats {
        EventLoopStats {
            queued: self.inner.queued.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            orphaned: self.inner.orphaned.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
