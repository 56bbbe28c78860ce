use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления жизненным циклом логирования.
///
/// Держит `WorkerGuard` файлового слоя: пока handle жив, фоновый поток
/// пишет логи на диск.
pub struct LoggingHandle {
    /// File guard (есть, если включена запись в файл)
    _file_guard: Option<WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingHandle {
    pub fn new(
        file_guard: Option<WorkerGuard>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            _file_guard: file_guard,
            log_dir,
        }
    }

    pub fn file_enabled(&self) -> bool {
        self._file_guard.is_some()
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Сбрасывает буфер файлового слоя и завершает его поток.
    pub fn shutdown(mut self) {
        if let Some(guard) = self._file_guard.take() {
            tracing::debug!(log_dir = ?self.log_dir, "Flushing file logs");
            drop(guard);
        }
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_enabled", &self.file_enabled())
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
