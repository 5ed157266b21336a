use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления жизненным циклом логирования.
///
/// Держит guard неблокирующего writer-а: пока handle жив, фоновый поток
/// дописывает буфер в stdout.
pub struct LoggingHandle {
    guard: Option<WorkerGuard>,
    shutdown_in_progress: AtomicBool,
    /// Порог, после которого медленный flush сообщается в stderr
    flush_timeout: Duration,
}

impl LoggingHandle {
    pub fn new(guard: Option<WorkerGuard>) -> Self {
        Self {
            guard,
            shutdown_in_progress: AtomicBool::new(false),
            flush_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_flush_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn is_shutdown_in_progress(&self) -> bool {
        self.shutdown_in_progress.load(Ordering::Acquire)
    }

    /// Сбрасывает буферы и завершает фоновый writer.
    pub fn shutdown(mut self) {
        self.shutdown_in_progress.store(true, Ordering::Release);
        tracing::info!("Logging shutdown initiated");

        let start = Instant::now();
        drop(self.guard.take());
        let elapsed = start.elapsed();

        if elapsed > self.flush_timeout {
            eprintln!(
                "WARNING: logging shutdown took {}ms (timeout: {}ms)",
                elapsed.as_millis(),
                self.flush_timeout.as_millis()
            );
        }
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        if self.guard.is_some() && !self.is_shutdown_in_progress() {
            eprintln!(
                "WARNING: LoggingHandle dropped without explicit shutdown(). \
                 Buffered log lines are flushed, but call .shutdown() for graceful cleanup."
            );
        }
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("active", &self.guard.is_some())
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}
