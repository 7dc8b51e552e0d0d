//! Progress and health reporting
//!
//! A [`RunMonitor`] is shared by every builder of a run. It forwards
//! progress to a [`ProgressSink`] and holds the run health, which only ever
//! gets worse.

use crate::domain::Health;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Receiver of progress and health updates
pub trait ProgressSink: Send + Sync {
    /// Percentage of the current pass and the entity being processed
    fn progress(&self, percent: u8, label: &str);

    /// Called when the run health changes
    fn health_changed(&self, _health: Health) {}
}

/// Sink writing progress to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn progress(&self, percent: u8, label: &str) {
        tracing::trace!(progress_pct = percent, entity = %label, "Progress");
    }

    fn health_changed(&self, health: Health) {
        tracing::info!(health = %health, "Run health changed");
    }
}

/// Shared progress and health holder
pub struct RunMonitor {
    sink: Arc<dyn ProgressSink>,
    health: AtomicU8,
}

impl RunMonitor {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            health: AtomicU8::new(Health::Ok.as_u8()),
        }
    }

    /// Monitor logging through `tracing`
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingProgressSink))
    }

    /// Reports `current` out of `total` entities
    pub fn progress(&self, current: usize, total: usize, label: &str) {
        let percent = if total == 0 {
            100
        } else {
            (current.min(total) * 100 / total) as u8
        };
        self.sink.progress(percent, label);
    }

    /// Worsens the run health, returns the resulting value
    pub fn degrade(&self, health: Health) -> Health {
        let previous = Health::from_u8(self.health.fetch_max(health.as_u8(), Ordering::SeqCst));
        let current = previous.worsen(health);
        if current != previous {
            self.sink.health_changed(current);
        }
        current
    }

    pub fn health(&self) -> Health {
        Health::from_u8(self.health.load(Ordering::SeqCst))
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::tracing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        progress: Mutex<Vec<(u8, String)>>,
        health: Mutex<Vec<Health>>,
    }

    impl ProgressSink for RecordingSink {
        fn progress(&self, percent: u8, label: &str) {
            self.progress.lock().unwrap().push((percent, label.to_string()));
        }

        fn health_changed(&self, health: Health) {
            self.health.lock().unwrap().push(health);
        }
    }

    #[test]
    fn test_health_only_worsens() {
        let sink = Arc::new(RecordingSink::default());
        let monitor = RunMonitor::new(sink.clone());

        assert_eq!(monitor.health(), Health::Ok);
        assert_eq!(monitor.degrade(Health::Warn), Health::Warn);
        assert_eq!(monitor.degrade(Health::Ok), Health::Warn);
        assert_eq!(monitor.degrade(Health::Fatal), Health::Fatal);
        assert_eq!(monitor.degrade(Health::Warn), Health::Fatal);
        assert_eq!(monitor.health(), Health::Fatal);

        assert_eq!(*sink.health.lock().unwrap(), vec![Health::Warn, Health::Fatal]);
    }

    #[test]
    fn test_progress_percent() {
        let sink = Arc::new(RecordingSink::default());
        let monitor = RunMonitor::new(sink.clone());

        monitor.progress(1, 4, "a");
        monitor.progress(4, 4, "b");
        monitor.progress(0, 0, "c");

        let progress = sink.progress.lock().unwrap();
        assert_eq!(progress[0], (25, "a".to_string()));
        assert_eq!(progress[1], (100, "b".to_string()));
        assert_eq!(progress[2], (100, "c".to_string()));
    }
}
