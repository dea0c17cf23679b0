// ============================================================================
// Notification Gate
// Per-doctrine throttling of low-stock alerts
// ============================================================================

use crate::engine::DoctrineGap;
use crate::utils::Clock;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Decides when a missing doctrine may be announced again
///
/// State is in memory only; a restart allows one extra notification.
pub struct NotificationGate {
    interval: Duration,
    clock: Arc<dyn Clock>,
    last_notified: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl NotificationGate {
    pub fn new(interval: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval: Duration::from_std(interval).unwrap_or(Duration::MAX),
            clock,
            last_notified: Mutex::new(HashMap::new()),
        }
    }

    /// True when `name` was never notified or strictly more than the interval ago
    pub fn should_notify(&self, name: &str) -> bool {
        let last_notified = self.last_notified.lock();
        self.is_due(&last_notified, name, self.clock.now())
    }

    pub fn mark_notified(&self, name: &str) {
        let now = self.clock.now();
        self.last_notified.lock().insert(name.to_string(), now);
    }

    pub fn mark_notified_all<'a, I>(&self, names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let now = self.clock.now();
        let mut last_notified = self.last_notified.lock();
        for name in names {
            last_notified.insert(name.to_string(), now);
        }
    }

    /// The whole batch when any gap is due, otherwise nothing
    pub fn select_batch(&self, gaps: &[DoctrineGap]) -> Vec<DoctrineGap> {
        let now = self.clock.now();
        let last_notified = self.last_notified.lock();
        if gaps
            .iter()
            .any(|gap| self.is_due(&last_notified, &gap.name, now))
        {
            gaps.to_vec()
        } else {
            Vec::new()
        }
    }

    pub fn last_notified(&self, name: &str) -> Option<DateTime<Utc>> {
        self.last_notified.lock().get(name).copied()
    }

    fn is_due(
        &self,
        last_notified: &HashMap<String, DateTime<Utc>>,
        name: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match last_notified.get(name) {
            Some(at) => now - *at > self.interval,
            None => true,
        }
    }
}
