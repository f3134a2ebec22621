//! Notification dedup store: remembers which events were already reminded.

use std::collections::HashMap;

use calbot_core::config::{CompactionPolicy, DedupConfig};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NotifiedEntry {
    notified_at: DateTime<Utc>,
    starts_at: DateTime<Utc>,
}

/// Keyed by event id. Owned by the reminder loop, so no locking.
#[derive(Debug)]
pub struct NotificationDeduplicator {
    entries: HashMap<String, NotifiedEntry>,
    policy: CompactionPolicy,
    ceiling: usize,
    margin: Duration,
}

impl NotificationDeduplicator {
    pub fn new(policy: CompactionPolicy, ceiling: usize, margin: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
            ceiling: ceiling.max(1),
            margin,
        }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(config.policy, config.ceiling, Duration::seconds(config.expiry_margin_secs))
    }

    pub fn should_notify(&self, id: &str) -> bool {
        !self.entries.contains_key(id)
    }

    /// Record a delivery attempt. Marking twice keeps the first record.
    pub fn mark_notified(&mut self, id: &str, starts_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.entries
            .entry(id.to_string())
            .or_insert(NotifiedEntry { notified_at: now, starts_at });
    }

    /// Shrink the store according to the policy. Returns how many entries
    /// were evicted.
    pub fn maybe_compact(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        match self.policy {
            CompactionPolicy::ClearAll => {
                if before > self.ceiling {
                    self.entries.clear();
                }
            }
            CompactionPolicy::Expiry => {
                let margin = self.margin;
                self.entries.retain(|_, entry| entry.starts_at + margin >= now);
                if self.entries.len() > self.ceiling {
                    let mut by_age: Vec<(String, DateTime<Utc>)> = self.entries
                        .iter()
                        .map(|(id, entry)| (id.clone(), entry.notified_at))
                        .collect();
                    by_age.sort_by_key(|(_, notified_at)| *notified_at);
                    let excess = self.entries.len() - self.ceiling;
                    for (id, _) in by_age.into_iter().take(excess) {
                        self.entries.remove(&id);
                    }
                }
            }
        }

        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!("Dedup compaction evicted {evicted} entries ({} kept)", self.entries.len());
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationDeduplicator {
    fn default() -> Self {
        Self::from_config(&DedupConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 15, 10, minute, 0).unwrap()
    }

    #[test]
    fn test_mark_then_skip() {
        let mut dedup = NotificationDeduplicator::default();
        assert!(dedup.should_notify("e1"));
        dedup.mark_notified("e1", t(10), t(0));
        assert!(!dedup.should_notify("e1"));
        assert!(dedup.should_notify("e2"));
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut dedup = NotificationDeduplicator::default();
        dedup.mark_notified("e1", t(10), t(0));
        dedup.mark_notified("e1", t(10), t(1));
        assert_eq!(dedup.len(), 1);
        assert!(!dedup.should_notify("e1"));
    }

    #[test]
    fn test_clear_all_above_ceiling() {
        let mut dedup = NotificationDeduplicator::new(CompactionPolicy::ClearAll, 100, Duration::zero());
        for i in 0..100 {
            dedup.mark_notified(&format!("e{i}"), t(10), t(0));
        }
        assert_eq!(dedup.maybe_compact(t(0)), 0);
        assert_eq!(dedup.len(), 100);

        dedup.mark_notified("e100", t(10), t(0));
        assert_eq!(dedup.maybe_compact(t(0)), 101);
        assert!(dedup.is_empty());
        assert!(dedup.should_notify("e0"));
    }

    #[test]
    fn test_expiry_evicts_started_events() {
        let mut dedup = NotificationDeduplicator::new(CompactionPolicy::Expiry, 100, Duration::minutes(1));
        dedup.mark_notified("past", t(10), t(0));
        dedup.mark_notified("future", t(30), t(20));

        assert_eq!(dedup.maybe_compact(t(11)), 0);
        assert_eq!(dedup.maybe_compact(t(12)), 1);
        assert!(dedup.should_notify("past"));
        assert!(!dedup.should_notify("future"));
    }

    #[test]
    fn test_expiry_ceiling_drops_oldest_notified() {
        let mut dedup = NotificationDeduplicator::new(CompactionPolicy::Expiry, 2, Duration::zero());
        dedup.mark_notified("a", t(50), t(1));
        dedup.mark_notified("b", t(50), t(2));
        dedup.mark_notified("c", t(50), t(3));

        assert_eq!(dedup.maybe_compact(t(5)), 1);
        assert_eq!(dedup.len(), 2);
        assert!(dedup.should_notify("a"));
        assert!(!dedup.should_notify("b"));
        assert!(!dedup.should_notify("c"));
    }
}
