//! Notification read-state reconciliation.
//!
//! The server feed carries no stable ids, so each record is identified by a
//! derived key `type|eventId|at`. Read state is a plain set of those keys owned
//! by the caller: it goes in, a new set comes out, nothing is persisted here.

use crate::types::NotificationRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Set of dedup keys the client has marked read.
///
/// Ordered so serialized sets are stable across runs.
pub type ReadKeys = BTreeSet<String>;

/// Derives the identity key for a notification.
///
/// A missing event id renders as an empty segment, so `"welcome||<at>"`.
#[must_use]
pub fn dedup_key(record: &NotificationRecord) -> String {
    let event = record
        .event_id
        .map(|id| id.to_string())
        .unwrap_or_default();
    format!("{}|{}|{}", record.kind, event, record.at.to_rfc3339())
}

/// A feed record annotated with its read flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledNotification {
    /// The record as delivered
    #[serde(flatten)]
    pub record: NotificationRecord,
    /// Derived identity
    pub key: String,
    /// Whether `key` is in the read set
    pub read: bool,
}

/// Reconciled view of the feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    /// Items in feed order
    pub items: Vec<ReconciledNotification>,
    /// Items with `read == false`
    pub unread_count: usize,
}

/// Merges the feed with the read set.
///
/// Feed order is kept as delivered. Records sharing a key collapse to the
/// first occurrence.
#[must_use]
pub fn reconcile(records: &[NotificationRecord], read_keys: &ReadKeys) -> NotificationView {
    let mut seen = HashSet::with_capacity(records.len());
    let items: Vec<ReconciledNotification> = records
        .iter()
        .filter_map(|record| {
            let key = dedup_key(record);
            if !seen.insert(key.clone()) {
                return None;
            }
            let read = read_keys.contains(&key);
            Some(ReconciledNotification {
                record: record.clone(),
                key,
                read,
            })
        })
        .collect();

    let unread_count = items.iter().filter(|item| !item.read).count();
    NotificationView {
        items,
        unread_count,
    }
}

/// Union of `read_keys` and `keys`.
#[must_use]
pub fn mark_read<I, S>(read_keys: &ReadKeys, keys: I) -> ReadKeys
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut merged = read_keys.clone();
    merged.extend(keys.into_iter().map(Into::into));
    merged
}

/// Union of `read_keys` and every visible item's key.
#[must_use]
pub fn mark_all_read(read_keys: &ReadKeys, items: &[ReconciledNotification]) -> ReadKeys {
    mark_read(read_keys, items.iter().map(|item| item.key.clone()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::EventId;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn record(kind: &str, event: Option<EventId>, minutes: i64) -> NotificationRecord {
        NotificationRecord {
            kind: kind.to_string(),
            event_id: event,
            at: at(minutes),
            message: format!("{kind} at {minutes}"),
        }
    }

    #[test]
    fn test_dedup_key_shape() {
        let event = EventId::new();
        let key = dedup_key(&record("registration_confirmed", Some(event), 0));
        assert_eq!(
            key,
            format!("registration_confirmed|{event}|2025-06-01T10:00:00+00:00")
        );
        assert_eq!(dedup_key(&record("welcome", None, 0)), "welcome||2025-06-01T10:00:00+00:00");
    }

    #[test]
    fn test_reconcile_keeps_feed_order_and_counts_unread() {
        let event = EventId::new();
        let feed = vec![
            record("event_completed", Some(event), 30),
            record("registration_confirmed", Some(event), 10),
            record("welcome", None, 0),
        ];
        let read = mark_read(&ReadKeys::new(), [dedup_key(&feed[1])]);

        let view = reconcile(&feed, &read);
        let kinds: Vec<&str> = view.items.iter().map(|item| item.record.kind.as_str()).collect();
        assert_eq!(kinds, ["event_completed", "registration_confirmed", "welcome"]);
        assert_eq!(view.unread_count, 2);
        assert!(view.items[1].read);
    }

    #[test]
    fn test_duplicate_records_collapse() {
        let event = EventId::new();
        let mut duplicate = record("reminder", Some(event), 5);
        duplicate.message = "different text".to_string();
        let feed = vec![record("reminder", Some(event), 5), duplicate];

        let view = reconcile(&feed, &ReadKeys::new());
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].record.message, "reminder at 5");
        assert_eq!(view.unread_count, 1);
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let once = mark_read(&ReadKeys::new(), ["a", "b"]);
        let twice = mark_read(&once, ["a"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_feed() {
        let view = reconcile(&[], &mark_read(&ReadKeys::new(), ["stale"]));
        assert!(view.items.is_empty());
        assert_eq!(view.unread_count, 0);
    }

    #[test]
    fn test_serialized_item_shape() {
        let view = reconcile(&[record("welcome", None, 0)], &ReadKeys::new());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["unread_count"], 1);
        assert_eq!(json["items"][0]["type"], "welcome");
        assert_eq!(json["items"][0]["read"], false);
    }
}
