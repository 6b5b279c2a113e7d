//! Time-windowed analytics over registration and event records.
//!
//! All figures are computed from snapshots passed in by value. Nothing here
//! caches or keeps running totals; a dashboard asks again with a new range.
//!
//! # Range semantics
//!
//! A [`DateRange`] is inclusive on both sides. The end day is covered in full,
//! so `end = 2025-03-10` accepts `2025-03-10T23:59:59.999Z`. Missing bounds are
//! open. Days are taken from the stored UTC timestamp as-is.

use crate::types::{AnalyticsBucket, Event, Registration, RegistrationStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many events `aggregate_by_event` returns unless told otherwise.
pub const DEFAULT_TOP_N: usize = 10;

/// Day key format used in by-day buckets.
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar-day window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// Last day included, through its final millisecond
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded on both sides
    pub const ALL: Self = Self {
        start: None,
        end: None,
    };

    /// Creates a new `DateRange`
    #[must_use]
    pub const fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Whether `timestamp` falls inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        // Day granularity, so the end day is covered through its last instant.
        let day = timestamp.date_naive();
        self.start.is_none_or(|start| day >= start) && self.end.is_none_or(|end| day <= end)
    }

    /// Whether the start is after the end. Such a range matches nothing.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }
}

/// Free-function form of [`DateRange::contains`].
#[must_use]
pub fn in_range(timestamp: DateTime<Utc>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    DateRange::new(start, end).contains(timestamp)
}

/// Anything with a timestamp that analytics can bucket.
pub trait AnalyticsRecord {
    /// The instant the record is filed under
    fn timestamp(&self) -> DateTime<Utc>;
}

impl AnalyticsRecord for Registration {
    fn timestamp(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

impl AnalyticsRecord for Event {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl<T: AnalyticsRecord + ?Sized> AnalyticsRecord for &T {
    fn timestamp(&self) -> DateTime<Utc> {
        (**self).timestamp()
    }
}

/// Counts records per day, ascending by day.
#[must_use]
pub fn aggregate_by_day<R: AnalyticsRecord>(records: &[R], range: DateRange) -> Vec<AnalyticsBucket> {
    let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for timestamp in records.iter().map(AnalyticsRecord::timestamp) {
        if range.contains(timestamp) {
            *days.entry(timestamp.date_naive()).or_default() += 1;
        }
    }
    days.into_iter()
        .map(|(day, count)| AnalyticsBucket::new(day.format(DAY_FORMAT).to_string(), count))
        .collect()
}

/// Active registrations per event title, highest first, capped at `top_n`.
///
/// Only rows with `status == registered` and `registered_at` inside the range
/// count. Events sharing a title share a bucket. Titles with no counted rows
/// are omitted. Ties keep input order.
#[must_use]
pub fn aggregate_by_event(events: &[Event], range: DateRange, top_n: usize) -> Vec<AnalyticsBucket> {
    let mut buckets: Vec<AnalyticsBucket> = Vec::new();
    for event in events {
        let count = event
            .registrations
            .iter()
            .filter(|row| row.status == RegistrationStatus::Registered && range.contains(row.registered_at))
            .count() as u64;
        if count == 0 {
            continue;
        }
        match buckets.iter_mut().find(|bucket| bucket.key == event.title) {
            Some(bucket) => bucket.count += count,
            None => buckets.push(AnalyticsBucket::new(event.title.clone(), count)),
        }
    }

    // sort_by is stable
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets.truncate(top_n);
    buckets
}

/// Dashboard summary figures.
///
/// The three counts overlap: a completed event whose date is still ahead is
/// both `completed` and `upcoming`, and `total` is simply the filtered set size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Events with `is_completed`
    pub completed: u64,
    /// Events whose start is after `now`
    pub upcoming: u64,
    /// Events inside the range
    pub total: u64,
}

impl StatusSummary {
    /// The summary as labelled buckets, in `completed`, `upcoming`, `total` order.
    #[must_use]
    pub fn to_buckets(&self) -> Vec<AnalyticsBucket> {
        vec![
            AnalyticsBucket::new("completed", self.completed),
            AnalyticsBucket::new("upcoming", self.upcoming),
            AnalyticsBucket::new("total", self.total),
        ]
    }
}

/// Summarizes events whose start date falls inside the range.
#[must_use]
pub fn aggregate_by_status(events: &[Event], range: DateRange, now: DateTime<Utc>) -> StatusSummary {
    events
        .iter()
        .filter(|event| range.contains(event.date))
        .fold(StatusSummary::default(), |mut summary, event| {
            summary.total += 1;
            if event.is_completed {
                summary.completed += 1;
            }
            if event.date > now {
                summary.upcoming += 1;
            }
            summary
        })
}

/// Pre-aggregated analytics for one range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Window the figures cover
    pub range: DateRange,
    /// Registrations per day
    pub registrations_by_day: Vec<AnalyticsBucket>,
    /// Top events by active registrations
    pub registrations_by_event: Vec<AnalyticsBucket>,
    /// Event status summary
    pub status: StatusSummary,
    /// When the report was computed
    pub generated_at: DateTime<Utc>,
}

/// Builds the full report from a set of events and their registrations.
#[must_use]
pub fn build_report(events: &[Event], range: DateRange, top_n: usize, now: DateTime<Utc>) -> AnalyticsReport {
    let registrations: Vec<&Registration> = events
        .iter()
        .flat_map(|event| event.registrations.iter())
        .collect();

    AnalyticsReport {
        range,
        registrations_by_day: aggregate_by_day(&registrations, range),
        registrations_by_event: aggregate_by_event(events, range, top_n),
        status: aggregate_by_status(events, range, now),
        generated_at: now,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ActorId, EventId};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, h, min, 0).unwrap()
    }

    fn event_with(title: &str, registrations: usize, at: DateTime<Utc>) -> Event {
        let mut event = Event::new(EventId::new(), title.to_string(), ActorId::new(), at, at);
        for _ in 0..registrations {
            event.registrations.push(Registration::new(event.id, ActorId::new(), at));
        }
        event
    }

    #[test]
    fn test_range_at_calendar_extremes() {
        let at = ts(1, 1, 12, 0);
        assert!(in_range(at, None, Some(NaiveDate::MAX)));
        assert!(in_range(at, Some(NaiveDate::MIN), None));
        assert!(in_range(at, Some(NaiveDate::MIN), Some(NaiveDate::MAX)));
        assert!(!in_range(at, Some(NaiveDate::MAX), None));
        assert!(!in_range(at, None, Some(NaiveDate::MIN)));
        assert!(DateRange::new(None, Some(NaiveDate::MAX)).contains(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn test_range_end_covers_whole_day() {
        let range = DateRange::new(Some(day(2025, 3, 10)), Some(day(2025, 3, 10)));
        assert!(range.contains(ts(3, 10, 0, 0)));
        assert!(range.contains(ts(3, 10, 23, 59)));
        assert!(range.contains(ts(3, 10, 0, 0) + Duration::days(1) - Duration::milliseconds(1)));
        assert!(!range.contains(ts(3, 11, 0, 0)));
        assert!(!range.contains(ts(3, 9, 23, 59)));
    }

    #[test]
    fn test_open_bounds() {
        assert!(DateRange::ALL.contains(ts(1, 1, 0, 0)));
        assert!(in_range(ts(12, 31, 23, 59), Some(day(2025, 6, 1)), None));
        assert!(!in_range(ts(5, 31, 23, 59), Some(day(2025, 6, 1)), None));
        assert!(in_range(ts(1, 1, 0, 0), None, Some(day(2025, 1, 1))));
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let range = DateRange::new(Some(day(2025, 3, 10)), Some(day(2025, 3, 1)));
        assert!(range.is_inverted());
        assert!(!range.contains(ts(3, 5, 12, 0)));
    }

    #[test]
    fn test_by_day_sorted_ascending() {
        let event = event_with("Expo", 0, ts(3, 1, 9, 0));
        let rows = vec![
            Registration::new(event.id, ActorId::new(), ts(3, 3, 22, 0)),
            Registration::new(event.id, ActorId::new(), ts(3, 1, 8, 0)),
            Registration::new(event.id, ActorId::new(), ts(3, 3, 1, 0)),
        ];

        let buckets = aggregate_by_day(&rows, DateRange::ALL);
        assert_eq!(buckets, vec![
            AnalyticsBucket::new("2025-03-01", 1),
            AnalyticsBucket::new("2025-03-03", 2),
        ]);
    }

    #[test]
    fn test_by_event_top_ten_of_eleven() {
        let counts = [50, 40, 30, 25, 20, 15, 10, 8, 5, 3, 1];
        let events: Vec<Event> = counts
            .iter()
            .enumerate()
            .map(|(index, count)| event_with(&format!("Event {index}"), *count, ts(4, 1, 10, 0)))
            .collect();

        let buckets = aggregate_by_event(&events, DateRange::ALL, DEFAULT_TOP_N);
        assert_eq!(buckets.len(), 10);
        assert_eq!(buckets[0], AnalyticsBucket::new("Event 0", 50));
        assert_eq!(buckets[9], AnalyticsBucket::new("Event 9", 3));
        assert!(buckets.iter().all(|bucket| bucket.key != "Event 10"));
    }

    #[test]
    fn test_by_event_skips_cancelled_and_keeps_tie_order() {
        let mut first = event_with("Alpha", 2, ts(4, 1, 10, 0));
        first.registrations[0].status = RegistrationStatus::Cancelled;
        let second = event_with("Beta", 1, ts(4, 2, 10, 0));
        let empty = event_with("Gamma", 0, ts(4, 3, 10, 0));

        let buckets = aggregate_by_event(&[first, second, empty], DateRange::ALL, DEFAULT_TOP_N);
        assert_eq!(buckets, vec![
            AnalyticsBucket::new("Alpha", 1),
            AnalyticsBucket::new("Beta", 1),
        ]);
    }

    #[test]
    fn test_by_event_merges_shared_titles() {
        let events = vec![
            event_with("Meetup", 2, ts(4, 1, 10, 0)),
            event_with("Talk", 3, ts(4, 1, 10, 0)),
            event_with("Meetup", 2, ts(4, 8, 10, 0)),
        ];
        let buckets = aggregate_by_event(&events, DateRange::ALL, DEFAULT_TOP_N);
        assert_eq!(buckets[0], AnalyticsBucket::new("Meetup", 4));
    }

    #[test]
    fn test_by_event_respects_range() {
        let events = vec![event_with("Early", 4, ts(1, 5, 10, 0)), event_with("Late", 1, ts(6, 5, 10, 0))];
        let range = DateRange::new(Some(day(2025, 6, 1)), None);
        assert_eq!(aggregate_by_event(&events, range, DEFAULT_TOP_N), vec![AnalyticsBucket::new("Late", 1)]);
    }

    #[test]
    fn test_status_counts_overlap() {
        let now = ts(5, 1, 0, 0);
        let mut completed_future = event_with("A", 0, ts(6, 1, 0, 0));
        completed_future.is_completed = true;
        let mut completed_past = event_with("B", 0, ts(4, 1, 0, 0));
        completed_past.is_completed = true;
        let pending_past = event_with("C", 0, ts(3, 1, 0, 0));

        let summary = aggregate_by_status(&[completed_future, completed_past, pending_past], DateRange::ALL, now);
        assert_eq!(summary, StatusSummary {
            completed: 2,
            upcoming: 1,
            total: 3
        });
        assert_eq!(summary.to_buckets()[2], AnalyticsBucket::new("total", 3));
    }

    #[test]
    fn test_report_bundles_all_groupings() {
        let now = ts(5, 1, 0, 0);
        let events = vec![event_with("Expo", 3, ts(4, 20, 10, 0))];
        let report = build_report(&events, DateRange::ALL, DEFAULT_TOP_N, now);

        assert_eq!(report.registrations_by_day, vec![AnalyticsBucket::new("2025-04-20", 3)]);
        assert_eq!(report.registrations_by_event, vec![AnalyticsBucket::new("Expo", 3)]);
        assert_eq!(report.status.total, 1);
        assert_eq!(report.generated_at, now);
    }

    proptest! {
        #[test]
        fn prop_by_day_counts_sum_to_in_range_records(
            offsets in prop::collection::vec(0i64..(90 * 24 * 60), 0..200),
            start_offset in 0i64..90,
            span in 0i64..60,
        ) {
            let base = ts(1, 1, 0, 0);
            let event = event_with("Prop", 0, base);
            let rows: Vec<Registration> = offsets
                .iter()
                .map(|minutes| Registration::new(event.id, ActorId::new(), base + Duration::minutes(*minutes)))
                .collect();
            let start = base.date_naive() + Duration::days(start_offset);
            let range = DateRange::new(Some(start), Some(start + Duration::days(span)));

            let total: u64 = aggregate_by_day(&rows, range).iter().map(|bucket| bucket.count).sum();
            let expected = rows.iter().filter(|row| range.contains(row.registered_at)).count() as u64;
            prop_assert_eq!(total, expected);
        }
    }
}
