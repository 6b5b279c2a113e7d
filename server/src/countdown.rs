//! Deadline countdown stream.
//!
//! One cooperative interval per subscriber. Each tick re-evaluates
//! [`TimeRemaining::until`] against a fresh `now`; there is no shared state, so
//! dropping the stream is all it takes to cancel it.

use chrono::{DateTime, Utc};
use eventgate_core::clock::{Clock, TimeRemaining};
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Boxed countdown stream
pub type CountdownStream = Pin<Box<dyn Stream<Item = TimeRemaining> + Send>>;

/// Ticks every `period` until the deadline passes.
///
/// The first value is yielded immediately. The stream ends right after it
/// yields [`TimeRemaining::Elapsed`].
#[must_use]
pub fn deadline_countdown(
    clock: Arc<dyn Clock>,
    deadline: DateTime<Utc>,
    period: Duration,
) -> CountdownStream {
    let period = period.max(Duration::from_millis(1));

    Box::pin(async_stream::stream! {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let remaining = TimeRemaining::until(deadline, clock.now());
            yield remaining;
            if remaining.is_elapsed() {
                break;
            }
        }
    })
}
