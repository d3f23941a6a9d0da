//! Hourly scheduling: top-of-hour boundary math and a single-owner timer.
//!
//! The scheduler owns at most one pending timer handle. Arming cancels any
//! previously pending timer first, so duplicate cycles cannot accumulate
//! from drift. The one-second countdown tick is derived display state only
//! and lives with the caller; it never triggers a fetch.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tokio::task::JoinHandle;
use tracing::debug;

/// The next wall-clock instant with zero minutes, seconds, and sub-second
/// components, strictly after `now`.
#[must_use]
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + chrono::Duration::hours(1)
}

/// Human-readable `HH:MM:SS` remaining until `next`, clamped at zero.
#[must_use]
pub fn countdown(now: DateTime<Utc>, next: DateTime<Utc>) -> String {
    let remaining = (next - now).num_seconds().max(0);
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    let seconds = remaining % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Owner of the single pending cycle timer.
#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Option<JoinHandle<()>>,
    next_fire: Option<DateTime<Utc>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer for `fire_at`, cancelling any pending timer
    /// first. Cancel-then-arm is one operation; exactly one timer is
    /// pending afterwards.
    pub fn arm<F>(&mut self, fire_at: DateTime<Utc>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        self.next_fire = Some(fire_at);
        self.arm_in(delay, task);
        debug!("next cycle armed for {}", fire_at);
    }

    /// Arm with an explicit delay. Used directly by tests; `arm` computes
    /// the delay from wall-clock time.
    pub fn arm_in<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Instant the pending timer will fire, if armed via [`Self::arm`].
    #[must_use]
    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.next_fire
    }

    /// Whether a timer is currently pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.next_fire = None;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_next_top_of_hour_zeroes_components() {
        let now = Utc.with_ymd_and_hms(2025, 11, 2, 14, 37, 21).single()
            .expect("valid timestamp");
        let next = next_top_of_hour(now);

        assert_eq!(next.minute(), 0);
        assert_eq!(next.second(), 0);
        assert_eq!(next.nanosecond(), 0);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 11, 2, 15, 0, 0).single()
            .expect("valid timestamp"));
    }

    #[test]
    fn test_next_top_of_hour_is_strictly_after_now() {
        let cases = [
            Utc.with_ymd_and_hms(2025, 11, 2, 23, 59, 59).single(),
            Utc.with_ymd_and_hms(2025, 11, 2, 15, 0, 0).single(),
            Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 1).single(),
        ];

        for now in cases.into_iter().flatten() {
            let next = next_top_of_hour(now);
            assert!(next > now, "{next} not after {now}");
            assert!(next - now <= chrono::Duration::hours(1));
            assert_eq!(next.minute(), 0);
            assert_eq!(next.second(), 0);
        }
    }

    #[test]
    fn test_next_top_of_hour_on_exact_boundary() {
        let now = Utc.with_ymd_and_hms(2025, 11, 2, 15, 0, 0).single()
            .expect("valid timestamp");
        // An instant already on the boundary schedules the next one
        assert_eq!(
            next_top_of_hour(now),
            Utc.with_ymd_and_hms(2025, 11, 2, 16, 0, 0).single()
                .expect("valid timestamp")
        );
    }

    #[test]
    fn test_countdown_format() {
        let now = Utc.with_ymd_and_hms(2025, 11, 2, 14, 0, 0).single()
            .expect("valid timestamp");
        let next = Utc.with_ymd_and_hms(2025, 11, 2, 15, 23, 45).single()
            .expect("valid timestamp");

        assert_eq!(countdown(now, next), "01:23:45");
        assert_eq!(countdown(next, next), "00:00:00");
        // A stale next-update instant clamps instead of going negative
        assert_eq!(countdown(next, now), "00:00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_cancels_previous_timer() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<&'static str>();
        let mut scheduler = Scheduler::new();

        let tx1 = tx.clone();
        scheduler.arm_in(Duration::from_secs(5), async move {
            let _ = tx1.send("first");
        });

        let tx2 = tx.clone();
        scheduler.arm_in(Duration::from_secs(1), async move {
            let _ = tx2.send("second");
        });

        // Past both deadlines; only the second timer may fire
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(rx.try_recv(), Ok("second"));
        assert!(rx.try_recv().is_err(), "cancelled timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_disarms() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let mut scheduler = Scheduler::new();

        scheduler.arm_in(Duration::from_secs(1), async move {
            let _ = tx.send(());
        });
        assert!(scheduler.is_armed());

        scheduler.cancel();
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.next_fire(), None);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
