//! Cycle countdown: a shared remaining-seconds cell and its 1 Hz ticker.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Seconds left in the current reading cycle, shared between the HTTP
/// handlers and the ticker task. `None` until the first draw.
#[derive(Clone, Default)]
pub struct Countdown {
    remaining: Arc<Mutex<Option<i64>>>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart the cycle at `seconds`, clamped to zero.
    pub fn restart(&self, seconds: i64) {
        *self.cell() = Some(seconds.max(0));
    }

    pub fn remaining(&self) -> Option<i64> {
        *self.cell()
    }

    /// One second elapsed; never goes below zero.
    pub fn tick(&self) {
        let mut remaining = self.cell();
        if let Some(seconds) = remaining.as_mut() {
            *seconds = (*seconds - 1).max(0);
        }
    }

    fn cell(&self) -> std::sync::MutexGuard<'_, Option<i64>> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tick the countdown once per second until the task is aborted.
///
/// Skipped ticks are not made up; the countdown is advisory display state
/// and does not correct for drift.
pub fn spawn_ticker(countdown: Countdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            countdown.tick();
        }
    })
}

/// Render remaining seconds as `"{d}d {h}h {m}m {s}s"`.
///
/// Negative input clamps to zero before decomposition.
pub fn format_remaining(seconds: i64) -> String {
    let total = seconds.max(0);
    let days = total / (24 * 60 * 60);
    let hours = (total % (24 * 60 * 60)) / (60 * 60);
    let minutes = (total % (60 * 60)) / 60;
    let secs = total % 60;
    format!("{days}d {hours}h {minutes}m {secs}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_days_formats_clean() {
        assert_eq!(format_remaining(30 * 24 * 60 * 60), "30d 0h 0m 0s");
    }

    #[test]
    fn mixed_units_decompose_by_floor_division() {
        assert_eq!(format_remaining(90_061), "1d 1h 1m 1s");
    }

    #[test]
    fn zero_and_negative_clamp() {
        assert_eq!(format_remaining(0), "0d 0h 0m 0s");
        assert_eq!(format_remaining(-5), "0d 0h 0m 0s");
    }

    #[test]
    fn tick_floors_at_zero() {
        let countdown = Countdown::new();
        countdown.restart(1);
        countdown.tick();
        assert_eq!(countdown.remaining(), Some(0));
        countdown.tick();
        assert_eq!(countdown.remaining(), Some(0));
    }

    #[test]
    fn tick_before_any_draw_is_a_noop() {
        let countdown = Countdown::new();
        countdown.tick();
        assert_eq!(countdown.remaining(), None);
    }

    #[test]
    fn restart_clamps_negative_input() {
        let countdown = Countdown::new();
        countdown.restart(-30);
        assert_eq!(countdown.remaining(), Some(0));
    }
}
