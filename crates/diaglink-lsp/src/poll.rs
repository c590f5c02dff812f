//! Activation-counted polling.
//!
//! Polling runs while the number of outstanding processing holds is
//! strictly positive. At most one recurring timer exists at a time, and it
//! is released as soon as the count drops to zero or below, whether through
//! [`PollLoop::disable`] or by dropping the last [`ProcessingLease`].
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Default interval between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
enum Timer {
    /// No timer.
    Stopped,
    /// A timer is wanted; it is created on the next wait so enabling does
    /// not need a runtime.
    Armed,
    Running(Interval),
    /// The interval is out on loan to an in-progress wait.
    Waiting,
}

/// State shared between the loop and its leases.
#[derive(Debug)]
struct Gate {
    count: AtomicI64,
    timer: Mutex<Timer>,
    /// Wakes an in-progress wait when the count drops to zero or below.
    released: Notify,
}

impl Gate {
    fn timer(&self) -> MutexGuard<'_, Timer> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decrement(&self) -> i64 {
        let count = self.count.fetch_sub(1, Ordering::SeqCst) - 1;
        if count <= 0 {
            self.stop_timer();
            self.released.notify_waiters();
        }
        count
    }

    fn stop_timer(&self) {
        let mut timer = self.timer();
        if !matches!(*timer, Timer::Stopped) {
            tracing::debug!("poll timer cancelled");
            *timer = Timer::Stopped;
        }
    }
}

/// Reference-counted gate around a recurring timer.
#[derive(Debug)]
pub struct PollLoop {
    gate: Arc<Gate>,
    period: Duration,
}

impl Default for PollLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl PollLoop {
    pub fn new(period: Duration) -> Self {
        Self {
            gate: Arc::new(Gate {
                count: AtomicI64::new(0),
                timer: Mutex::new(Timer::Stopped),
                released: Notify::new(),
            }),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Add a hold. Starts the timer when the count is positive and none
    /// exists. Returns the new count.
    pub fn enable(&mut self) -> i64 {
        let count = self.gate.count.fetch_add(1, Ordering::SeqCst) + 1;
        if count > 0 {
            let mut timer = self.gate.timer();
            if matches!(*timer, Timer::Stopped) {
                tracing::debug!("poll timer started ({:?})", self.period);
                *timer = Timer::Armed;
            }
        }
        count
    }

    /// Release a hold. Cancels the timer once the count is zero or below.
    /// Returns the new count.
    pub fn disable(&mut self) -> i64 {
        self.gate.decrement()
    }

    /// Add a hold released when the returned lease is dropped.
    pub fn lease(&mut self) -> ProcessingLease {
        self.enable();
        ProcessingLease {
            gate: Arc::clone(&self.gate),
        }
    }

    /// Drop the timer without touching the count.
    pub fn cancel(&mut self) {
        self.gate.stop_timer();
    }

    /// Whether polling is requested.
    pub fn is_active(&self) -> bool {
        self.activation_count() > 0
    }

    pub fn activation_count(&self) -> i64 {
        self.gate.count.load(Ordering::SeqCst)
    }

    /// Whether a timer exists.
    pub fn is_scheduled(&self) -> bool {
        !matches!(*self.gate.timer(), Timer::Stopped)
    }

    /// Wait for the next tick.
    ///
    /// Returns `false` without waiting when polling is inactive (releasing
    /// the timer if one is left) or when the timer was cancelled, and
    /// returns `false` early if the last hold goes away mid-wait.
    pub async fn wait_tick(&mut self) -> bool {
        let gate = Arc::clone(&self.gate);
        let released = gate.released.notified();
        tokio::pin!(released);
        // Register before checking the count so a release in between is seen.
        released.as_mut().enable();

        let mut interval = {
            let mut timer = gate.timer();
            if !self.is_active() {
                *timer = Timer::Stopped;
                return false;
            }
            match std::mem::replace(&mut *timer, Timer::Waiting) {
                Timer::Armed => {
                    let mut interval = time::interval_at(Instant::now() + self.period, self.period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    interval
                }
                Timer::Running(interval) => interval,
                other => {
                    *timer = other;
                    return false;
                }
            }
        };

        let ticked = tokio::select! {
            _ = interval.tick() => true,
            _ = released => false,
        };

        let mut timer = gate.timer();
        match *timer {
            Timer::Waiting => {
                *timer = Timer::Running(interval);
                ticked
            }
            // Cancelled and re-enabled while waiting; the next wait starts fresh.
            Timer::Armed => ticked,
            _ => false,
        }
    }
}

/// A processing hold tied to a scope.
///
/// Dropping the lease decrements the count. Dropping the last hold
/// releases the timer immediately and ends any wait in progress.
#[derive(Debug)]
#[must_use = "processing stops when the lease is dropped"]
pub struct ProcessingLease {
    gate: Arc<Gate>,
}

impl Drop for ProcessingLease {
    fn drop(&mut self) {
        self.gate.decrement();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_inactive_without_timer() {
        let poll = PollLoop::default();
        assert!(!poll.is_active());
        assert!(!poll.is_scheduled());
        assert_eq!(poll.period(), DEFAULT_TICK_INTERVAL);
    }

    #[test]
    fn active_iff_running_sum_positive() {
        let mut poll = PollLoop::default();
        let ops = [1, 1, -1, 1, -1, -1, -1, 1, 1, -1];
        let mut sum = 0i64;
        for op in ops {
            let count = if op > 0 { poll.enable() } else { poll.disable() };
            sum += op;
            assert_eq!(count, sum);
            assert_eq!(poll.is_active(), sum > 0);
            assert_eq!(poll.is_scheduled(), sum > 0, "after running sum {}", sum);
        }
    }

    #[test]
    fn unbalanced_disable_goes_negative() {
        let mut poll = PollLoop::default();
        assert_eq!(poll.disable(), -1);
        assert_eq!(poll.enable(), 0);
        assert!(!poll.is_active());
        assert!(!poll.is_scheduled());
        assert_eq!(poll.enable(), 1);
        assert!(poll.is_scheduled());
    }

    #[test]
    fn second_enable_keeps_single_timer() {
        let mut poll = PollLoop::default();
        poll.enable();
        poll.enable();
        assert!(poll.is_scheduled());
        poll.disable();
        assert!(poll.is_scheduled());
        poll.disable();
        assert!(!poll.is_scheduled());
    }

    #[test]
    fn cancel_leaves_count() {
        let mut poll = PollLoop::default();
        poll.enable();
        poll.cancel();
        assert_eq!(poll.activation_count(), 1);
        assert!(!poll.is_scheduled());
        poll.enable();
        assert!(poll.is_scheduled());
    }

    #[test]
    fn lease_releases_on_drop() {
        let mut poll = PollLoop::default();
        {
            let _lease = poll.lease();
            assert_eq!(poll.activation_count(), 1);
            assert!(poll.is_active());
        }
        assert_eq!(poll.activation_count(), 0);
        assert!(!poll.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_tick_fires_after_one_period() {
        let mut poll = PollLoop::new(Duration::from_millis(100));
        poll.enable();
        let start = Instant::now();
        assert!(poll.wait_tick().await);
        assert!(poll.wait_tick().await);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_tick_returns_immediately_when_inactive() {
        let mut poll = PollLoop::default();
        assert!(!poll.wait_tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_lease_stops_loop_on_next_wait() {
        let mut poll = PollLoop::default();
        let lease = poll.lease();
        assert!(poll.wait_tick().await);
        drop(lease);
        assert_eq!(poll.activation_count(), 0);
        assert!(!poll.is_scheduled());
        assert!(!poll.wait_tick().await);
    }

    #[test]
    fn dropping_last_lease_releases_timer() {
        let mut poll = PollLoop::default();
        let first = poll.lease();
        let second = poll.lease();
        drop(first);
        assert!(poll.is_scheduled());
        drop(second);
        assert!(!poll.is_active());
        assert!(!poll.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn lease_dropped_mid_wait_ends_the_wait() {
        let mut poll = PollLoop::new(Duration::from_secs(10));
        let lease = poll.lease();
        let start = Instant::now();
        let release = async move {
            time::sleep(Duration::from_millis(50)).await;
            drop(lease);
        };

        let (ticked, ()) = tokio::join!(poll.wait_tick(), release);
        assert!(!ticked);
        assert_eq!(start.elapsed(), Duration::from_millis(50));
        assert!(!poll.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_does_not_restart_without_enable() {
        let mut poll = PollLoop::default();
        poll.enable();
        assert!(poll.wait_tick().await);
        poll.cancel();
        assert!(!poll.wait_tick().await);
        poll.enable();
        assert!(poll.wait_tick().await);
    }
}
