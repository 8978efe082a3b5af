//! Time-based suspension used by the pipeline.
//!
//! All waiting goes through two injected abstractions:
//! - [`Sleeper`] performs a wait (real tokio timer, or a recorder in tests)
//! - [`RequestPacer`] decides how long to wait before each TTS request

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Something that can suspend the current task for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and records every requested duration.
///
/// Clones share the same record, so a test can keep one clone and hand the
/// other to the code under test.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations requested so far, in order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Sum of all requested durations.
    pub fn total(&self) -> Duration {
        self.recorded().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// Monotonic time source, injectable for tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Policy deciding how long to wait before a TTS request.
#[async_trait]
pub trait RequestPacer: Send + Sync {
    /// Wait until request number `request_index` (0-based within a run) may be sent.
    async fn wait_turn(&self, request_index: usize);
}

/// Fixed delay before every request except the first of a run.
pub struct FixedDelayPacer<S: Sleeper = TokioSleeper> {
    interval: Duration,
    sleeper: S,
}

impl FixedDelayPacer<TokioSleeper> {
    pub fn new(interval: Duration) -> Self {
        Self::with_sleeper(interval, TokioSleeper)
    }
}

impl<S: Sleeper> FixedDelayPacer<S> {
    pub fn with_sleeper(interval: Duration, sleeper: S) -> Self {
        Self { interval, sleeper }
    }
}

#[async_trait]
impl<S: Sleeper> RequestPacer for FixedDelayPacer<S> {
    async fn wait_turn(&self, request_index: usize) {
        if request_index == 0 || self.interval.is_zero() {
            return;
        }
        tracing::debug!(
            delay_secs = self.interval.as_secs_f64(),
            request_index,
            "pacing TTS request"
        );
        self.sleeper.sleep(self.interval).await;
    }
}

/// Single-token bucket refilled once per interval.
///
/// Unlike [`FixedDelayPacer`] it only waits for whatever part of the interval
/// has not already elapsed since the previous grant, so slow requests do not
/// pay the full delay again.
pub struct TokenBucketPacer<C: Clock = SystemClock, S: Sleeper = TokioSleeper> {
    interval: Duration,
    clock: C,
    sleeper: S,
    last_grant: Mutex<Option<Instant>>,
}

impl TokenBucketPacer<SystemClock, TokioSleeper> {
    pub fn new(interval: Duration) -> Self {
        Self::with_parts(interval, SystemClock, TokioSleeper)
    }
}

impl<C: Clock, S: Sleeper> TokenBucketPacer<C, S> {
    pub fn with_parts(interval: Duration, clock: C, sleeper: S) -> Self {
        Self {
            interval,
            clock,
            sleeper,
            last_grant: Mutex::new(None),
        }
    }

    fn remaining_wait(&self) -> Duration {
        let last = self.last_grant.lock().ok().and_then(|guard| *guard);
        match last {
            Some(granted) => self
                .interval
                .saturating_sub(self.clock.now().saturating_duration_since(granted)),
            None => Duration::ZERO,
        }
    }

    fn record_grant(&self) {
        if let Ok(mut guard) = self.last_grant.lock() {
            *guard = Some(self.clock.now());
        }
    }
}

#[async_trait]
impl<C: Clock, S: Sleeper> RequestPacer for TokenBucketPacer<C, S> {
    async fn wait_turn(&self, request_index: usize) {
        let wait = self.remaining_wait();
        if !wait.is_zero() {
            tracing::debug!(
                delay_secs = wait.as_secs_f64(),
                request_index,
                "waiting for request token"
            );
            self.sleeper.sleep(wait).await;
        }
        self.record_grant();
    }
}

/// Pacer that never waits. For tests and offline backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelayPacer;

#[async_trait]
impl RequestPacer for NoDelayPacer {
    async fn wait_turn(&self, _request_index: usize) {}
}
