//! RescheduledTimer - self-rescheduling async timer with non-overlapping ticks
//!
//! One tick = wait `interval`, then `invoke`. `invoke` serializes callback
//! bodies behind an async mutex and re-arms from a drop guard, so the next
//! wait starts only after the previous callback (or its cancellation) ended.
//!
//! State machine:
//!
//! ```text
//!   Disarmed ──start()──▶ Waiting ──interval──▶ Running ──cleanup──▶ Waiting
//!      ▲                     │                     │
//!      └──────stop()─────────┴─────────stop()──────┘ (no re-arm)
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::TimerConfig;
use crate::error::{BinderyError, Result};

/// Callback run on every tick
///
/// Receives the cancellation token of the current schedule; it is cancelled
/// by `stop()` and may be observed cooperatively.
pub type TimerCallback =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Observable timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Not armed; a callback still finishing after `stop` does not count
    Disarmed,
    /// Armed, waiting for the next tick
    Waiting,
    /// Armed and a callback body is executing
    Running,
}

struct Schedule {
    armed: bool,
    interval: Duration,
    cancel: CancellationToken,
    /// Sleeping wait task; taken by the task itself once it fires
    pending: Option<JoinHandle<()>>,
    /// Bumped on every arm so stale wait tasks can tell they were superseded
    generation: u64,
    runtime: Option<Handle>,
}

struct TimerInner {
    name: Arc<str>,
    config: TimerConfig,
    callback: RwLock<Option<TimerCallback>>,
    gate: tokio::sync::Mutex<()>,
    schedule: Mutex<Schedule>,
    running: AtomicBool,
    disposed: AtomicBool,
}

/// Async timer whose next tick is scheduled only after the previous one ended
///
/// ```
/// use std::time::Duration;
/// use bindery::RescheduledTimer;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> bindery::Result<()> {
/// let timer = RescheduledTimer::new("poller");
/// timer.on_tick(|_token| async {
///     // poll something
///     Ok(())
/// });
/// timer.start(Duration::from_millis(250))?;
/// timer.stop();
/// # Ok(())
/// # }
/// ```
pub struct RescheduledTimer {
    inner: Arc<TimerInner>,
}

impl RescheduledTimer {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_config(name, TimerConfig::default())
    }

    pub fn with_config(name: impl Into<Arc<str>>, config: TimerConfig) -> Self {
        let interval = config.default_interval();
        Self {
            inner: Arc::new(TimerInner {
                name: name.into(),
                config,
                callback: RwLock::new(None),
                gate: tokio::sync::Mutex::new(()),
                schedule: Mutex::new(Schedule {
                    armed: false,
                    interval,
                    cancel: CancellationToken::new(),
                    pending: None,
                    generation: 0,
                    runtime: None,
                }),
                running: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Interval of the current (or last) schedule
    pub fn interval(&self) -> Duration {
        self.inner.schedule.lock().interval
    }

    /// Register the tick callback, replacing any previous one
    pub fn on_tick<F, Fut>(&self, callback: F) -> &Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: TimerCallback =
            Arc::new(move |token| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(callback(token))
            });
        *self.inner.callback.write() = Some(callback);
        self
    }

    /// Arm the timer: the first tick fires after `interval`
    ///
    /// No-op when already armed. Must be called inside a tokio runtime.
    pub fn start(&self, interval: Duration) -> Result<()> {
        self.inner.ensure_live()?;
        if interval.is_zero() {
            return Err(BinderyError::InvalidInterval {
                timer: self.inner.name.to_string(),
            });
        }
        let runtime = Handle::try_current().map_err(|_| BinderyError::NoRuntime {
            timer: self.inner.name.to_string(),
        })?;

        let mut schedule = self.inner.schedule.lock();
        if schedule.armed {
            return Ok(());
        }
        schedule.armed = true;
        schedule.interval = interval;
        schedule.cancel = CancellationToken::new();
        schedule.runtime = Some(runtime);
        self.inner.schedule_tick(&mut schedule);

        debug!(timer = %self.inner.name, interval_ms = interval.as_millis() as u64, "Timer started");
        Ok(())
    }

    /// `start` with the configured default interval
    pub fn start_default(&self) -> Result<()> {
        self.start(self.inner.config.default_interval())
    }

    /// Disarm: abort the pending wait and cancel the schedule's token
    ///
    /// A callback already running completes (the token is advisory), but the
    /// timer does not re-arm afterwards.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Run one tick now
    ///
    /// Waits for any running callback to finish first. If `token` is cancelled
    /// during that wait, returns [`BinderyError::Cancelled`] without running.
    /// An armed timer re-arms afterwards, whatever the outcome.
    pub async fn invoke(&self, token: CancellationToken) -> Result<()> {
        self.inner.invoke(token).await
    }

    pub fn state(&self) -> TimerState {
        if !self.inner.schedule.lock().armed {
            TimerState::Disarmed
        } else if self.inner.running.load(Ordering::Acquire) {
            TimerState::Running
        } else {
            TimerState::Waiting
        }
    }

    pub fn is_armed(&self) -> bool {
        self.inner.schedule.lock().armed
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Stop and release the callback; later `start`/`invoke` fail. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Drop for RescheduledTimer {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for RescheduledTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RescheduledTimer")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl TimerInner {
    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(BinderyError::TimerDisposed {
                timer: self.name.to_string(),
            });
        }
        Ok(())
    }

    /// Spawn the wait for the next tick, superseding any pending one
    fn schedule_tick(self: &Arc<Self>, schedule: &mut Schedule) {
        let Some(runtime) = schedule.runtime.clone() else {
            return;
        };
        if let Some(previous) = schedule.pending.take() {
            previous.abort();
        }

        schedule.generation += 1;
        let generation = schedule.generation;
        let interval = schedule.interval;
        let token = schedule.cancel.clone();
        let weak: Weak<TimerInner> = Arc::downgrade(self);

        schedule.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(interval).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut schedule = inner.schedule.lock();
                if !schedule.armed || schedule.generation != generation {
                    return;
                }
                schedule.pending = None;
            }

            match inner.invoke(token).await {
                Ok(()) => {}
                Err(BinderyError::Cancelled { .. }) => {
                    debug!(timer = %inner.name, "Timer tick cancelled");
                }
                Err(e) => {
                    warn!(timer = %inner.name, error = %e, "Timer tick failed");
                }
            }
        }));
    }

    #[instrument(name = "timer_invoke", skip(self, token), fields(timer = %self.name))]
    async fn invoke(self: &Arc<Self>, token: CancellationToken) -> Result<()> {
        self.ensure_live()?;

        {
            let mut schedule = self.schedule.lock();
            if schedule.armed {
                if let Some(pending) = schedule.pending.take() {
                    pending.abort();
                }
            }
        }

        // Dropped last: runs after the gate permit is released
        let _rearm = RearmGuard { inner: self };

        let _permit = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(BinderyError::Cancelled {
                    timer: self.name.to_string(),
                });
            }
            permit = self.gate.lock() => permit,
        };

        self.running.store(true, Ordering::Release);
        let _running = RunningGuard {
            flag: &self.running,
        };

        let callback = self
            .callback
            .read()
            .clone()
            .ok_or_else(|| BinderyError::MissingCallback {
                timer: self.name.to_string(),
            })?;

        callback(token)
            .await
            .map_err(|reason| BinderyError::CallbackFailed {
                timer: self.name.to_string(),
                reason,
            })
    }

    fn stop(&self) {
        let mut schedule = self.schedule.lock();
        if !schedule.armed {
            return;
        }
        schedule.armed = false;
        schedule.cancel.cancel();
        if let Some(pending) = schedule.pending.take() {
            pending.abort();
        }
        debug!(timer = %self.name, "Timer stopped");
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop();
        self.callback.write().take();
        self.schedule.lock().runtime = None;
        debug!(timer = %self.name, "Timer disposed");
    }
}

/// Re-arms an armed timer when an invocation ends, however it ends
struct RearmGuard<'a> {
    inner: &'a Arc<TimerInner>,
}

impl Drop for RearmGuard<'_> {
    fn drop(&mut self) {
        if self.inner.disposed.load(Ordering::Acquire) {
            return;
        }
        let mut schedule = self.inner.schedule.lock();
        if schedule.armed {
            self.inner.schedule_tick(&mut schedule);
            debug!(timer = %self.inner.name, "Timer re-armed");
        }
    }
}

struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(timer: &RescheduledTimer) -> Arc<AtomicUsize> {
        let runs = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&runs);
        timer.on_tick(move |_| {
            let r = Arc::clone(&r);
            async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        runs
    }

    #[test]
    fn start_outside_runtime_fails() {
        let timer = RescheduledTimer::new("orphan");
        let err = timer.start(Duration::from_millis(10)).unwrap_err();
        assert_eq!(err.code(), "BND-024");
        assert_eq!(timer.state(), TimerState::Disarmed);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_repeat_until_stopped() {
        let timer = RescheduledTimer::new("repeat");
        let runs = counting(&timer);

        timer.start(Duration::from_millis(100)).unwrap();
        assert_eq!(timer.state(), TimerState::Waiting);

        tokio::time::sleep(Duration::from_millis(350)).await;
        timer.stop();
        let seen = runs.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), seen);
        assert_eq!(timer.state(), TimerState::Disarmed);
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let timer = RescheduledTimer::new("zero");
        let _runs = counting(&timer);

        let err = timer.start(Duration::ZERO).unwrap_err();
        assert!(matches!(err, BinderyError::InvalidInterval { .. }));
        assert_eq!(err.code(), "BND-025");
        assert_eq!(timer.state(), TimerState::Disarmed);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_callback_reports_disarmed_at_once() {
        let timer = RescheduledTimer::new("slow-stop");
        timer.on_tick(|_| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        });

        timer.start(Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(timer.state(), TimerState::Running);

        timer.stop();
        assert_eq!(timer.state(), TimerState::Disarmed);
        assert!(timer.inner.running.load(Ordering::Acquire));
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_noop() {
        let timer = RescheduledTimer::new("twice");
        let runs = counting(&timer);

        timer.start(Duration::from_millis(100)).unwrap();
        timer.start(Duration::from_millis(1)).unwrap();
        assert_eq!(timer.interval(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invoke_without_callback_fails() {
        let timer = RescheduledTimer::new("empty");
        let err = timer.invoke(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, BinderyError::MissingCallback { .. }));
    }

    #[tokio::test]
    async fn callback_error_is_wrapped() {
        let timer = RescheduledTimer::new("failing");
        timer.on_tick(|_| async { Err::<(), _>(anyhow::anyhow!("boom")) });

        let err = timer.invoke(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.code(), "BND-022");
        assert!(err.to_string().ends_with("boom"));
    }

    #[tokio::test]
    async fn disposed_timer_rejects_calls() {
        let timer = RescheduledTimer::new("gone");
        let _runs = counting(&timer);
        timer.start(Duration::from_secs(1)).unwrap();

        timer.dispose();
        timer.dispose();

        assert!(timer.is_disposed());
        assert_eq!(timer.state(), TimerState::Disarmed);
        assert_eq!(
            timer.start(Duration::from_secs(1)).unwrap_err().code(),
            "BND-023"
        );
        assert_eq!(
            timer
                .invoke(CancellationToken::new())
                .await
                .unwrap_err()
                .code(),
            "BND-023"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_default_uses_config() {
        let config = TimerConfig::default().with_default_interval(Duration::from_millis(40));
        let timer = RescheduledTimer::with_config("configured", config);
        let runs = counting(&timer);

        timer.start_default().unwrap();
        assert_eq!(timer.interval(), Duration::from_millis(40));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
