//! ExclusiveTicker - fixed-period ticker that skips ticks while busy
//!
//! Unlike `RescheduledTimer`, ticks are not delayed by a slow action: a tick
//! that finds the previous action still running is dropped and counted.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{BinderyError, Result};

/// Run `f` only if `lock` is free; `None` when someone else holds it
///
/// ```
/// use parking_lot::Mutex;
/// use bindery::invoke_exclusive;
///
/// let lock = Mutex::new(());
/// assert_eq!(invoke_exclusive(&lock, || 42), Some(42));
///
/// let _held = lock.lock();
/// assert_eq!(invoke_exclusive(&lock, || 42), None);
/// ```
pub fn invoke_exclusive<R>(lock: &Mutex<()>, f: impl FnOnce() -> R) -> Option<R> {
    let _guard = lock.try_lock()?;
    Some(f())
}

type Action = Arc<dyn Fn() + Send + Sync>;

struct TickerInner {
    name: Arc<str>,
    period: Duration,
    action: Mutex<Option<Action>>,
    busy: Mutex<()>,
    executed: AtomicU64,
    skipped: AtomicU64,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
    disposed: AtomicBool,
}

/// Periodic synchronous action on tokio's blocking pool, never overlapping
pub struct ExclusiveTicker {
    inner: Arc<TickerInner>,
}

impl ExclusiveTicker {
    pub fn new(
        name: impl Into<Arc<str>>,
        period: Duration,
        action: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let action: Action = Arc::new(action);
        Self {
            inner: Arc::new(TickerInner {
                name: name.into(),
                period,
                action: Mutex::new(Some(action)),
                busy: Mutex::new(()),
                executed: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
                task: Mutex::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Begin ticking; the first tick fires one period from now
    ///
    /// No-op when already running. Must be called inside a tokio runtime,
    /// with a non-zero period.
    pub fn start(&self) -> Result<()> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(BinderyError::TimerDisposed {
                timer: self.inner.name.to_string(),
            });
        }
        if self.inner.period.is_zero() {
            return Err(BinderyError::InvalidInterval {
                timer: self.inner.name.to_string(),
            });
        }
        let runtime = Handle::try_current().map_err(|_| BinderyError::NoRuntime {
            timer: self.inner.name.to_string(),
        })?;

        let mut task = self.inner.task.lock();
        if task.is_some() {
            return Ok(());
        }

        let token = CancellationToken::new();
        let handle = runtime.spawn(Arc::clone(&self.inner).run(token.clone()));
        *task = Some((token, handle));

        debug!(ticker = %self.inner.name, period_ms = self.inner.period.as_millis() as u64, "Ticker started");
        Ok(())
    }

    /// Stop ticking; an action already running finishes on its own
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner.task.lock().is_some()
    }

    /// Ticks whose action was run
    pub fn executed_ticks(&self) -> u64 {
        self.inner.executed.load(Ordering::Relaxed)
    }

    /// Ticks dropped because the previous action was still running
    pub fn skipped_ticks(&self) -> u64 {
        self.inner.skipped.load(Ordering::Relaxed)
    }

    /// Stop and release the action. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.stop();
        self.inner.action.lock().take();
        debug!(ticker = %self.inner.name, "Ticker disposed");
    }
}

impl Drop for ExclusiveTicker {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ExclusiveTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveTicker")
            .field("name", &self.inner.name)
            .field("period", &self.inner.period)
            .field("running", &self.is_running())
            .field("executed", &self.executed_ticks())
            .field("skipped", &self.skipped_ticks())
            .finish()
    }
}

impl TickerInner {
    async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => self.tick(),
            }
        }
    }

    fn tick(self: &Arc<Self>) {
        let Some(action) = self.action.lock().clone() else {
            return;
        };
        let inner = Arc::clone(self);

        // Detached: the loop keeps ticking while the action runs
        drop(tokio::task::spawn_blocking(move || {
            match invoke_exclusive(&inner.busy, || action()) {
                Some(()) => {
                    inner.executed.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    inner.skipped.fetch_add(1, Ordering::Relaxed);
                    trace!(ticker = %inner.name, "Tick skipped, action still running");
                }
            }
        }));
    }

    fn stop(&self) {
        if let Some((token, handle)) = self.task.lock().take() {
            token.cancel();
            handle.abort();
            debug!(ticker = %self.name, "Ticker stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn invoke_exclusive_skips_when_held() {
        let lock = Mutex::new(());
        assert_eq!(invoke_exclusive(&lock, || "ran"), Some("ran"));

        let guard = lock.lock();
        assert_eq!(invoke_exclusive(&lock, || "ran"), None);
        drop(guard);

        assert_eq!(invoke_exclusive(&lock, || "ran"), Some("ran"));
    }

    #[test]
    fn start_outside_runtime_fails() {
        let ticker = ExclusiveTicker::new("orphan", Duration::from_millis(5), || {});
        assert_eq!(ticker.start().unwrap_err().code(), "BND-024");
    }

    #[tokio::test]
    async fn zero_period_is_rejected() {
        let ticker = ExclusiveTicker::new("zero", Duration::ZERO, || {});
        let err = ticker.start().unwrap_err();
        assert!(matches!(err, BinderyError::InvalidInterval { .. }));
        assert_eq!(err.code(), "BND-025");
        assert!(!ticker.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fast_action_runs_every_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let ticker = ExclusiveTicker::new("fast", Duration::from_millis(10), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        ticker.start().unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        ticker.stop();

        assert!(count.load(Ordering::SeqCst) >= 3);
        assert_eq!(ticker.executed_ticks() as usize, count.load(Ordering::SeqCst));
        assert!(!ticker.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_action_skips_ticks() {
        let active = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicBool::new(false));
        let (a, o) = (Arc::clone(&active), Arc::clone(&overlap));
        let ticker = ExclusiveTicker::new("slow", Duration::from_millis(10), move || {
            if a.fetch_add(1, Ordering::SeqCst) > 0 {
                o.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(Duration::from_millis(60));
            a.fetch_sub(1, Ordering::SeqCst);
        });

        ticker.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        ticker.dispose();

        assert!(!overlap.load(Ordering::SeqCst));
        assert!(ticker.executed_ticks() >= 1);
        assert!(ticker.skipped_ticks() >= 1);
    }

    #[tokio::test]
    async fn disposed_ticker_cannot_restart() {
        let ticker = ExclusiveTicker::new("done", Duration::from_millis(5), || {});
        ticker.start().unwrap();
        ticker.start().unwrap();
        assert!(ticker.is_running());

        ticker.dispose();
        ticker.dispose();
        assert_eq!(ticker.start().unwrap_err().code(), "BND-023");
    }
}
