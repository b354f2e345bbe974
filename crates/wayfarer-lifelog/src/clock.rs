//! Process-wide time source with scoped, stackable overrides.
//!
//! [`now`] reads the innermost active override on the current thread, or the
//! wall clock when none is active. [`with_override`] installs a replacement
//! for the duration of a closure, and [`with_override_async`] for the whole
//! life of a future. The replacement is always built from the
//! original [`SystemClock`], never from an override that is already active, so
//! nested overrides cannot chain through each other's state.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::Utc;

use crate::time::Timestamp;

/// A source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(&Utc::now())
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Reports `start`, then advances by `step_millis` on every read.
#[derive(Debug)]
pub struct SteppingClock {
    next: AtomicI64,
    step_millis: i64,
}

impl SteppingClock {
    pub fn new(start: Timestamp, step_millis: i64) -> Self {
        Self {
            next: AtomicI64::new(start.as_millis()),
            step_millis,
        }
    }

    /// One tick per second, starting at `start`.
    pub fn per_second(start: Timestamp) -> Self {
        Self::new(start, 1_000)
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.next.fetch_add(self.step_millis, Ordering::SeqCst))
    }
}

/// Shifts another clock by a fixed amount.
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock<C> {
    base: C,
    offset_millis: i64,
}

impl<C: Clock> OffsetClock<C> {
    pub fn new(base: C, offset_millis: i64) -> Self {
        Self {
            base,
            offset_millis,
        }
    }
}

impl<C: Clock> Clock for OffsetClock<C> {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.base.now().as_millis().saturating_add(self.offset_millis))
    }
}

static ORIGINAL: SystemClock = SystemClock;

thread_local! {
    static OVERRIDES: RefCell<Vec<Arc<dyn Clock>>> = const { RefCell::new(Vec::new()) };
}

/// Current time from the innermost override, or the wall clock.
pub fn now() -> Timestamp {
    let active = OVERRIDES.with(|stack| stack.borrow().last().cloned());
    match active {
        Some(clock) => clock.now(),
        None => ORIGINAL.now(),
    }
}

/// Run `action` with the clock produced by `factory` installed.
///
/// `factory` receives the original system clock. The previous clock is
/// restored when `action` returns or unwinds.
pub fn with_override<C, F, R>(factory: F, action: impl FnOnce() -> R) -> R
where
    C: Clock + 'static,
    F: FnOnce(&SystemClock) -> C,
{
    let clock: Arc<dyn Clock> = Arc::new(factory(&ORIGINAL));
    let _restore = OverrideGuard::push(clock);
    action()
}

/// Run the future built by `action` with the clock produced by `factory`
/// installed.
///
/// The clock is reinstalled around every poll, so it holds across `.await`
/// points and follows the task if a runtime moves it to another thread.
/// Overrides entered inside the future nest on top of it.
pub fn with_override_async<C, F, A, Fut>(factory: F, action: A) -> ScopedClock<Fut>
where
    C: Clock + 'static,
    F: FnOnce(&SystemClock) -> C,
    A: FnOnce() -> Fut,
    Fut: Future,
{
    let clock: Arc<dyn Clock> = Arc::new(factory(&ORIGINAL));
    let future = {
        let _restore = OverrideGuard::push(Arc::clone(&clock));
        action()
    };
    ScopedClock {
        clock,
        future: Box::pin(future),
    }
}

/// Future returned by [`with_override_async`].
#[must_use = "futures do nothing unless polled"]
pub struct ScopedClock<Fut> {
    clock: Arc<dyn Clock>,
    future: Pin<Box<Fut>>,
}

impl<Fut: Future> Future for ScopedClock<Fut> {
    type Output = Fut::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let _restore = OverrideGuard::push(Arc::clone(&this.clock));
        this.future.as_mut().poll(cx)
    }
}

/// Number of overrides active on this thread.
pub fn override_depth() -> usize {
    OVERRIDES.with(|stack| stack.borrow().len())
}

/// Pops the override it pushed when dropped, including on unwind.
struct OverrideGuard;

impl OverrideGuard {
    fn push(clock: Arc<dyn Clock>) -> Self {
        OVERRIDES.with(|stack| stack.borrow_mut().push(clock));
        OverrideGuard
    }
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        OVERRIDES.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc_date(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap().into()
    }

    #[test]
    fn test_default_is_wall_clock() {
        let before = Timestamp::from_datetime(&Utc::now());
        let t = now();
        let after = Timestamp::from_datetime(&Utc::now());
        assert!(before <= t && t <= after);
    }

    #[test]
    fn test_nested_overrides_restore() {
        with_override(
            |_| FixedClock(utc_date(2100, 1, 1)),
            || {
                assert_eq!(now(), utc_date(2100, 1, 1));
                with_override(
                    |_| FixedClock(utc_date(2200, 1, 1)),
                    || assert_eq!(now(), utc_date(2200, 1, 1)),
                );
                assert_eq!(now(), utc_date(2100, 1, 1));
            },
        );
        assert_eq!(override_depth(), 0);
    }

    #[test]
    fn test_factory_receives_original() {
        with_override(
            |_| FixedClock(utc_date(2100, 1, 1)),
            || {
                // Built from the wall clock, not from the 2100 override.
                with_override(
                    |original| OffsetClock::new(*original, 0),
                    || assert!(now() < utc_date(2100, 1, 1)),
                );
            },
        );
    }

    #[test]
    fn test_restored_after_panic() {
        let result = std::panic::catch_unwind(|| {
            with_override(|_| FixedClock(utc_date(2100, 1, 1)), || {
                panic!("boom");
            })
        });
        assert!(result.is_err());
        assert_eq!(override_depth(), 0);
        assert!(now() < utc_date(2100, 1, 1));
    }

    #[test]
    fn test_stepping_clock_ticks() {
        let start = utc_date(2000, 1, 1);
        with_override(
            |_| SteppingClock::per_second(start),
            || {
                assert_eq!(now(), start);
                assert_eq!(now(), start.add_seconds(1));
                assert_eq!(now(), start.add_seconds(2));
            },
        );
    }

    #[test]
    fn test_override_returns_action_value() {
        let value = with_override(|_| FixedClock(utc_date(2000, 1, 1)), || 42);
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_async_override_survives_await() {
        let t = with_override_async(
            |_| FixedClock(utc_date(2000, 1, 1)),
            || async {
                tokio::task::yield_now().await;
                now()
            },
        )
        .await;
        assert_eq!(t, utc_date(2000, 1, 1));
        assert_eq!(override_depth(), 0);
    }

    #[tokio::test]
    async fn test_async_override_hidden_between_polls() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(with_override_async(
            |_| FixedClock(utc_date(2000, 1, 1)),
            || async move {
                let _ = rx.await;
                now()
            },
        ));

        tokio::task::yield_now().await;
        // The suspended task's override does not leak into this one.
        assert_eq!(override_depth(), 0);
        assert!(now() > utc_date(2000, 1, 1));

        tx.send(()).unwrap();
        assert_eq!(task.await.unwrap(), utc_date(2000, 1, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_override_follows_task_across_threads() {
        let start = utc_date(2000, 1, 1);
        let reads = tokio::spawn(with_override_async(
            |_| SteppingClock::per_second(start),
            || async {
                let mut reads = Vec::new();
                for _ in 0..3 {
                    reads.push(now());
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                }
                reads
            },
        ))
        .await
        .unwrap();
        assert_eq!(reads, vec![start, start.add_seconds(1), start.add_seconds(2)]);
    }

    #[tokio::test]
    async fn test_async_override_nests_sync_override() {
        with_override_async(
            |_| FixedClock(utc_date(2100, 1, 1)),
            || async {
                tokio::task::yield_now().await;
                with_override(
                    |original| OffsetClock::new(*original, 0),
                    || assert!(now() < utc_date(2100, 1, 1)),
                );
                assert_eq!(now(), utc_date(2100, 1, 1));
            },
        )
        .await;
        assert_eq!(override_depth(), 0);
    }
}
