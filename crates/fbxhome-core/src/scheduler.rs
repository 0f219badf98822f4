// ── Poll scheduler ──
//
// Fires reconciliation passes on a fixed interval and on demand. A single
// gate guarantees at most one pass in flight: a trigger arriving while a
// pass runs is dropped (`TriggerOutcome::Skipped`), not queued.
//
// Failed passes are not retried within a cycle. The next attempt is the
// next tick (or the next manual trigger); missed ticks are skipped rather
// than bursted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::PollError;
use crate::store::SnapshotDelta;

/// One reconciliation pass.
#[async_trait]
pub trait PassRunner: Send + Sync {
    async fn run_pass(&self) -> Result<Arc<SnapshotDelta>, PollError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Debug)]
pub enum TriggerOutcome {
    /// A pass was already in flight (or the scheduler was stopped); this
    /// trigger was dropped.
    Skipped,
    Completed(Result<Arc<SnapshotDelta>, PollError>),
}

struct SchedulerInner {
    runner: Arc<dyn PassRunner>,
    running: AtomicBool,
    stopped: AtomicBool,
    state: watch::Sender<SchedulerState>,
}

/// Cheaply cloneable handle; clones share the same gate.
#[derive(Clone)]
pub struct PollScheduler {
    inner: Arc<SchedulerInner>,
}

/// Releases the gate on every exit path, unwinding included.
struct PassGuard<'a> {
    inner: &'a SchedulerInner,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.state.send_replace(SchedulerState::Idle);
    }
}

impl PollScheduler {
    pub fn new(runner: Arc<dyn PassRunner>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            inner: Arc::new(SchedulerInner {
                runner,
                running: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                state,
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.inner.state.subscribe()
    }

    fn try_begin(&self) -> Option<PassGuard<'_>> {
        self.inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.inner.state.send_replace(SchedulerState::Running);
        let guard = PassGuard { inner: &self.inner };
        // Checked after `Running` is visible so `stop()` either sees this
        // pass or this pass sees the stop.
        if self.inner.stopped.load(Ordering::SeqCst) {
            return None;
        }
        Some(guard)
    }

    /// Refuse new passes and wait for the one in flight, if any, to
    /// finish. Idempotent.
    pub async fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        let mut state = self.inner.state.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = state.wait_for(|s| *s == SchedulerState::Idle).await;
    }

    /// Run a pass now unless one is already in flight.
    pub async fn trigger_now(&self) -> TriggerOutcome {
        let Some(_guard) = self.try_begin() else {
            debug!("pass already in flight or scheduler stopped, trigger dropped");
            return TriggerOutcome::Skipped;
        };
        TriggerOutcome::Completed(self.inner.runner.run_pass().await)
    }

    /// Spawn the periodic trigger. The immediate first tick is consumed:
    /// the host runs its own initial pass. Cancelling `cancel` stops the
    /// wait for the next tick; a pass already started runs to completion
    /// before the task exits.
    pub fn run_periodic(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                match scheduler.trigger_now().await {
                    TriggerOutcome::Skipped => {}
                    TriggerOutcome::Completed(Ok(delta)) => {
                        debug!(
                            added = delta.added.len(),
                            changed = delta.changed.len(),
                            "periodic pass complete"
                        );
                    }
                    TriggerOutcome::Completed(Err(e)) => {
                        warn!(error = %e, "periodic pass failed; next attempt at next tick");
                    }
                }
            }
            debug!("poll scheduler stopped");
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    /// Counts passes; each pass sleeps `work` and optionally fails/panics.
    struct CountingRunner {
        passes: AtomicUsize,
        concurrent: AtomicUsize,
        max_concurrent: AtomicUsize,
        work: Duration,
        fail: bool,
        panic_first: AtomicBool,
    }

    impl CountingRunner {
        fn new(work: Duration) -> Self {
            Self {
                passes: AtomicUsize::new(0),
                concurrent: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(0),
                work,
                fail: false,
                panic_first: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl PassRunner for CountingRunner {
        async fn run_pass(&self) -> Result<Arc<SnapshotDelta>, PollError> {
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(now, Ordering::SeqCst);
            self.passes.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.work).await;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);
            assert!(
                !self.panic_first.swap(false, Ordering::SeqCst),
                "scripted pass panic"
            );
            if self.fail {
                return Err(PollError::Unavailable {
                    reason: "scripted".into(),
                });
            }
            Ok(Arc::new(SnapshotDelta::default()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_triggers_are_skipped() {
        let runner = Arc::new(CountingRunner::new(Duration::from_secs(5)));
        let scheduler = PollScheduler::new(Arc::clone(&runner) as Arc<dyn PassRunner>);

        let first = tokio::spawn({
            let s = scheduler.clone();
            async move { s.trigger_now().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(scheduler.state(), SchedulerState::Running);

        for _ in 0..5 {
            assert!(matches!(scheduler.trigger_now().await, TriggerOutcome::Skipped));
        }

        assert!(matches!(first.await.unwrap(), TriggerOutcome::Completed(Ok(_))));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(runner.passes.load(Ordering::SeqCst), 1);
        assert_eq!(runner.max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pass_returns_to_idle() {
        let mut runner = CountingRunner::new(Duration::from_millis(10));
        runner.fail = true;
        let scheduler = PollScheduler::new(Arc::new(runner));

        let outcome = scheduler.trigger_now().await;
        assert!(matches!(outcome, TriggerOutcome::Completed(Err(PollError::Unavailable { .. }))));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_pass_releases_the_gate() {
        let runner = CountingRunner::new(Duration::from_millis(10));
        runner.panic_first.store(true, Ordering::SeqCst);
        let runner = Arc::new(runner);
        let scheduler = PollScheduler::new(Arc::clone(&runner) as Arc<dyn PassRunner>);

        let crashed = tokio::spawn({
            let s = scheduler.clone();
            async move { s.trigger_now().await }
        })
        .await;
        assert!(crashed.is_err());
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        assert!(matches!(scheduler.trigger_now().await, TriggerOutcome::Completed(Ok(_))));
        assert_eq!(runner.passes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_ticks_skip_the_first_and_retry_only_at_next_tick() {
        let mut runner = CountingRunner::new(Duration::from_millis(1));
        runner.fail = true;
        let runner = Arc::new(runner);
        let scheduler = PollScheduler::new(Arc::clone(&runner) as Arc<dyn PassRunner>);
        let cancel = CancellationToken::new();

        let handle = scheduler.run_periodic(Duration::from_secs(40), cancel.clone());

        tokio::time::sleep(Duration::from_secs(39)).await;
        assert_eq!(runner.passes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.passes.load(Ordering::SeqCst), 1);

        // The failed pass is not retried before the next tick.
        tokio::time::sleep(Duration::from_secs(38)).await;
        assert_eq!(runner.passes.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runner.passes.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_lets_a_pass_in_flight_finish() {
        let runner = Arc::new(CountingRunner::new(Duration::from_secs(30)));
        let scheduler = PollScheduler::new(Arc::clone(&runner) as Arc<dyn PassRunner>);
        let cancel = CancellationToken::new();
        let handle = scheduler.run_periodic(Duration::from_secs(1), cancel.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(scheduler.state(), SchedulerState::Running);

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(runner.passes.load(Ordering::SeqCst), 1);
        assert_eq!(runner.concurrent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_the_pass_and_refuses_new_ones() {
        let runner = Arc::new(CountingRunner::new(Duration::from_secs(5)));
        let scheduler = PollScheduler::new(Arc::clone(&runner) as Arc<dyn PassRunner>);

        let pass = tokio::spawn({
            let s = scheduler.clone();
            async move { s.trigger_now().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(scheduler.state(), SchedulerState::Running);

        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(runner.concurrent.load(Ordering::SeqCst), 0);
        assert!(matches!(pass.await.unwrap(), TriggerOutcome::Completed(Ok(_))));

        assert!(matches!(scheduler.trigger_now().await, TriggerOutcome::Skipped));
        assert_eq!(runner.passes.load(Ordering::SeqCst), 1);
        scheduler.stop().await;
    }
}
