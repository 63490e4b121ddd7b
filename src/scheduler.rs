use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use crate::error::VitalsError;

pub type Task = Box<dyn FnOnce() + Send + 'static>;
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Timer source for the distributor.
///
/// Production code runs on [`TokioScheduler`]; tests drive a
/// [`VirtualScheduler`] by hand.
pub trait Scheduler: Send + Sync {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;

    /// Run `task` once after `delay`.
    fn schedule_once(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Run `task` every `interval`, first firing one interval from now.
    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TimerHandle;
}

// ─── Timer handles ───────────────────────────────────────────────

/// Cancellation handle for a scheduled timer. Cancelling twice is a no-op.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            abort: None,
        }
    }

    fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    fn token(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

// ─── Tokio ───────────────────────────────────────────────────────

/// Wall-clock timers backed by tokio tasks.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime of the calling task.
    pub fn current() -> Result<Self, VitalsError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| VitalsError::ResourceUnavailable("no tokio runtime"))
    }
}

impl Scheduler for TokioScheduler {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }

    fn schedule_once(&self, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::new();
        let cancelled = handle.token();

        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !cancelled.load(Ordering::SeqCst) {
                task();
            }
        });

        handle.with_abort(join.abort_handle())
    }

    fn schedule_repeating(&self, interval: Duration, mut task: RepeatingTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let cancelled = handle.token();
        let interval = interval.max(Duration::from_millis(1));

        let join = self.runtime.spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }
                task();
            }
        });

        handle.with_abort(join.abort_handle())
    }
}

// ─── Virtual clock ───────────────────────────────────────────────

/// Manually advanced clock. Nothing fires until [`advance`] is called;
/// due timers then run on the caller's thread in deadline order.
///
/// [`advance`]: VirtualScheduler::advance
pub struct VirtualScheduler {
    state: Mutex<VirtualState>,
}

struct VirtualState {
    now_ms: u64,
    next_seq: u64,
    /// Keyed by (deadline, insertion order) so equal deadlines stay FIFO.
    queue: BTreeMap<(u64, u64), VirtualTimer>,
}

struct VirtualTimer {
    cancelled: Arc<AtomicBool>,
    job: Job,
}

enum Job {
    Once(Task),
    Repeating { every_ms: u64, task: RepeatingTask },
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(origin_ms: u64) -> Self {
        Self {
            state: Mutex::new(VirtualState {
                now_ms: origin_ms,
                next_seq: 0,
                queue: BTreeMap::new(),
            }),
        }
    }

    fn insert(&self, due_ms: u64, timer: VirtualTimer) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.insert((due_ms, seq), timer);
    }

    /// Remove the earliest timer due at or before `target_ms`, moving the
    /// clock to its deadline.
    fn pop_due(&self, target_ms: u64) -> Option<(u64, VirtualTimer)> {
        let mut state = self.state.lock();
        let (&key, _) = state.queue.first_key_value()?;
        if key.0 > target_ms {
            return None;
        }
        state.now_ms = state.now_ms.max(key.0);
        state.queue.remove(&key).map(|t| (key.0, t))
    }

    /// Move the clock forward, running every timer that comes due.
    /// Returns how many callbacks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now_ms().saturating_add(millis(by));
        let mut fired = 0;

        // The lock is released while a task runs so it can schedule more work.
        while let Some((due, timer)) = self.pop_due(target) {
            if timer.cancelled.load(Ordering::SeqCst) {
                continue;
            }
            match timer.job {
                Job::Once(task) => {
                    task();
                    fired += 1;
                }
                Job::Repeating { every_ms, mut task } => {
                    task();
                    fired += 1;
                    if !timer.cancelled.load(Ordering::SeqCst) {
                        self.insert(
                            due + every_ms,
                            VirtualTimer {
                                cancelled: timer.cancelled,
                                job: Job::Repeating { every_ms, task },
                            },
                        );
                    }
                }
            }
        }

        let mut state = self.state.lock();
        state.now_ms = state.now_ms.max(target);
        fired
    }

    /// Timers still waiting to fire.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .queue
            .values()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .count()
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for VirtualScheduler {
    fn now_ms(&self) -> u64 {
        self.state.lock().now_ms
    }

    fn schedule_once(&self, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::new();
        let due = self.now_ms().saturating_add(millis(delay));
        self.insert(
            due,
            VirtualTimer {
                cancelled: handle.token(),
                job: Job::Once(task),
            },
        );
        handle
    }

    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let every_ms = millis(interval).max(1);
        let due = self.now_ms().saturating_add(every_ms);
        self.insert(
            due,
            VirtualTimer {
                cancelled: handle.token(),
                job: Job::Repeating { every_ms, task },
            },
        );
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let c = Arc::new(AtomicUsize::new(0));
        let read = {
            let c = c.clone();
            move || c.load(Ordering::SeqCst)
        };
        (c, read)
    }

    #[test]
    fn virtual_once_fires_at_deadline() {
        let sched = VirtualScheduler::new();
        let (c, count) = counter();
        sched.schedule_once(
            Duration::from_millis(500),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(sched.advance(Duration::from_millis(499)), 0);
        assert_eq!(count(), 0);
        assert_eq!(sched.advance(Duration::from_millis(1)), 1);
        assert_eq!(count(), 1);
        assert_eq!(sched.now_ms(), 500);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn virtual_repeating_fires_each_interval() {
        let sched = VirtualScheduler::starting_at(1_000);
        let (c, count) = counter();
        let handle = sched.schedule_repeating(
            Duration::from_secs(3),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        sched.advance(Duration::from_secs(10));
        assert_eq!(count(), 3);
        assert_eq!(sched.now_ms(), 11_000);

        handle.cancel();
        handle.cancel();
        sched.advance(Duration::from_secs(30));
        assert_eq!(count(), 3);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn virtual_clock_is_visible_inside_tasks() {
        let sched = Arc::new(VirtualScheduler::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let sched2 = sched.clone();
            let seen = seen.clone();
            sched.schedule_repeating(
                Duration::from_millis(250),
                Box::new(move || seen.lock().push(sched2.now_ms())),
            );
        }
        sched.advance(Duration::from_secs(1));
        assert_eq!(*seen.lock(), vec![250, 500, 750, 1_000]);
    }

    #[test]
    fn tasks_may_schedule_more_work() {
        let sched = Arc::new(VirtualScheduler::new());
        let (c, count) = counter();
        {
            let inner = sched.clone();
            sched.schedule_once(
                Duration::from_millis(10),
                Box::new(move || {
                    inner.schedule_once(
                        Duration::from_millis(10),
                        Box::new(move || {
                            c.fetch_add(1, Ordering::SeqCst);
                        }),
                    );
                }),
            );
        }
        sched.advance(Duration::from_millis(20));
        assert_eq!(count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_repeating_stops_after_cancel() {
        let sched = TokioScheduler::current().unwrap();
        let (c, count) = counter();
        let handle = sched.schedule_repeating(
            Duration::from_secs(1),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(count(), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_once_can_be_cancelled() {
        let sched = TokioScheduler::current().unwrap();
        let (c, count) = counter();
        let handle = sched.schedule_once(
            Duration::from_millis(200),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count(), 0);
    }

    #[test]
    fn tokio_scheduler_needs_a_runtime() {
        let err = TokioScheduler::current().unwrap_err();
        assert!(err.is_unavailable());
    }
}
