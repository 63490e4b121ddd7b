use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::VitalsError;
use crate::metrics::profile::Profile;
use crate::metrics::timeline::aggregate_point;
use crate::metrics::{
    AggregatePoint, MeasurementSource, Method, MetricsCollector, MetricsSnapshot, RollingBuffer,
    Sample,
};
use crate::scheduler::{Scheduler, TimerHandle};

// ─── Configuration ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Cadence of the combined chart point
    pub aggregate_interval: Duration,
    /// Maximum points kept for the chart
    pub buffer_capacity: usize,
    /// Per-subscription refresh interval is `refresh_base + U * refresh_jitter`
    pub refresh_base: Duration,
    pub refresh_jitter: Duration,
    /// Delivered samples kept per method for summaries
    pub window: usize,
    pub seed: Option<u64>,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            aggregate_interval: Duration::from_secs(3),
            buffer_capacity: 10,
            refresh_base: Duration::from_secs(5),
            refresh_jitter: Duration::from_secs(10),
            window: crate::metrics::collector::DEFAULT_WINDOW,
            seed: None,
        }
    }
}

// ─── Subscription state ──────────────────────────────────────────

/// Lifecycle of one subscription. `Loading` is entered at subscribe time,
/// `Ready` on the first delivered sample, `Disposed` from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Loading,
    Ready,
    Disposed,
}

type Listener = Box<dyn Fn(&Sample) + Send + Sync + 'static>;

struct SubscriptionInner {
    id: Uuid,
    method: Method,
    state: Mutex<SubscriptionState>,
    latest: Mutex<Option<Sample>>,
    /// Held for the whole of one delivery so callbacks never overlap, and by
    /// `dispose` so a disposal waits out a callback running on another
    /// thread. Reentrant so a listener or source may dispose its own
    /// subscription.
    delivery: ReentrantMutex<()>,
    /// The one live timer: the loading delay, then the refresh interval.
    timer: Mutex<Option<TimerHandle>>,
    listener: Listener,
}

impl SubscriptionInner {
    fn state(&self) -> SubscriptionState {
        *self.state.lock()
    }

    fn is_disposed(&self) -> bool {
        self.state() == SubscriptionState::Disposed
    }

    fn mark_ready(&self) {
        let mut state = self.state.lock();
        if *state == SubscriptionState::Loading {
            *state = SubscriptionState::Ready;
        }
    }

    /// Returns `false` if already disposed.
    fn dispose(&self) -> bool {
        let _serial = self.delivery.lock();
        {
            let mut state = self.state.lock();
            if *state == SubscriptionState::Disposed {
                return false;
            }
            *state = SubscriptionState::Disposed;
        }
        if let Some(timer) = self.timer.lock().take() {
            timer.cancel();
        }
        true
    }
}

/// Handle returned by [`Distributor::subscribe`].
///
/// Dropping the handle disposes the subscription.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
    owner: Weak<Shared>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn method(&self) -> Method {
        self.inner.method
    }

    pub fn state(&self) -> SubscriptionState {
        self.inner.state()
    }

    /// `true` until the first sample has been delivered.
    pub fn is_loading(&self) -> bool {
        self.state() == SubscriptionState::Loading
    }

    pub fn latest(&self) -> Option<Sample> {
        self.inner.latest.lock().clone()
    }

    /// Stop the timer and drop the callback. Safe to call repeatedly.
    pub fn dispose(&self) {
        if !self.inner.dispose() {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            owner.subscriptions.lock().remove(&self.inner.id);
        }
        debug!(id = %self.inner.id, method = %self.inner.method, "subscription disposed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("method", &self.inner.method)
            .field("state", &self.state())
            .finish()
    }
}

// ─── Distributor ─────────────────────────────────────────────────

/// Schedules sampling per subscription, fans samples out to listeners and
/// maintains the rolling chart series.
pub struct Distributor {
    shared: Arc<Shared>,
}

struct Shared {
    scheduler: Arc<dyn Scheduler>,
    source: Arc<dyn MeasurementSource>,
    config: DistributorConfig,
    rng: Mutex<StdRng>,
    subscriptions: Mutex<HashMap<Uuid, Arc<SubscriptionInner>>>,
    /// Last timestamp handed out per method; keeps stamps monotonic.
    last_stamp: Mutex<[u64; 5]>,
    collector: MetricsCollector,
    timeline: RollingBuffer<AggregatePoint>,
    aggregate_timer: Mutex<Option<TimerHandle>>,
    disposed: AtomicBool,
}

impl Distributor {
    /// Build a distributor and start its aggregate timer.
    pub fn create(
        scheduler: Arc<dyn Scheduler>,
        source: Arc<dyn MeasurementSource>,
        config: DistributorConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let shared = Arc::new(Shared {
            collector: MetricsCollector::new(config.window),
            timeline: RollingBuffer::new(config.buffer_capacity),
            scheduler,
            source,
            rng: Mutex::new(rng),
            subscriptions: Mutex::new(HashMap::new()),
            last_stamp: Mutex::new([0; 5]),
            aggregate_timer: Mutex::new(None),
            disposed: AtomicBool::new(false),
            config,
        });

        let weak = Arc::downgrade(&shared);
        let timer = shared.scheduler.schedule_repeating(
            shared.config.aggregate_interval,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.push_aggregate();
                }
            }),
        );
        *shared.aggregate_timer.lock() = Some(timer);

        info!(
            aggregate_ms = shared.config.aggregate_interval.as_millis() as u64,
            capacity = shared.timeline.capacity(),
            "distributor started"
        );

        Self { shared }
    }

    /// Register `listener` for future samples of `method`.
    ///
    /// The first sample arrives after the method's simulated loading delay;
    /// later samples follow on a per-subscription randomized interval.
    pub fn subscribe<F>(&self, method: Method, listener: F) -> Subscription
    where
        F: Fn(&Sample) + Send + Sync + 'static,
    {
        let inner = Arc::new(SubscriptionInner {
            id: Uuid::new_v4(),
            method,
            state: Mutex::new(SubscriptionState::Loading),
            latest: Mutex::new(None),
            delivery: ReentrantMutex::new(()),
            timer: Mutex::new(None),
            listener: Box::new(listener),
        });
        let handle = Subscription {
            inner: inner.clone(),
            owner: Arc::downgrade(&self.shared),
        };

        if self.is_disposed() {
            warn!(%method, "subscribe on a disposed distributor");
            inner.dispose();
            return handle;
        }

        let delay = {
            let mut rng = self.shared.rng.lock();
            Profile::of(method).loading.draw(&mut *rng)
        };

        self.shared
            .subscriptions
            .lock()
            .insert(inner.id, inner.clone());

        // Holding the slot while scheduling keeps the refresh timer, which
        // the loading task installs, from being overwritten here.
        {
            let mut slot = inner.timer.lock();
            let shared = Arc::downgrade(&self.shared);
            let sub = Arc::downgrade(&inner);
            *slot = Some(self.shared.scheduler.schedule_once(
                Duration::from_millis(delay.round() as u64),
                Box::new(move || {
                    if let (Some(shared), Some(sub)) = (shared.upgrade(), sub.upgrade()) {
                        shared.deliver(&sub);
                        shared.start_refresh(&sub);
                    }
                }),
            ));
        }

        debug!(id = %inner.id, %method, delay_ms = delay.round() as u64, "subscribed");
        handle
    }

    /// Like [`subscribe`](Self::subscribe) but takes a method tag, failing
    /// fast on anything unrecognized.
    pub fn subscribe_tag<F>(&self, tag: &str, listener: F) -> Result<Subscription, VitalsError>
    where
        F: Fn(&Sample) + Send + Sync + 'static,
    {
        let method: Method = tag.parse()?;
        Ok(self.subscribe(method, listener))
    }

    /// Dispose every live subscription. Returns how many were stopped.
    pub fn unsubscribe_all(&self) -> usize {
        let subs: Vec<_> = self
            .shared
            .subscriptions
            .lock()
            .drain()
            .map(|(_, sub)| sub)
            .collect();

        let stopped = subs.iter().filter(|sub| sub.dispose()).count();
        if stopped > 0 {
            debug!(stopped, "all subscriptions disposed");
        }
        stopped
    }

    /// Stop the aggregate timer and every subscription. Idempotent.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(timer) = self.shared.aggregate_timer.lock().take() {
            timer.cancel();
        }
        let stopped = self.unsubscribe_all();
        info!(stopped, "distributor disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// Current chart series, oldest first.
    pub fn rolling_buffer(&self) -> Arc<[AggregatePoint]> {
        self.shared.timeline.snapshot()
    }

    /// Most recent sample delivered for `method` to any subscriber.
    pub fn latest(&self, method: Method) -> Option<Sample> {
        self.shared.collector.latest(method)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.shared.collector.snapshot()
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.subscriptions.lock().len()
    }

    pub fn config(&self) -> &DistributorConfig {
        &self.shared.config
    }
}

impl Drop for Distributor {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ─── Timer callbacks ─────────────────────────────────────────────

impl Shared {
    /// Clock reading for `method`, never earlier than its previous stamp.
    fn stamp(&self, method: Method) -> u64 {
        let now = self.scheduler.now_ms();
        let mut last = self.last_stamp.lock();
        let slot = &mut last[method.index()];
        *slot = (*slot).max(now);
        *slot
    }

    fn refresh_interval(&self) -> Duration {
        let jitter_ms = self.config.refresh_jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            self.rng.lock().gen_range(0..=jitter_ms)
        };
        self.config.refresh_base + Duration::from_millis(extra)
    }

    fn deliver(&self, sub: &SubscriptionInner) {
        let _serial = sub.delivery.lock();
        if sub.is_disposed() {
            return;
        }

        let now = self.stamp(sub.method);
        let sample = match self.source.measure(sub.method, now) {
            Ok(sample) => sample,
            Err(e) if e.is_unavailable() => {
                warn!(method = %sub.method, error = %e, "no measurement backend, reporting empty sample");
                Sample::unavailable(sub.method, now)
            }
            Err(e) => {
                warn!(id = %sub.id, method = %sub.method, error = %e, "sample skipped");
                return;
            }
        };

        // The source may have disposed us while measuring.
        if sub.is_disposed() {
            trace!(id = %sub.id, method = %sub.method, "sample dropped after dispose");
            return;
        }

        self.collector.record(&sample);
        *sub.latest.lock() = Some(sample.clone());
        sub.mark_ready();

        trace!(id = %sub.id, method = %sub.method, ts = sample.timestamp_ms, "sample delivered");
        (sub.listener)(&sample);
    }

    /// Replace the loading timer with the repeating refresh timer.
    fn start_refresh(self: &Arc<Self>, sub: &Arc<SubscriptionInner>) {
        let mut slot = sub.timer.lock();
        if sub.is_disposed() {
            return;
        }

        let every = self.refresh_interval();
        let shared = Arc::downgrade(self);
        let weak_sub = Arc::downgrade(sub);
        *slot = Some(self.scheduler.schedule_repeating(
            every,
            Box::new(move || {
                if let (Some(shared), Some(sub)) = (shared.upgrade(), weak_sub.upgrade()) {
                    shared.deliver(&sub);
                }
            }),
        ));

        debug!(id = %sub.id, method = %sub.method, every_ms = every.as_millis() as u64, "refresh timer started");
    }

    fn push_aggregate(&self) {
        let now = self.scheduler.now_ms();
        let point = {
            let mut rng = self.rng.lock();
            aggregate_point(&mut *rng, now)
        };
        trace!(ts = now, "aggregate point");
        self.timeline.push(point);
    }
}
