//! Event router
//!
//! Runs handlers on a worker pool bounded by a semaphore and serializes
//! events per deployment unit with one async mutex per unit key.

use super::{Event, EventHandler, EventKind};
use crate::error::{BridgeError, Result};
use crate::observability::{BridgeMetrics, StructuredLogger};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for the event router
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Maximum number of events handled concurrently (default: 250)
    pub worker_count: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { worker_count: 250 }
    }
}

/// Dispatches events to a handler
#[derive(Clone)]
pub struct EventRouter {
    handler: Arc<dyn EventHandler>,
    workers: Arc<Semaphore>,
    /// Unit key -> lock held while an event for that unit is handled
    unit_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    in_flight: Arc<AtomicUsize>,
    background: Arc<Background>,
    metrics: BridgeMetrics,
    logger: StructuredLogger,
}

/// Events handed to [`EventRouter::spawn`] that have not finished
#[derive(Default)]
struct Background {
    pending: AtomicUsize,
    idle: Notify,
}

impl EventRouter {
    pub fn new(
        handler: Arc<dyn EventHandler>,
        config: RouterConfig,
        metrics: BridgeMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            handler,
            workers: Arc::new(Semaphore::new(config.worker_count.max(1))),
            unit_locks: Arc::new(DashMap::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            background: Arc::new(Background::default()),
            metrics,
            logger,
        }
    }

    /// Handle one event and wait for the result
    ///
    /// Unknown events are acknowledged without reaching the handler.
    pub async fn dispatch(&self, event: Event) -> Result<()> {
        let kind = event.kind();
        self.metrics.inc_events_received(kind.metric_label());

        if let EventKind::Unknown(_) = kind {
            self.logger.log_event_ignored(&event.id, &event.name);
            return Ok(());
        }

        let event_id = event.id.clone();
        let key = event.unit_key().to_string();

        let result = {
            // Declared first so it drops last, after the lock is released
            let _release = UnitRelease {
                router: self,
                key: &key,
            };
            let lock = self.unit_lock(&key);
            let _unit = lock.lock().await;
            match self.workers.acquire().await {
                Ok(_worker) => {
                    debug!(event_id = %event_id, event = %kind, unit = %key, "Handling event");
                    let _in_flight = InFlight::enter(self);
                    self.handler.handle(event).await
                }
                Err(_) => Err(BridgeError::RouterClosed),
            }
        };

        if let Err(e) = &result {
            self.metrics.inc_events_failed(kind.metric_label());
            self.logger
                .log_event_failed(&event_id, kind.as_str(), &e.to_string());
        }

        result
    }

    /// Handle an event in the background
    ///
    /// Failures are logged and counted by [`EventRouter::dispatch`].
    pub fn spawn(&self, event: Event) -> JoinHandle<()> {
        let router = self.clone();
        let pending = Pending::start(self.background.clone());
        tokio::spawn(async move {
            let _pending = pending;
            let _ = router.dispatch(event).await;
        })
    }

    /// Wait until every spawned event has finished, at most `timeout`
    ///
    /// Returns the number of events still running when the wait ended.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let background = &self.background;
        let wait = async {
            loop {
                let idle = background.idle.notified();
                tokio::pin!(idle);
                idle.as_mut().enable();
                if background.pending.load(Ordering::SeqCst) == 0 {
                    return;
                }
                idle.await;
            }
        };

        let _ = tokio::time::timeout(timeout, wait).await;
        self.pending()
    }

    /// Number of spawned events not yet finished
    pub fn pending(&self) -> usize {
        self.background.pending.load(Ordering::SeqCst)
    }

    /// Stop accepting work; queued and later events fail with `RouterClosed`
    ///
    /// Call [`EventRouter::drain`] first to let accepted events finish.
    pub fn close(&self) {
        self.workers.close();
    }

    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// Number of events inside the handler right now
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of deployment units with an event queued or running
    pub fn active_units(&self) -> usize {
        self.unit_locks.len()
    }

    fn unit_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.unit_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the unit's lock once nobody else holds or waits on it
    fn release_unit_lock(&self, key: &str) {
        self.unit_locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Counts an event as in flight until dropped, also on panic
struct InFlight<'a> {
    router: &'a EventRouter,
}

impl<'a> InFlight<'a> {
    fn enter(router: &'a EventRouter) -> Self {
        router.in_flight.fetch_add(1, Ordering::SeqCst);
        router.metrics.add_in_flight(1);
        Self { router }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.router.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.router.metrics.add_in_flight(-1);
    }
}

/// Drops the unit's lock entry when the dispatch ends, also on panic
struct UnitRelease<'a> {
    router: &'a EventRouter,
    key: &'a str,
}

impl Drop for UnitRelease<'_> {
    fn drop(&mut self) {
        self.router.release_unit_lock(self.key);
    }
}

/// Marks one spawned event as pending until the task ends, also on panic
struct Pending {
    background: Arc<Background>,
}

impl Pending {
    fn start(background: Arc<Background>) -> Self {
        background.pending.fetch_add(1, Ordering::SeqCst);
        Self { background }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if self.background.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.background.idle.notify_waiters();
        }
    }
}
