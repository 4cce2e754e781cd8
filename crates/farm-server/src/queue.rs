//! Asynchronous FIFO work queue with a single worker and a pluggable backend.
//!
//! Producers call [`WorkQueue::push`] from any task or thread; it never waits.
//! One [`QueueWorker`] pops items in order and hands each to a
//! [`QueueBackend`]. When the backend reports that its connection is down, the
//! worker keeps the *same* item, raises one alarm for the outage, reconnects
//! after [`QueueConfig::reconnect_interval`], and tries again. Items are never
//! reordered or skipped because of a disconnect.
//!
//! ```text
//!  producers ──push──► [ unbounded mpsc ] ──► QueueWorker ──► QueueBackend
//!                                              │
//!                                              └──► QueueObserver (alarm / recovered)
//! ```
//!
//! Shutdown is cooperative: [`WorkQueue::shutdown`] records a
//! [`ShutdownPolicy`], the worker finishes the item in hand (or abandons its
//! retry wait), then drains or discards what is left and returns a
//! [`QueueReport`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Error returned to producers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The worker has shut down or been asked to.
    #[error("queue '{0}' is closed")]
    Closed(String),
}

/// Failure reported by a backend for one attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The connection is unusable. The item is kept and retried after a
    /// reconnect.
    #[error("backend disconnected: {0}")]
    Disconnected(String),
    /// The backend refused this item. Retrying cannot help, so it is dropped.
    #[error("item rejected: {0}")]
    Rejected(String),
}

/// The capability set a queue drains into.
#[async_trait]
pub trait QueueBackend<T: Send + Sync>: Send {
    /// Opens (or reopens) the connection.
    async fn connect(&mut self) -> Result<(), BackendError>;

    fn is_connected(&self) -> bool;

    /// Applies one item completely or not at all.
    async fn process(&mut self, item: &T) -> Result<(), BackendError>;

    /// Called once after every successful [`connect`](Self::connect).
    async fn connection_established(&mut self) {}
}

/// Receives backend availability notifications.
///
/// Called from the worker task; implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait QueueObserver: Send + Sync {
    /// The backend went away. Sent once per outage.
    fn backend_unavailable(&self, queue: &str);
    /// The backend is back after an outage.
    fn backend_recovered(&self, queue: &str);
}

/// What happens to pending items on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Give each remaining item one more attempt.
    #[default]
    Drain,
    /// Drop remaining items without trying them.
    Discard,
}

/// Queue settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Name used in logs and alarms.
    pub name: String,
    /// Wait between reconnect attempts while the backend is down.
    pub reconnect_interval: Duration,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, reconnect_interval: Duration) -> Self {
        Self {
            name: name.into(),
            reconnect_interval,
        }
    }
}

/// Counts returned by [`QueueWorker::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Items the backend accepted.
    pub processed: usize,
    /// Items the backend rejected.
    pub dropped: usize,
    /// Items abandoned at shutdown.
    pub discarded: usize,
}

/// State shared between producer handles and the worker.
#[derive(Debug)]
struct Shared {
    name: String,
    pending: AtomicUsize,
    working: AtomicBool,
    shutdown: watch::Sender<Option<ShutdownPolicy>>,
}

/// Producer handle. Cheap to clone; every clone feeds the same worker.
pub struct WorkQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    shared: Arc<Shared>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> WorkQueue<T> {
    /// Creates a queue and the worker that drains it into `backend`.
    ///
    /// The worker does nothing until [`QueueWorker::run`] is awaited, usually
    /// via `tokio::spawn`.
    pub fn new<B>(
        config: QueueConfig,
        backend: B,
        observer: Arc<dyn QueueObserver>,
    ) -> (Self, QueueWorker<T, B>)
    where
        B: QueueBackend<T>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(None);
        let shared = Arc::new(Shared {
            name: config.name,
            pending: AtomicUsize::new(0),
            working: AtomicBool::new(true),
            shutdown: shutdown_tx,
        });
        let worker = QueueWorker {
            rx,
            shutdown: shutdown_rx,
            shared: Arc::clone(&shared),
            backend,
            observer,
            reconnect_interval: config.reconnect_interval,
            report: QueueReport::default(),
        };
        (Self { tx, shared }, worker)
    }

    /// Enqueues `item` at the tail. Never waits.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] after shutdown was requested or the
    /// worker is gone.
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        if self.shared.shutdown.borrow().is_some() {
            return Err(self.closed());
        }
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(item).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(self.closed());
        }
        Ok(())
    }
}

impl<T> WorkQueue<T> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Items pushed but not yet taken by the worker.
    pub fn len(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `false` while the backend is in an outage.
    pub fn is_working(&self) -> bool {
        self.shared.working.load(Ordering::Acquire)
    }

    /// Asks the worker to stop. The first request wins; later ones are ignored.
    pub fn shutdown(&self, policy: ShutdownPolicy) {
        let first = self.shared.shutdown.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(policy);
            true
        });
        if first {
            info!(queue = %self.shared.name, ?policy, "queue shutdown requested");
        }
    }

    fn closed(&self) -> QueueError {
        QueueError::Closed(self.shared.name.clone())
    }
}

/// Outcome of delivering one item.
enum Delivery<T> {
    Done,
    /// Shutdown arrived while the item waited for a reconnect.
    Interrupted(T, ShutdownPolicy),
}

/// The single consumer of a [`WorkQueue`].
pub struct QueueWorker<T, B> {
    rx: mpsc::UnboundedReceiver<T>,
    shutdown: watch::Receiver<Option<ShutdownPolicy>>,
    shared: Arc<Shared>,
    backend: B,
    observer: Arc<dyn QueueObserver>,
    reconnect_interval: Duration,
    report: QueueReport,
}

impl<T, B> QueueWorker<T, B>
where
    T: Send + Sync + 'static,
    B: QueueBackend<T>,
{
    /// Drains the queue until shutdown, then applies the shutdown policy.
    ///
    /// If every producer handle is dropped without a shutdown request, the
    /// worker processes what is left and exits.
    pub async fn run(mut self) -> QueueReport {
        info!(queue = %self.shared.name, "queue worker started");
        let mut carried = None;
        let policy = loop {
            let item = tokio::select! {
                biased;
                policy = shutdown_requested(&mut self.shutdown) => break policy,
                item = self.rx.recv() => match item {
                    Some(item) => item,
                    None => break ShutdownPolicy::Drain,
                },
            };
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);

            if let Delivery::Interrupted(item, policy) = self.deliver(item).await {
                carried = Some(item);
                break policy;
            }
        };
        self.finish(policy, carried).await
    }

    /// Delivers one item, retrying it across reconnects until it is applied,
    /// rejected, or shutdown interrupts the wait.
    async fn deliver(&mut self, item: T) -> Delivery<T> {
        loop {
            match self.attempt(&item).await {
                Ok(()) => {
                    self.report.processed += 1;
                    return Delivery::Done;
                }
                Err(BackendError::Rejected(reason)) => {
                    error!(queue = %self.shared.name, %reason, "backend rejected item; dropping it");
                    self.report.dropped += 1;
                    return Delivery::Done;
                }
                Err(BackendError::Disconnected(reason)) => {
                    self.mark_unavailable(&reason);
                    tokio::select! {
                        biased;
                        policy = shutdown_requested(&mut self.shutdown) => {
                            return Delivery::Interrupted(item, policy);
                        }
                        _ = tokio::time::sleep(self.reconnect_interval) => {
                            debug!(queue = %self.shared.name, "retrying item after reconnect wait");
                        }
                    }
                }
            }
        }
    }

    /// One connect-if-needed plus process attempt.
    async fn attempt(&mut self, item: &T) -> Result<(), BackendError> {
        if !self.backend.is_connected() {
            if let Err(e) = self.backend.connect().await {
                let reason = match e {
                    BackendError::Disconnected(r) | BackendError::Rejected(r) => r,
                };
                return Err(BackendError::Disconnected(reason));
            }
            info!(queue = %self.shared.name, "backend connection established");
            self.backend.connection_established().await;
            self.mark_working();
        }
        let result = self.backend.process(item).await;
        if !matches!(result, Err(BackendError::Disconnected(_))) {
            self.mark_working();
        }
        result
    }

    async fn finish(mut self, policy: ShutdownPolicy, carried: Option<T>) -> QueueReport {
        self.rx.close();
        let mut remaining: Vec<T> = carried.into_iter().collect();
        while let Ok(item) = self.rx.try_recv() {
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            remaining.push(item);
        }

        match policy {
            ShutdownPolicy::Discard => {
                if !remaining.is_empty() {
                    warn!(queue = %self.shared.name, count = remaining.len(), "discarding pending items");
                }
                self.report.discarded += remaining.len();
            }
            ShutdownPolicy::Drain => {
                for item in remaining {
                    match self.attempt(&item).await {
                        Ok(()) => self.report.processed += 1,
                        Err(BackendError::Rejected(reason)) => {
                            error!(queue = %self.shared.name, %reason, "backend rejected item; dropping it");
                            self.report.dropped += 1;
                        }
                        Err(BackendError::Disconnected(reason)) => {
                            self.mark_unavailable(&reason);
                            warn!(queue = %self.shared.name, %reason, "discarding item during shutdown");
                            self.report.discarded += 1;
                        }
                    }
                }
            }
        }

        info!(
            queue = %self.shared.name,
            processed = self.report.processed,
            dropped = self.report.dropped,
            discarded = self.report.discarded,
            "queue worker stopped"
        );
        self.report
    }

    fn mark_unavailable(&self, reason: &str) {
        if self.shared.working.swap(false, Ordering::AcqRel) {
            warn!(queue = %self.shared.name, %reason, "backend unavailable");
            self.observer.backend_unavailable(&self.shared.name);
        } else {
            debug!(queue = %self.shared.name, %reason, "backend still unavailable");
        }
    }

    fn mark_working(&self) {
        if !self.shared.working.swap(true, Ordering::AcqRel) {
            info!(queue = %self.shared.name, "backend recovered");
            self.observer.backend_recovered(&self.shared.name);
        }
    }
}

/// Resolves once a shutdown policy is set. Never resolves if every producer
/// handle is gone without one.
async fn shutdown_requested(rx: &mut watch::Receiver<Option<ShutdownPolicy>>) -> ShutdownPolicy {
    loop {
        let current = *rx.borrow_and_update();
        if let Some(policy) = current {
            return policy;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
