//! # Sync Queue
//!
//! Durable FIFO queue that replays offline survey work once connectivity
//! returns.
//!
//! ## Behavior
//!
//! - **Persistent**: the whole queue is one JSON array under a single
//!   storage key, rewritten after every mutation, so items survive restarts
//! - **FIFO drain**: items are attempted oldest first; success removes the
//!   item immediately
//! - **Retry budget**: a rejection burns one retry; items that exhaust their
//!   budget are parked, skipped, and kept for manual recovery
//! - **Network aborts**: a transport failure ends the whole drain without
//!   charging any item, because it says nothing about the payloads
//! - **Single flight**: concurrent drain calls collapse into one; the loser
//!   returns an empty report
//!
//! The engine never runs work on a timer. Drains happen when something is
//! enqueued while online, when connectivity flips to online, or when the
//! host calls [`SyncQueue::sync`] directly.

pub mod item;
pub mod uploader;

pub use item::{MediaJob, SyncJob, SyncQueueItem, VerticesJob};
pub use uploader::{MediaCompressor, Uploader};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::BackendError;
use crate::config::{AppConfig, DEFAULT_MAX_RETRIES};
use crate::network::ReachabilityMonitor;
use crate::storage::{keys, KeyValueStore, StorageError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("queue serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("local file missing: {path}")]
    FileNotFound { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// True when the failure is connectivity, not payload. Transient
    /// failures abort the drain instead of consuming retry budget.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(error) if error.is_transient())
    }
}

/// Tuning for the queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Retry budget per item.
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl From<&AppConfig> for QueueConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
        }
    }
}

/// What one drain pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items uploaded and removed.
    pub completed: usize,
    /// Items that were rejected and charged a retry.
    pub failed: usize,
    /// Items skipped because their budget is gone.
    pub exhausted: usize,
    /// True when a transport failure cut the pass short.
    pub aborted_by_network: bool,
}

/// Point-in-time view of the queue for status screens.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub total: usize,
    /// Items still eligible for upload.
    pub pending: usize,
    /// Items parked after exhausting their retry budget.
    pub exhausted: usize,
    pub is_syncing: bool,
    pub is_online: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Cheaply cloneable handle to the queue engine.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    store: Arc<dyn KeyValueStore>,
    uploader: Uploader,
    config: QueueConfig,
    items: RwLock<Vec<SyncQueueItem>>,
    is_syncing: AtomicBool,
    is_online: AtomicBool,
    last_sync: StdMutex<Option<DateTime<Utc>>>,
    monitor_task: StdMutex<Option<JoinHandle<()>>>,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.monitor_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

/// Stamps the sync time and clears the in-flight flag however the drain
/// ends, early error exits included.
struct DrainGuard<'a> {
    inner: &'a QueueInner,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.inner.last_sync.lock() {
            *slot = Some(Utc::now());
        }
        self.inner.is_syncing.store(false, Ordering::SeqCst);
    }
}

impl SyncQueue {
    /// Creates an engine that starts offline with an empty in-memory queue.
    /// Call [`load`](Self::load) to restore persisted items.
    pub fn new(store: Arc<dyn KeyValueStore>, uploader: Uploader, config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                store,
                uploader,
                config,
                items: RwLock::new(Vec::new()),
                is_syncing: AtomicBool::new(false),
                is_online: AtomicBool::new(false),
                last_sync: StdMutex::new(None),
                monitor_task: StdMutex::new(None),
            }),
        }
    }

    /// Full startup sequence: restore the persisted queue, then seed and
    /// follow the connectivity monitor. Coming up online with pending items
    /// starts a drain immediately.
    pub async fn start(
        store: Arc<dyn KeyValueStore>,
        uploader: Uploader,
        config: QueueConfig,
        monitor: Arc<dyn ReachabilityMonitor>,
    ) -> Result<Self, SyncError> {
        let queue = Self::new(store, uploader, config);
        queue.load().await?;
        queue.attach_monitor(monitor).await;
        Ok(queue)
    }

    /// Restores the queue from storage, replacing in-memory items. A missing
    /// key is an empty queue; a corrupt blob is an error the caller decides
    /// about rather than silently dropped work.
    pub async fn load(&self) -> Result<(), SyncError> {
        let items: Vec<SyncQueueItem> = match self.inner.store.get(keys::SYNC_QUEUE).await? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        let count = items.len();
        *self.inner.items.write().await = items;
        if count > 0 {
            info!(count, "restored persisted sync queue");
        }
        Ok(())
    }

    /// Appends a job for `survey_id`, persists the queue, and kicks off a
    /// background drain when online. The stored payload is a snapshot;
    /// later edits to the draft do not reach into the queue.
    pub async fn enqueue(
        &self,
        survey_id: impl Into<String>,
        job: SyncJob,
    ) -> Result<SyncQueueItem, SyncError> {
        let item = SyncQueueItem::new(survey_id.into(), job, self.inner.config.max_retries);
        {
            let mut items = self.inner.items.write().await;
            items.push(item.clone());
            self.persist(&items).await?;
        }
        debug!(item_id = %item.id, kind = item.job.kind(), "queued sync job");

        if self.inner.is_online.load(Ordering::SeqCst) {
            self.spawn_drain();
        }
        Ok(item)
    }

    /// Removes the item with the given id. Unknown ids are a no-op and the
    /// stored queue is not rewritten.
    pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let mut items = self.inner.items.write().await;
        match items.iter().position(|item| item.id == id) {
            Some(index) => {
                items.remove(index);
                self.persist(&items).await
            }
            None => Ok(()),
        }
    }

    /// Applies `mutate` to the item with the given id and persists the
    /// queue. Unknown ids are a no-op.
    pub async fn update_item<F>(&self, id: &str, mutate: F) -> Result<(), SyncError>
    where
        F: FnOnce(&mut SyncQueueItem) + Send,
    {
        let mut items = self.inner.items.write().await;
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                mutate(item);
                self.persist(&items).await
            }
            None => Ok(()),
        }
    }

    /// Gives an exhausted item a fresh budget and, when online, starts a
    /// drain to pick it up.
    pub async fn retry_item(&self, id: &str) -> Result<(), SyncError> {
        self.update_item(id, |item| {
            item.retry_count = 0;
            item.error = None;
        })
        .await?;
        if self.inner.is_online.load(Ordering::SeqCst) {
            self.spawn_drain();
        }
        Ok(())
    }

    /// Drains the queue once, oldest first.
    ///
    /// Returns an empty report without touching anything when offline or
    /// when another drain is already running. Items enqueued while the pass
    /// runs wait for the next one.
    pub async fn sync(&self) -> Result<DrainReport, SyncError> {
        if !self.inner.is_online.load(Ordering::SeqCst) {
            debug!("sync requested while offline, skipping");
            return Ok(DrainReport::default());
        }
        if self
            .inner
            .is_syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("drain already in progress, skipping");
            return Ok(DrainReport::default());
        }
        let _guard = DrainGuard { inner: &self.inner };

        let snapshot: Vec<SyncQueueItem> = self.inner.items.read().await.clone();
        let mut report = DrainReport::default();

        for item in &snapshot {
            if item.is_exhausted() {
                debug!(item_id = %item.id, "skipping exhausted item");
                self.annotate_exhausted(item).await?;
                report.exhausted += 1;
                continue;
            }

            match self.inner.uploader.run(&item.job).await {
                Ok(()) => {
                    self.remove(&item.id).await?;
                    if matches!(item.job, SyncJob::Survey(_)) {
                        self.cleanup_draft(&item.survey_id).await;
                    }
                    info!(item_id = %item.id, kind = item.job.kind(), "sync job completed");
                    report.completed += 1;
                }
                Err(error) if error.is_transient() => {
                    warn!(
                        item_id = %item.id,
                        error = %error,
                        "network failure, aborting drain until connectivity returns"
                    );
                    report.aborted_by_network = true;
                    break;
                }
                Err(error) => {
                    warn!(item_id = %item.id, error = %error, "sync job failed");
                    self.record_failure(&item.id, &error).await?;
                    report.failed += 1;
                }
            }
        }

        debug!(
            completed = report.completed,
            failed = report.failed,
            exhausted = report.exhausted,
            aborted = report.aborted_by_network,
            "drain pass finished"
        );
        Ok(report)
    }

    /// Records the connectivity state. An offline-to-online flip with
    /// pending work starts a background drain; everything else just updates
    /// the flag.
    pub async fn set_online_status(&self, online: bool) {
        let was_online = self.inner.is_online.swap(online, Ordering::SeqCst);
        if online == was_online {
            return;
        }
        info!(online, "connectivity changed");

        if online && !self.inner.items.read().await.is_empty() {
            self.spawn_drain();
        }
    }

    /// Seeds the online flag from `monitor` and follows its updates until
    /// [`shutdown`](Self::shutdown) or drop.
    pub async fn attach_monitor(&self, monitor: Arc<dyn ReachabilityMonitor>) {
        let initial = monitor.current_status().await;
        self.set_online_status(initial).await;

        let mut receiver = monitor.subscribe();
        // The task holds a weak handle so an abandoned queue can drop even
        // if the monitor outlives it.
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let online = *receiver.borrow_and_update();
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                SyncQueue { inner }.set_online_status(online).await;
            }
        });

        if let Ok(mut slot) = self.inner.monitor_task.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Stops following the connectivity monitor. Queued items stay
    /// persisted.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.inner.monitor_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    /// Snapshot of every queued item in queue order.
    pub async fn items(&self) -> Vec<SyncQueueItem> {
        self.inner.items.read().await.clone()
    }

    /// Queued items belonging to one survey.
    pub async fn items_for_survey(&self, survey_id: &str) -> Vec<SyncQueueItem> {
        self.inner
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.survey_id == survey_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.items.read().await.is_empty()
    }

    pub fn is_online(&self) -> bool {
        self.inner.is_online.load(Ordering::SeqCst)
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.is_syncing.load(Ordering::SeqCst)
    }

    /// When the last drain pass ended, complete or not. `None` until the
    /// first pass runs.
    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.inner.last_sync.lock().ok().and_then(|slot| *slot)
    }

    pub async fn status(&self) -> SyncStatus {
        let items = self.inner.items.read().await;
        let exhausted = items.iter().filter(|item| item.is_exhausted()).count();
        SyncStatus {
            total: items.len(),
            pending: items.len() - exhausted,
            exhausted,
            is_syncing: self.is_syncing(),
            is_online: self.is_online(),
            last_sync_time: self.last_sync_time(),
        }
    }

    fn spawn_drain(&self) {
        let queue = self.clone();
        tokio::spawn(async move {
            if let Err(error) = queue.sync().await {
                error!(error = %error, "background drain failed");
            }
        });
    }

    /// Rewrites the persisted queue. Callers hold the items write lock.
    async fn persist(&self, items: &[SyncQueueItem]) -> Result<(), SyncError> {
        let raw = serde_json::to_string(items)?;
        self.inner.store.set(keys::SYNC_QUEUE, &raw).await?;
        Ok(())
    }

    async fn annotate_exhausted(&self, item: &SyncQueueItem) -> Result<(), SyncError> {
        let note = format!("exceeded maximum retry attempts ({})", item.max_retries);
        if item.error.as_deref() == Some(note.as_str()) {
            return Ok(());
        }
        self.update_item(&item.id, move |item| item.error = Some(note))
            .await
    }

    async fn record_failure(&self, id: &str, error: &SyncError) -> Result<(), SyncError> {
        let message = error.to_string();
        self.update_item(id, move |item| {
            item.retry_count += 1;
            item.last_attempt = Some(Utc::now());
            item.error = Some(message);
        })
        .await
    }

    /// A survey that reached the backend no longer needs its local draft.
    /// Failure here is logged, not propagated; the queue item is already
    /// gone and the stale draft is harmless.
    async fn cleanup_draft(&self, survey_id: &str) {
        if let Err(error) = self.inner.store.remove(&keys::draft_key(survey_id)).await {
            warn!(
                survey_id = %survey_id,
                error = %error,
                "failed to remove local draft after sync"
            );
        }
    }
}
