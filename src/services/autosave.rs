// Autosave controller - debounced, single-flight persistence of a data snapshot
//
// Every observed change is diffed against the last successfully persisted
// snapshot. Real changes (re)start a debounce timer; when it fires the current
// snapshot goes to the caller's save function. Only one save is in flight at a
// time: triggers that arrive meanwhile are dropped, not queued.

use crate::metrics::Metrics;
use crate::models::{AutoSaveSettings, SaveState, SaveStatus};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;

/// Boxed future returned by a save function
pub type SaveFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type SaveFn<T> = Arc<dyn Fn(T) -> SaveFuture + Send + Sync>;
type EqualityFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Default quiet period before a change is persisted
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Default time the `Saved` status is shown before reverting to `Idle`
pub const DEFAULT_SAVED_INDICATOR: Duration = Duration::from_millis(2000);

/// Errors that can occur when creating an autosave controller
#[derive(Error, Debug)]
pub enum AutoSaveError {
    #[error("Autosave requires a tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Result of one pass through the save path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Save function failed with this message
    Failed(String),
    /// Another save was already in flight; nothing was started
    Dropped,
}

/// Tuning knobs for [`AutoSaveController`]
#[derive(Debug, Clone)]
pub struct AutoSaveOptions {
    pub enabled: bool,
    pub delay: Duration,
    pub saved_indicator: Duration,
    /// Re-run a dropped save once the in-flight save succeeds, if still dirty
    pub retry_dropped: bool,
    pub metrics: Option<Arc<Metrics>>,
}

impl Default for AutoSaveOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: DEFAULT_DEBOUNCE,
            saved_indicator: DEFAULT_SAVED_INDICATOR,
            retry_dropped: false,
            metrics: None,
        }
    }
}

impl From<&AutoSaveSettings> for AutoSaveOptions {
    fn from(settings: &AutoSaveSettings) -> Self {
        Self {
            enabled: settings.enabled,
            delay: settings.delay(),
            saved_indicator: settings.saved_indicator(),
            retry_dropped: settings.retry_dropped,
            metrics: None,
        }
    }
}

impl AutoSaveOptions {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

struct Shared<T> {
    /// Latest snapshot observed from the host
    current: T,
    /// Last snapshot persisted successfully
    baseline: T,
    state: SaveState,
    enabled: bool,
    in_flight: bool,
    retry_pending: bool,
    /// Bumped on every (re)schedule; a timer only fires if it still owns the latest generation
    generation: u64,
    debounce: Option<JoinHandle<()>>,
    revert: Option<JoinHandle<()>>,
}

struct Inner<T> {
    shared: Mutex<Shared<T>>,
    save_fn: SaveFn<T>,
    equals: EqualityFn<T>,
    delay: Duration,
    saved_indicator: Duration,
    retry_dropped: bool,
    metrics: Option<Arc<Metrics>>,
    events: broadcast::Sender<SaveState>,
    /// Woken whenever an in-flight save finishes
    settled: Notify,
    runtime: Handle,
}

impl<T: Clone + Send + 'static> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, shared: &mut Shared<T>, state: SaveState) {
        tracing::trace!("Save status -> {}", state.status);
        shared.state = state.clone();
        // No subscribers is fine
        let _ = self.events.send(state);
    }

    fn is_dirty(&self, shared: &Shared<T>) -> bool {
        !(self.equals)(&shared.current, &shared.baseline)
    }

    fn cancel_debounce(&self, shared: &mut Shared<T>) {
        if let Some(handle) = shared.debounce.take() {
            handle.abort();
            shared.generation += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_debounce_cancelled();
            }
            tracing::trace!("Cancelled pending debounce timer");
        }
    }

    fn schedule(self: &Arc<Self>, shared: &mut Shared<T>) {
        self.cancel_debounce(shared);
        shared.generation += 1;
        let generation = shared.generation;
        let delay = self.delay;
        let inner = Arc::clone(self);

        tracing::debug!("Autosave scheduled in {:?}", delay);
        shared.debounce = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut shared = inner.lock();
                if shared.generation != generation {
                    return;
                }
                // From here on the task is no longer cancelable: the save has begun
                shared.debounce = None;
            }
            inner.perform_save().await;
        }));
    }

    fn schedule_revert(self: &Arc<Self>, shared: &mut Shared<T>) {
        if let Some(handle) = shared.revert.take() {
            handle.abort();
        }
        let inner = Arc::clone(self);
        let cool_down = self.saved_indicator;
        shared.revert = Some(self.runtime.spawn(async move {
            tokio::time::sleep(cool_down).await;
            let mut shared = inner.lock();
            if shared.state.status == SaveStatus::Saved {
                let state = SaveState {
                    status: SaveStatus::Idle,
                    ..shared.state.clone()
                };
                inner.publish(&mut shared, state);
            }
        }));
    }

    /// The save path. Single-flight: returns [`SaveOutcome::Dropped`] if a save is running.
    async fn perform_save(self: &Arc<Self>) -> SaveOutcome {
        let mut first_outcome = None;

        loop {
            let snapshot = {
                let mut shared = self.lock();
                if shared.in_flight {
                    if self.retry_dropped {
                        shared.retry_pending = true;
                    }
                    if let Some(metrics) = &self.metrics {
                        metrics.record_save_dropped();
                    }
                    tracing::debug!(
                        "Save dropped: another save is in flight (retry queued: {})",
                        self.retry_dropped
                    );
                    return first_outcome.unwrap_or(SaveOutcome::Dropped);
                }

                shared.in_flight = true;
                let state = SaveState {
                    status: SaveStatus::Saving,
                    last_saved: shared.state.last_saved,
                    error: None,
                };
                self.publish(&mut shared, state);
                shared.current.clone()
            };

            if let Some(metrics) = &self.metrics {
                metrics.record_save_attempted();
            }

            let result = (self.save_fn)(snapshot.clone()).await;

            let mut shared = self.lock();
            shared.in_flight = false;

            let outcome = match result {
                Ok(()) => {
                    shared.baseline = snapshot;
                    let state = SaveState {
                        status: SaveStatus::Saved,
                        last_saved: Some(SystemTime::now()),
                        error: None,
                    };
                    self.publish(&mut shared, state);
                    self.schedule_revert(&mut shared);

                    if let Some(metrics) = &self.metrics {
                        metrics.record_save_succeeded();
                    }
                    tracing::info!("Autosave completed");
                    SaveOutcome::Saved
                }
                Err(err) => {
                    let message = format!("{:#}", err);
                    let state = SaveState {
                        status: SaveStatus::Error,
                        last_saved: shared.state.last_saved,
                        error: Some(message.clone()),
                    };
                    self.publish(&mut shared, state);

                    if let Some(metrics) = &self.metrics {
                        metrics.record_save_failed();
                    }
                    tracing::error!("Autosave failed: {}", message);
                    SaveOutcome::Failed(message)
                }
            };

            let retry = std::mem::take(&mut shared.retry_pending)
                && outcome == SaveOutcome::Saved
                && shared.enabled
                && self.is_dirty(&shared);
            drop(shared);
            self.settled.notify_waiters();

            let outcome = first_outcome.get_or_insert(outcome).clone();
            if !retry {
                return outcome;
            }
            tracing::debug!("Retrying save that was dropped while in flight");
        }
    }
}

/// Debounced, single-flight autosave for one data snapshot.
///
/// Dropping the controller cancels the pending debounce timer and the
/// saved-indicator timer. A save already in flight runs to completion.
///
/// # Example
/// ```ignore
/// let autosave = AutoSaveController::new(draft, |d| store.persist(d), AutoSaveOptions::default())?;
/// autosave.update(edited_draft);  // saves 2s after the last change
/// autosave.save_now().await;       // save immediately
/// autosave.flush().await;          // wait out in-flight saves, then persist
/// ```
pub struct AutoSaveController<T: Clone + Send + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T> AutoSaveController<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Create a controller using `PartialEq` for dirty-checking.
    ///
    /// `initial` is taken as already persisted.
    ///
    /// # Errors
    /// [`AutoSaveError::NoRuntime`] when called outside a tokio runtime.
    pub fn new<F, Fut>(initial: T, save: F, options: AutoSaveOptions) -> Result<Self, AutoSaveError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::with_equality(initial, save, options, |a: &T, b: &T| a == b)
    }
}

impl<T: Clone + Send + 'static> AutoSaveController<T> {
    /// Create a controller with a caller-supplied equality for dirty-checking
    ///
    /// # Errors
    /// [`AutoSaveError::NoRuntime`] when called outside a tokio runtime.
    pub fn with_equality<F, Fut, E>(
        initial: T,
        save: F,
        options: AutoSaveOptions,
        equals: E,
    ) -> Result<Self, AutoSaveError>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let runtime = Handle::try_current()?;
        let (events, _) = broadcast::channel(32);
        let save_fn: SaveFn<T> = Arc::new(move |data: T| -> SaveFuture { Box::pin(save(data)) });

        tracing::debug!(
            "Autosave controller created: delay={:?}, enabled={}, retry_dropped={}",
            options.delay,
            options.enabled,
            options.retry_dropped
        );

        Ok(Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    current: initial.clone(),
                    baseline: initial,
                    state: SaveState::default(),
                    enabled: options.enabled,
                    in_flight: false,
                    retry_pending: false,
                    generation: 0,
                    debounce: None,
                    revert: None,
                }),
                save_fn,
                equals: Arc::new(equals),
                delay: options.delay,
                saved_indicator: options.saved_indicator,
                retry_dropped: options.retry_dropped,
                metrics: options.metrics,
                events,
                settled: Notify::new(),
                runtime,
            }),
        })
    }

    /// Observe a new snapshot from the host.
    ///
    /// A snapshot equal to the last persisted one schedules nothing (and
    /// cancels a pending timer); anything else restarts the debounce window.
    pub fn update(&self, data: T) {
        let mut shared = self.inner.lock();
        shared.current = data;

        if !shared.enabled {
            return;
        }

        if self.inner.is_dirty(&shared) {
            self.inner.schedule(&mut shared);
        } else {
            self.inner.cancel_debounce(&mut shared);
        }
    }

    /// Cancel the pending timer and save the current snapshot now.
    ///
    /// The save runs on its own task, so dropping this future does not
    /// cancel a save that has started.
    pub async fn save_now(&self) -> SaveOutcome {
        {
            let mut shared = self.inner.lock();
            self.inner.cancel_debounce(&mut shared);
        }

        let inner = Arc::clone(&self.inner);
        match self.inner.runtime.spawn(async move { inner.perform_save().await }).await {
            Ok(outcome) => outcome,
            Err(err) => SaveOutcome::Failed(format!("Save task aborted: {}", err)),
        }
    }

    /// Persist the current snapshot, waiting out any save already in flight.
    ///
    /// Unlike [`save_now`](Self::save_now) this never reports `Dropped`: it
    /// retries until the snapshot matches what was persisted or a save fails.
    /// Returns `None` when there was nothing to save.
    pub async fn flush(&self) -> Option<SaveOutcome> {
        let mut last = None;
        loop {
            let settled = self.inner.settled.notified();
            tokio::pin!(settled);
            // Register before checking so a save finishing in between still wakes us
            settled.as_mut().enable();

            let in_flight = {
                let mut shared = self.inner.lock();
                self.inner.cancel_debounce(&mut shared);
                if !shared.in_flight && !self.inner.is_dirty(&shared) {
                    return last;
                }
                shared.in_flight
            };

            if in_flight {
                tracing::debug!("Flush waiting for the in-flight save");
                settled.await;
                continue;
            }

            match self.save_now().await {
                SaveOutcome::Dropped => continue,
                SaveOutcome::Saved => last = Some(SaveOutcome::Saved),
                failed => return Some(failed),
            }
        }
    }

    /// Fire-and-forget [`save_now`](Self::save_now) for synchronous callers (key handlers)
    pub fn request_save(&self) {
        {
            let mut shared = self.inner.lock();
            self.inner.cancel_debounce(&mut shared);
        }
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            inner.perform_save().await;
        });
    }

    /// Enable or disable automatic saving. Disabling cancels a pending timer;
    /// re-enabling schedules a save if there are unsaved changes.
    pub fn set_enabled(&self, enabled: bool) {
        let mut shared = self.inner.lock();
        if shared.enabled == enabled {
            return;
        }
        shared.enabled = enabled;

        if enabled {
            if self.inner.is_dirty(&shared) {
                self.inner.schedule(&mut shared);
            }
        } else {
            self.inner.cancel_debounce(&mut shared);
        }
        tracing::debug!("Autosave enabled={}", enabled);
    }

    pub fn state(&self) -> SaveState {
        self.inner.lock().state.clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.lock().state.status
    }

    /// Receive every status transition from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SaveState> {
        self.inner.events.subscribe()
    }

    /// Whether the current snapshot differs from the last persisted one
    pub fn is_dirty(&self) -> bool {
        let shared = self.inner.lock();
        self.inner.is_dirty(&shared)
    }

    pub fn has_pending_save(&self) -> bool {
        self.inner.lock().debounce.is_some()
    }

    /// Copy of the latest observed snapshot
    pub fn snapshot(&self) -> T {
        self.inner.lock().current.clone()
    }
}

impl<T: Clone + Send + 'static> Drop for AutoSaveController<T> {
    fn drop(&mut self) {
        let mut shared = self.inner.lock();
        if let Some(handle) = shared.debounce.take() {
            handle.abort();
        }
        if let Some(handle) = shared.revert.take() {
            handle.abort();
        }
        tracing::debug!("Autosave controller torn down");
    }
}
