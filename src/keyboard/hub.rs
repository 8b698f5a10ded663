// Keyboard hub - the process-wide key event stream
//
// Listeners are a shared resource: components attach on activation and get a
// ListenerGuard back. Dropping the guard detaches the listener, so every exit
// path (normal teardown, error unwinding, early return) releases it.

use crate::keyboard::{KeyEvent, KeyboardError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// A component that reacts to key presses from the hub
pub trait KeyHandler: Send {
    fn handle_key(&mut self, event: &mut KeyEvent);
}

type Listener = Box<dyn FnMut(&mut KeyEvent) + Send>;

struct ListenerSlot {
    id: u64,
    name: String,
    active: AtomicBool,
    listener: Mutex<Listener>,
}

struct HubInner {
    listeners: Mutex<Vec<Arc<ListenerSlot>>>,
    next_id: AtomicU64,
    dispatching: AtomicBool,
}

impl HubInner {
    fn listeners(&self) -> MutexGuard<'_, Vec<Arc<ListenerSlot>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn detach(&self, id: u64) {
        let mut listeners = self.listeners();
        if let Some(pos) = listeners.iter().position(|slot| slot.id == id) {
            let slot = listeners.remove(pos);
            slot.active.store(false, Ordering::Release);
            tracing::debug!("Detached key listener '{}' (id={})", slot.name, id);
        }
    }
}

/// Serial, in-order delivery of key events to attached listeners.
///
/// Cloning the hub yields another handle on the same listener set.
#[derive(Clone)]
pub struct KeyboardHub {
    inner: Arc<HubInner>,
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                dispatching: AtomicBool::new(false),
            }),
        }
    }

    /// Attach a listener closure. It stays attached until the guard is dropped.
    #[must_use = "dropping the guard detaches the listener immediately"]
    pub fn attach<F>(&self, name: impl Into<String>, listener: F) -> ListenerGuard
    where
        F: FnMut(&mut KeyEvent) + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.into();

        tracing::debug!("Attached key listener '{}' (id={})", name, id);

        self.inner.listeners().push(Arc::new(ListenerSlot {
            id,
            name,
            active: AtomicBool::new(true),
            listener: Mutex::new(Box::new(listener)),
        }));

        ListenerGuard {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Attach a shared [`KeyHandler`]; the caller keeps its own handle to it
    #[must_use = "dropping the guard detaches the listener immediately"]
    pub fn attach_handler<H>(&self, name: impl Into<String>, handler: Arc<Mutex<H>>) -> ListenerGuard
    where
        H: KeyHandler + 'static,
    {
        self.attach(name, move |event: &mut KeyEvent| {
            handler
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .handle_key(event);
        })
    }

    /// Deliver one event to every attached listener, in attach order.
    ///
    /// Returns the number of listeners that saw the event.
    ///
    /// # Errors
    /// [`KeyboardError::DispatchInProgress`] if called while another dispatch
    /// is running (including from inside a listener).
    pub fn dispatch(&self, event: &mut KeyEvent) -> Result<usize, KeyboardError> {
        if self.inner.dispatching.swap(true, Ordering::AcqRel) {
            tracing::warn!("Rejected key event {:?} during an active dispatch", event.key);
            return Err(KeyboardError::DispatchInProgress);
        }
        let _reset = DispatchReset(&self.inner.dispatching);

        // Snapshot so listeners may detach (or attach) while we deliver
        let snapshot: Vec<Arc<ListenerSlot>> = self.inner.listeners().clone();

        let mut delivered = 0;
        for slot in snapshot {
            if !slot.active.load(Ordering::Acquire) {
                continue;
            }
            let mut listener = slot.listener.lock().unwrap_or_else(|e| e.into_inner());
            listener(event);
            delivered += 1;
        }

        tracing::trace!(
            "Dispatched {:?} to {} listener(s), default_prevented={}",
            event.key,
            delivered,
            event.default_prevented()
        );

        Ok(delivered)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

impl Default for KeyboardHub {
    fn default() -> Self {
        Self::new()
    }
}

struct DispatchReset<'a>(&'a AtomicBool);

impl Drop for DispatchReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Scoped ownership of an attached listener. Detaches on drop.
#[derive(Debug)]
pub struct ListenerGuard {
    hub: Weak<HubInner>,
    id: u64,
}

impl ListenerGuard {
    /// Detach now instead of waiting for the guard to go out of scope
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.detach(self.id);
        }
    }
}
