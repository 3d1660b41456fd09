//! Profile change notification.
//!
//! Whatever watches the profile directory (or the store itself, after a
//! write) pushes [`ProfileChange`]s into a bounded queue. A dedicated
//! thread drains the queue and calls every subscribed listener, so a slow
//! listener never blocks the writer. When the queue is full new changes are
//! dropped with a warning.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::store::PROFILE_EXTENSION;
use crate::error::Result;

/// Changes that may wait in the queue before new ones are dropped.
pub const QUEUE_CAPACITY: usize = 64;

/// What happened to a profile file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A change to one profile of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileChange {
    pub device: String,
    pub profile_id: u64,
    pub kind: ChangeKind,
}

impl ProfileChange {
    pub fn new(device: impl Into<String>, profile_id: u64, kind: ChangeKind) -> Self {
        Self {
            device: device.into(),
            profile_id,
            kind,
        }
    }

    /// Interpret a path of the form `<device uid>/<id>.macros`.
    pub fn from_path(path: &Path, kind: ChangeKind) -> Option<Self> {
        if path.extension()? != PROFILE_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.starts_with('.') || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let profile_id = stem.parse().ok()?;
        let device = path.parent()?.file_name()?.to_str()?;
        Some(Self::new(device, profile_id, kind))
    }
}

/// Receives profile changes on the notification thread.
pub trait ProfileListener: Send + Sync {
    fn profile_changed(&self, change: &ProfileChange);
}

impl<F> ProfileListener for F
where
    F: Fn(&ProfileChange) + Send + Sync,
{
    fn profile_changed(&self, change: &ProfileChange) {
        self(change);
    }
}

/// Handle returned by [`ChangeHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type ListenerList = Vec<(ListenerHandle, Arc<dyn ProfileListener>)>;

/// Bounded change queue with a dedicated delivery thread.
pub struct ChangeHub {
    sender: Option<Sender<ProfileChange>>,
    listeners: Arc<RwLock<Arc<ListenerList>>>,
    next_id: AtomicU64,
    shared: AtomicBool,
    worker: Option<JoinHandle<()>>,
}

impl ChangeHub {
    /// Start the delivery thread.
    pub fn new() -> Result<Self> {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    /// Start the delivery thread with a custom queue size.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let listeners: Arc<RwLock<Arc<ListenerList>>> = Arc::default();
        let worker_listeners = Arc::clone(&listeners);
        let worker = thread::Builder::new()
            .name("gkm-profile-changes".to_string())
            .spawn(move || deliver(&receiver, &worker_listeners))?;
        debug!(capacity, "Profile change hub started");
        Ok(Self {
            sender: Some(sender),
            listeners,
            next_id: AtomicU64::new(0),
            shared: AtomicBool::new(false),
            worker: Some(worker),
        })
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: Arc<dyn ProfileListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let mut list = ListenerList::clone(&guard);
        list.push((handle, listener));
        *guard = Arc::new(list);
        handle
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let mut guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        let list: ListenerList = guard.iter().filter(|(h, _)| *h != handle).cloned().collect();
        let removed = list.len() != before;
        *guard = Arc::new(list);
        removed
    }

    /// A sender for an external watcher to push changes into.
    pub fn sender(&self) -> Option<Sender<ProfileChange>> {
        self.shared.store(true, Ordering::Relaxed);
        self.sender.clone()
    }

    /// Queue a change. Returns false if it was dropped.
    pub fn notify(&self, change: ProfileChange) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send(change) {
            Ok(()) => true,
            Err(TrySendError::Full(change)) => {
                warn!(device = %change.device, id = change.profile_id, "Change queue full, dropping");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Queue a change for a profile file path. Paths that are not profile
    /// files are ignored.
    pub fn notify_path(&self, path: &Path, kind: ChangeKind) -> bool {
        match ProfileChange::from_path(path, kind) {
            Some(change) => self.notify(change),
            None => {
                trace!(path = %path.display(), "Ignoring non-profile path");
                false
            }
        }
    }
}

impl Drop for ChangeHub {
    fn drop(&mut self) {
        self.sender.take();
        // Senders handed out by `sender()` keep the thread alive
        if !self.shared.load(Ordering::Relaxed) {
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }
}

fn deliver(receiver: &Receiver<ProfileChange>, listeners: &RwLock<Arc<ListenerList>>) {
    for change in receiver {
        let current = Arc::clone(&listeners.read().unwrap_or_else(PoisonError::into_inner));
        trace!(device = %change.device, id = change.profile_id, listeners = current.len(), "Delivering profile change");
        for (_, listener) in current.iter() {
            listener.profile_changed(&change);
        }
    }
    debug!("Profile change hub stopped");
}
