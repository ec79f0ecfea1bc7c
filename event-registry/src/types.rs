//! Core types for the event registry
//!
//! Listeners are opaque shared callbacks. Two [`Listener`] handles are equal only
//! when they point at the same callback allocation, never by comparing behavior.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Value passed to listeners on emit and forwarded to delegates as extra arguments
pub type Payload = serde_json::Value;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

type ListenerFn = dyn Fn(Option<&Payload>) -> anyhow::Result<()> + Send + Sync;

/// Errors that can occur while operating on the registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Listener for event '{event}' failed: {source}")]
    Listener {
        event: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Delegate {operation} for event '{event}' failed: {source}")]
    Delegate {
        operation: DelegateOperation,
        event: String,
        #[source]
        source: anyhow::Error,
    },
}

/// The two operations a delegate exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelegateOperation {
    /// `add_listener` forwarded to the delegate
    Add,
    /// `remove_listener` forwarded to the delegate (also used when flushing)
    Remove,
}

impl fmt::Display for DelegateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegateOperation::Add => write!(f, "addListener"),
            DelegateOperation::Remove => write!(f, "removeListener"),
        }
    }
}

/// Shared handle to a listener callback
///
/// Cloning the handle keeps its identity, so a clone can be used to remove a
/// listener that was registered with the original.
#[derive(Clone)]
pub struct Listener {
    callback: Arc<ListenerFn>,
}

impl Listener {
    /// Wrap a callback into a new listener with its own identity
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Option<&Payload>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// A listener that ignores every event
    pub fn noop() -> Self {
        Self::new(|_| Ok(()))
    }

    /// Invoke the callback directly
    pub fn call(&self, payload: Option<&Payload>) -> anyhow::Result<()> {
        (self.callback)(payload)
    }

    /// True if both handles refer to the same callback
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        // Compare data pointers only; vtable pointers are not unique per type.
        std::ptr::eq(
            Arc::as_ptr(&self.callback) as *const (),
            Arc::as_ptr(&other.callback) as *const (),
        )
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.callback) as *const ()
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", self.addr())
    }
}

/// One active subscription: an event name bound to a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Name of the event the listener is subscribed to
    pub event: String,
    /// The subscribed callback
    pub listener: Listener,
}

impl Registration {
    /// Create a new registration
    pub fn new(event: impl Into<String>, listener: Listener) -> Self {
        Self {
            event: event.into(),
            listener,
        }
    }

    /// Check if this registration is for the given event/listener pair
    pub fn matches(&self, event: &str, listener: &Listener) -> bool {
        self.event == event && self.listener.ptr_eq(listener)
    }
}
