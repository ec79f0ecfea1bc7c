//! External event backends
//!
//! A [`Delegate`] is a pair of hooks the registry forwards `add_listener` and
//! `remove_listener` calls to. Hooks are compared by identity: two delegates
//! built from the same hook handles are considered the same backend, and
//! swapping between them does not flush registrations.

use crate::types::{DelegateOperation, Listener, Payload};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

type HookFn = dyn Fn(&str, &Listener, &[Payload]) -> anyhow::Result<()> + Send + Sync;

/// Shared handle to one delegate operation
#[derive(Clone)]
pub struct DelegateHook {
    hook: Arc<HookFn>,
}

impl DelegateHook {
    /// Wrap a function into a hook with its own identity
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&str, &Listener, &[Payload]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self { hook: Arc::new(hook) }
    }

    /// A hook that accepts every call and does nothing
    pub fn noop() -> Self {
        Self::new(|_, _, _| Ok(()))
    }

    /// Invoke the hook
    pub fn call(&self, event: &str, listener: &Listener, extra: &[Payload]) -> anyhow::Result<()> {
        (self.hook)(event, listener, extra)
    }

    /// True if both handles refer to the same hook function
    pub fn ptr_eq(&self, other: &DelegateHook) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.hook) as *const (),
            Arc::as_ptr(&other.hook) as *const (),
        )
    }
}

impl fmt::Debug for DelegateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DelegateHook({:p})", Arc::as_ptr(&self.hook) as *const ())
    }
}

/// An external add/remove capability the registry can forward to
#[derive(Debug, Clone)]
pub struct Delegate {
    add: DelegateHook,
    remove: DelegateHook,
}

impl Delegate {
    /// Create a delegate from its add and remove hooks
    pub fn new(add: DelegateHook, remove: DelegateHook) -> Self {
        Self { add, remove }
    }

    /// Create a delegate directly from two closures
    pub fn from_fns<A, R>(add: A, remove: R) -> Self
    where
        A: Fn(&str, &Listener, &[Payload]) -> anyhow::Result<()> + Send + Sync + 'static,
        R: Fn(&str, &Listener, &[Payload]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(DelegateHook::new(add), DelegateHook::new(remove))
    }

    /// Builder method: replace the add hook
    pub fn with_add(mut self, add: DelegateHook) -> Self {
        self.add = add;
        self
    }

    /// Builder method: replace the remove hook
    pub fn with_remove(mut self, remove: DelegateHook) -> Self {
        self.remove = remove;
        self
    }

    /// The add hook
    pub fn add_hook(&self) -> &DelegateHook {
        &self.add
    }

    /// The remove hook
    pub fn remove_hook(&self) -> &DelegateHook {
        &self.remove
    }

    /// Forward an `add_listener` call
    pub fn add_listener(&self, event: &str, listener: &Listener, extra: &[Payload]) -> anyhow::Result<()> {
        self.add.call(event, listener, extra)
    }

    /// Forward a `remove_listener` call
    pub fn remove_listener(&self, event: &str, listener: &Listener, extra: &[Payload]) -> anyhow::Result<()> {
        self.remove.call(event, listener, extra)
    }

    /// True if both delegates share identical add and remove hooks
    pub fn same_hooks(&self, other: &Delegate) -> bool {
        self.add.ptr_eq(&other.add) && self.remove.ptr_eq(&other.remove)
    }
}

/// A call forwarded to a [`RecordingDelegate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelegateCall {
    /// Which hook was invoked
    pub operation: DelegateOperation,
    /// Event name passed to the hook
    pub event: String,
    /// The listener passed to the hook
    #[serde(skip)]
    pub listener: Listener,
    /// Extra arguments passed through verbatim
    pub extra: Vec<Payload>,
}

/// Delegate that records every forwarded call
///
/// Useful for hosts that only need to observe registration traffic, and for tests.
#[derive(Debug, Clone)]
pub struct RecordingDelegate {
    calls: Arc<Mutex<Vec<DelegateCall>>>,
    delegate: Delegate,
}

impl RecordingDelegate {
    /// Create a recording delegate with fresh add and remove hooks
    pub fn new() -> Self {
        let calls: Arc<Mutex<Vec<DelegateCall>>> = Arc::new(Mutex::new(Vec::new()));
        let add = Self::recording_hook(calls.clone(), DelegateOperation::Add);
        let remove = Self::recording_hook(calls.clone(), DelegateOperation::Remove);

        Self {
            calls,
            delegate: Delegate::new(add, remove),
        }
    }

    fn recording_hook(calls: Arc<Mutex<Vec<DelegateCall>>>, operation: DelegateOperation) -> DelegateHook {
        DelegateHook::new(move |event, listener, extra| {
            calls.lock().push(DelegateCall {
                operation,
                event: event.to_string(),
                listener: listener.clone(),
                extra: extra.to_vec(),
            });
            Ok(())
        })
    }

    /// Builder method: forward adds through another hook instead of recording them
    pub fn with_add(mut self, add: DelegateHook) -> Self {
        self.delegate = self.delegate.with_add(add);
        self
    }

    /// Builder method: forward removes through another hook instead of recording them
    pub fn with_remove(mut self, remove: DelegateHook) -> Self {
        self.delegate = self.delegate.with_remove(remove);
        self
    }

    /// The delegate to install on a registry
    pub fn delegate(&self) -> Delegate {
        self.delegate.clone()
    }

    /// Snapshot of all recorded calls in order
    pub fn calls(&self) -> Vec<DelegateCall> {
        self.calls.lock().clone()
    }

    /// Recorded calls for one operation
    pub fn calls_for(&self, operation: DelegateOperation) -> Vec<DelegateCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    /// Number of recorded calls for one operation
    pub fn count(&self, operation: DelegateOperation) -> usize {
        self.calls.lock().iter().filter(|call| call.operation == operation).count()
    }

    /// Forget all recorded calls
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Default for RecordingDelegate {
    fn default() -> Self {
        Self::new()
    }
}
