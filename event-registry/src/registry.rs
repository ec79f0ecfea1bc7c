//! The listener registry
//!
//! [`EventRegistry`] owns the authoritative, deduplicated listener table and
//! optionally mirrors add/remove calls into a [`Delegate`]. Emitting is always
//! local: the delegate is never consulted when dispatching.

use crate::config::RegistryConfig;
use crate::delegate::Delegate;
use crate::types::{DelegateOperation, Listener, Payload, Registration, RegistryError, Result};
use parking_lot::Mutex;
use std::sync::OnceLock;

static GLOBAL: OnceLock<EventRegistry> = OnceLock::new();

/// Process-wide registry with default configuration, created on first use.
///
/// Prefer owning an [`EventRegistry`] where possible; this exists for hosts that
/// wire one shared registry up at startup.
pub fn global() -> &'static EventRegistry {
    GLOBAL.get_or_init(EventRegistry::new)
}

#[derive(Default)]
struct State {
    delegate: Option<Delegate>,
    registrations: Vec<Registration>,
}

impl State {
    fn position(&self, event: &str, listener: &Listener) -> Option<usize> {
        self.registrations.iter().position(|r| r.matches(event, listener))
    }
}

/// Event listener registry with optional delegation
///
/// All operations are synchronous. One lock guards the table and the delegate;
/// delegate hooks run while it is held and must not call back into the same
/// registry. Listeners run after the lock is released and may freely add,
/// remove or emit.
pub struct EventRegistry {
    config: RegistryConfig,
    state: Mutex<State>,
}

impl EventRegistry {
    /// Create an empty registry without a delegate
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with the given configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    /// The configuration this registry was built with
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Stop forwarding to any delegate. Registrations are kept.
    pub fn use_without_implementation(&self) {
        let mut state = self.state.lock();
        if state.delegate.take().is_some() {
            log::info!("Delegate cleared, {} registration(s) kept", state.registrations.len());
        }
    }

    /// Install a new delegate
    ///
    /// If a different delegate was installed (its add or remove hook differs),
    /// every registration is first removed through the previous delegate, last
    /// to first, and dropped from the table. With identical hooks, or no
    /// previous delegate, the table is left untouched.
    ///
    /// # Errors
    /// Returns [`RegistryError::Delegate`] if the previous delegate's remove hook
    /// fails. The flush stops there: the failing registration and everything
    /// before it stay registered and the previous delegate stays installed.
    pub fn set_implementation(&self, delegate: Delegate) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(previous) = state.delegate.clone() {
            if !previous.same_hooks(&delegate) {
                log::info!(
                    "Delegate changed, flushing {} registration(s) through previous delegate",
                    state.registrations.len()
                );
                while let Some(last) = state.registrations.last() {
                    if let Err(source) = previous.remove_listener(&last.event, &last.listener, &[]) {
                        log::warn!(
                            "Flush aborted at event '{}', {} registration(s) remain",
                            last.event,
                            state.registrations.len()
                        );
                        return Err(RegistryError::Delegate {
                            operation: DelegateOperation::Remove,
                            event: last.event.clone(),
                            source,
                        });
                    }
                    state.registrations.pop();
                }
            } else {
                log::debug!("Delegate hooks unchanged, keeping registrations");
            }
        }

        state.delegate = Some(delegate);
        Ok(())
    }

    /// Register `listener` for `event`
    ///
    /// Registering the same pair twice is a no-op. `extra` is only forwarded to
    /// the delegate and plays no part in deduplication.
    pub fn add_listener(&self, event: &str, listener: &Listener, extra: &[Payload]) -> Result<()> {
        let mut state = self.state.lock();

        if state.position(event, listener).is_some() {
            log::debug!("Listener already registered for '{}'", event);
            return Ok(());
        }

        state.registrations.push(Registration::new(event, listener.clone()));
        log::debug!("Registered listener for '{}' ({} total)", event, state.registrations.len());

        if let Some(delegate) = &state.delegate {
            delegate
                .add_listener(event, listener, extra)
                .map_err(|source| RegistryError::Delegate {
                    operation: DelegateOperation::Add,
                    event: event.to_string(),
                    source,
                })?;
        }

        Ok(())
    }

    /// Unregister `listener` from `event`; unknown pairs are ignored
    pub fn remove_listener(&self, event: &str, listener: &Listener, extra: &[Payload]) -> Result<()> {
        let mut state = self.state.lock();

        let Some(index) = state.position(event, listener) else {
            log::debug!("No listener to remove for '{}'", event);
            return Ok(());
        };

        state.registrations.remove(index);
        log::debug!("Removed listener for '{}' ({} left)", event, state.registrations.len());

        if let Some(delegate) = &state.delegate {
            delegate
                .remove_listener(event, listener, extra)
                .map_err(|source| RegistryError::Delegate {
                    operation: DelegateOperation::Remove,
                    event: event.to_string(),
                    source,
                })?;
        }

        Ok(())
    }

    /// Call every listener registered for `event`, in registration order
    ///
    /// Listeners are taken from a snapshot of the table, so registrations made
    /// or removed by a listener only affect later emits.
    ///
    /// # Errors
    /// The first failing listener stops the dispatch and its error is returned.
    pub fn emit(&self, event: &str, payload: Option<Payload>) -> Result<()> {
        let targets: Vec<Listener> = {
            let state = self.state.lock();
            state
                .registrations
                .iter()
                .filter(|r| r.event == event)
                .map(|r| r.listener.clone())
                .collect()
        };

        let payload = self.config.payload_policy.apply(payload);
        log::debug!("Emitting '{}' to {} listener(s)", event, targets.len());

        for listener in targets {
            if self.config.log_dispatch {
                log::trace!("Dispatching '{}' to {:?}", event, listener);
            }
            listener
                .call(payload.as_ref())
                .map_err(|source| RegistryError::Listener {
                    event: event.to_string(),
                    source,
                })?;
        }

        Ok(())
    }

    /// True if a delegate is installed
    pub fn has_implementation(&self) -> bool {
        self.state.lock().delegate.is_some()
    }

    /// Number of registrations in the table
    pub fn len(&self) -> usize {
        self.state.lock().registrations.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.state.lock().registrations.is_empty()
    }

    /// Number of listeners registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.state
            .lock()
            .registrations
            .iter()
            .filter(|r| r.event == event)
            .count()
    }

    /// True if `listener` is registered for `event`
    pub fn contains(&self, event: &str, listener: &Listener) -> bool {
        self.state.lock().position(event, listener).is_some()
    }

    /// Snapshot of the table in registration order
    pub fn registrations(&self) -> Vec<Registration> {
        self.state.lock().registrations.clone()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PayloadPolicy;
    use crate::delegate::{DelegateHook, RecordingDelegate};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_new_registry_is_empty() {
        let registry = EventRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.has_implementation());
        assert_eq!(registry.config(), &RegistryConfig::default());
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = EventRegistry::new();
        let listener = Listener::noop();

        registry.add_listener("event", &listener, &[]).unwrap();
        registry.add_listener("event", &listener, &[]).unwrap();
        assert_eq!(registry.len(), 1);

        // Same listener on another event is a separate registration
        registry.add_listener("other", &listener, &[]).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_preserves_order() {
        let registry = EventRegistry::new();
        let (a, b, c) = (Listener::noop(), Listener::noop(), Listener::noop());
        for listener in [&a, &b, &c] {
            registry.add_listener("tick", listener, &[]).unwrap();
        }

        registry.remove_listener("tick", &b, &[]).unwrap();

        let remaining: Vec<Listener> = registry.registrations().into_iter().map(|r| r.listener).collect();
        assert_eq!(remaining, vec![a, c]);
    }

    #[test]
    fn test_set_implementation_without_previous_keeps_table() {
        let registry = EventRegistry::new();
        registry.add_listener("listen", &Listener::noop(), &[]).unwrap();

        let recorder = RecordingDelegate::new();
        registry.set_implementation(recorder.delegate()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(recorder.calls().is_empty());
        assert!(registry.has_implementation());
    }

    #[test]
    fn test_flush_runs_last_to_first() {
        let registry = EventRegistry::new();
        let recorder = RecordingDelegate::new();
        registry.set_implementation(recorder.delegate()).unwrap();

        let (a, b) = (Listener::noop(), Listener::noop());
        registry.add_listener("first", &a, &[]).unwrap();
        registry.add_listener("second", &b, &[json!("extra")]).unwrap();
        recorder.clear();

        registry.set_implementation(RecordingDelegate::new().delegate()).unwrap();

        let calls = recorder.calls_for(DelegateOperation::Remove);
        let events: Vec<&str> = calls.iter().map(|c| c.event.as_str()).collect();
        assert_eq!(events, vec!["second", "first"]);
        // Flush never forwards the original extra arguments
        assert!(calls.iter().all(|c| c.extra.is_empty()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_flush_keeps_remaining_registrations() {
        let registry = EventRegistry::new();
        let failing = Delegate::new(
            DelegateHook::noop(),
            DelegateHook::new(|event, _, _| {
                if event == "sticky" {
                    anyhow::bail!("cannot remove {}", event);
                }
                Ok(())
            }),
        );
        registry.set_implementation(failing).unwrap();
        registry.add_listener("sticky", &Listener::noop(), &[]).unwrap();
        registry.add_listener("loose", &Listener::noop(), &[]).unwrap();

        let err = registry.set_implementation(RecordingDelegate::new().delegate()).unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Delegate { operation: DelegateOperation::Remove, ref event, .. } if event == "sticky"
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.listener_count("sticky"), 1);
    }

    #[test]
    fn test_delegate_add_failure_keeps_registration() {
        let registry = EventRegistry::new();
        registry
            .set_implementation(Delegate::from_fns(
                |_, _, _| Err(anyhow::anyhow!("backend rejected")),
                |_, _, _| Ok(()),
            ))
            .unwrap();
        let listener = Listener::noop();

        let err = registry.add_listener("listen", &listener, &[]).unwrap_err();

        assert!(matches!(err, RegistryError::Delegate { operation: DelegateOperation::Add, .. }));
        assert!(registry.contains("listen", &listener));
    }

    #[test]
    fn test_emit_truthy_policy_drops_falsy_payloads() {
        let registry = EventRegistry::with_config(
            RegistryConfig::new().with_payload_policy(PayloadPolicy::Truthy),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener = Listener::new(move |payload| {
            sink.lock().push(payload.cloned());
            Ok(())
        });
        registry.add_listener("count", &listener, &[]).unwrap();

        registry.emit("count", Some(json!(0))).unwrap();
        registry.emit("count", Some(json!(""))).unwrap();
        registry.emit("count", Some(json!(3))).unwrap();

        assert_eq!(*seen.lock(), vec![None, None, Some(json!(3))]);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(global(), global()));
    }
}
