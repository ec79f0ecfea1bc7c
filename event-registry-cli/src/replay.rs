//! Scenario replay
//!
//! Builds named listeners and recording delegates, drives an [`EventRegistry`]
//! through the scenario steps, and collects everything that happened into a
//! [`Report`].

use crate::report::{ForwardedCall, Invocation, Report, ReportedRegistration};
use crate::scenario::{Scenario, Step};
use event_registry::{EventRegistry, Listener, Payload, RecordingDelegate};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Errors in the scenario itself (as opposed to failures while replaying it)
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Unknown delegate '{0}'")]
    UnknownDelegate(String),

    #[error("Delegate '{name}' shares a hook with '{target}', which must be declared before it")]
    UndeclaredHookSource { name: String, target: String },

    #[error("Delegate '{0}' is declared more than once")]
    DuplicateDelegate(String),
}

/// Shared record of listener calls, drained after every emit
#[derive(Clone, Default)]
struct InvocationLog(Arc<Mutex<Vec<(String, Option<Payload>)>>>);

impl InvocationLog {
    fn push(&self, listener: &str, payload: Option<Payload>) {
        self.0.lock().push((listener.to_string(), payload));
    }

    fn drain(&self) -> Vec<(String, Option<Payload>)> {
        self.0.lock().drain(..).collect()
    }
}

struct Replay {
    registry: EventRegistry,
    delegates: BTreeMap<String, RecordingDelegate>,
    listeners: Vec<(String, Listener)>,
    failing: Vec<String>,
    log: InvocationLog,
}

impl Replay {
    fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let mut delegates: BTreeMap<String, RecordingDelegate> = BTreeMap::new();

        for config in &scenario.delegates {
            if delegates.contains_key(&config.name) {
                return Err(ScenarioError::DuplicateDelegate(config.name.clone()));
            }

            let mut recorder = RecordingDelegate::new();
            if let Some(target) = &config.shares_add_with {
                let source = Self::hook_source(&delegates, &config.name, target)?;
                recorder = recorder.with_add(source.delegate().add_hook().clone());
            }
            if let Some(target) = &config.shares_remove_with {
                let source = Self::hook_source(&delegates, &config.name, target)?;
                recorder = recorder.with_remove(source.delegate().remove_hook().clone());
            }
            delegates.insert(config.name.clone(), recorder);
        }

        Ok(Self {
            registry: EventRegistry::with_config(scenario.registry.clone()),
            delegates,
            listeners: Vec::new(),
            failing: scenario
                .listeners
                .iter()
                .filter(|l| l.fail)
                .map(|l| l.name.clone())
                .collect(),
            log: InvocationLog::default(),
        })
    }

    fn hook_source<'a>(
        delegates: &'a BTreeMap<String, RecordingDelegate>,
        name: &str,
        target: &str,
    ) -> Result<&'a RecordingDelegate, ScenarioError> {
        delegates.get(target).ok_or_else(|| ScenarioError::UndeclaredHookSource {
            name: name.to_string(),
            target: target.to_string(),
        })
    }

    /// Look up a listener by name, creating it on first use
    fn listener(&mut self, name: &str) -> Listener {
        if let Some((_, listener)) = self.listeners.iter().find(|(n, _)| n == name) {
            return listener.clone();
        }

        let log = self.log.clone();
        let owned = name.to_string();
        let fail = self.failing.iter().any(|f| f == name);
        let listener = Listener::new(move |payload: Option<&Payload>| {
            log.push(&owned, payload.cloned());
            if fail {
                anyhow::bail!("listener '{}' failed", owned);
            }
            Ok(())
        });
        self.listeners.push((name.to_string(), listener.clone()));
        listener
    }

    fn listener_name(&self, listener: &Listener) -> String {
        self.listeners
            .iter()
            .find(|(_, l)| l.ptr_eq(listener))
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    fn step(&mut self, step: &Step, invocations: &mut Vec<Invocation>) -> anyhow::Result<()> {
        match step {
            Step::Add { event, listener, extra } => {
                let listener = self.listener(listener);
                self.registry.add_listener(event, &listener, extra)?;
            }
            Step::Remove { event, listener, extra } => {
                let listener = self.listener(listener);
                self.registry.remove_listener(event, &listener, extra)?;
            }
            Step::Emit { event, payload } => {
                let result = self.registry.emit(event, payload.clone());
                // Record calls made before a failure as well
                invocations.extend(self.log.drain().into_iter().map(|(listener, payload)| Invocation {
                    listener,
                    event: event.clone(),
                    payload,
                }));
                result?;
            }
            Step::SetDelegate { delegate } => {
                let recorder = self
                    .delegates
                    .get(delegate)
                    .ok_or_else(|| ScenarioError::UnknownDelegate(delegate.clone()))?;
                self.registry.set_implementation(recorder.delegate())?;
            }
            Step::ClearDelegate => self.registry.use_without_implementation(),
        }
        Ok(())
    }

    fn into_report(self, steps_run: usize, error: Option<String>, invocations: Vec<Invocation>) -> Report {
        let delegate_calls = self
            .delegates
            .iter()
            .map(|(name, recorder)| {
                let calls = recorder
                    .calls()
                    .into_iter()
                    .map(|call| ForwardedCall {
                        operation: call.operation,
                        event: call.event,
                        listener: self.listener_name(&call.listener),
                        extra: call.extra,
                    })
                    .collect();
                (name.clone(), calls)
            })
            .collect();

        let registrations = self
            .registry
            .registrations()
            .into_iter()
            .map(|r| ReportedRegistration {
                listener: self.listener_name(&r.listener),
                event: r.event,
            })
            .collect();

        Report {
            steps_run,
            error,
            invocations,
            delegate_calls,
            registrations,
        }
    }
}

/// Replay a scenario and report what happened
///
/// A failing step stops the replay; the failure is recorded in the report rather
/// than returned, so everything observed up to that point is still shown.
pub fn run(scenario: &Scenario) -> Result<Report, ScenarioError> {
    let mut replay = Replay::new(scenario)?;
    let mut invocations = Vec::new();
    let mut steps_run = 0;
    let mut error = None;

    for (index, step) in scenario.steps.iter().enumerate() {
        log::debug!("Step {}: {:?}", index + 1, step);
        steps_run += 1;
        if let Err(e) = replay.step(step, &mut invocations) {
            log::warn!("Step {} failed: {:#}", index + 1, e);
            error = Some(format!("step {}: {:#}", index + 1, e));
            break;
        }
    }

    Ok(replay.into_report(steps_run, error, invocations))
}
