//! Replay report generation
//!
//! Renders what a scenario replay observed as plain text or JSON.

use anyhow::Result;
use event_registry::{DelegateOperation, Payload};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// One listener call observed during an emit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub listener: String,
    pub event: String,
    pub payload: Option<Payload>,
}

/// One call that reached a delegate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardedCall {
    pub operation: DelegateOperation,
    pub event: String,
    pub listener: String,
    pub extra: Vec<Payload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedRegistration {
    pub event: String,
    pub listener: String,
}

/// Everything a replay observed
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub steps_run: usize,
    pub error: Option<String>,
    pub invocations: Vec<Invocation>,
    pub delegate_calls: BTreeMap<String, Vec<ForwardedCall>>,
    pub registrations: Vec<ReportedRegistration>,
}

impl Report {
    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as plain text
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "Steps run: {}", self.steps_run);
        if let Some(error) = &self.error {
            let _ = writeln!(out, "Stopped:   {}", error);
        }

        let _ = writeln!(out, "\nListener invocations ({}):", self.invocations.len());
        for invocation in &self.invocations {
            match &invocation.payload {
                Some(payload) => {
                    let _ = writeln!(out, "  {} <- {} ({})", invocation.listener, invocation.event, payload);
                }
                None => {
                    let _ = writeln!(out, "  {} <- {}", invocation.listener, invocation.event);
                }
            }
        }

        let _ = writeln!(out, "\nDelegate calls:");
        for (name, calls) in &self.delegate_calls {
            let _ = writeln!(out, "  {} ({}):", name, calls.len());
            for call in calls {
                let verb = match call.operation {
                    DelegateOperation::Add => "add",
                    DelegateOperation::Remove => "remove",
                };
                let _ = write!(out, "    {} {} {}", verb, call.event, call.listener);
                if !call.extra.is_empty() {
                    let extra: Vec<String> = call.extra.iter().map(|v| v.to_string()).collect();
                    let _ = write!(out, " [{}]", extra.join(", "));
                }
                let _ = writeln!(out);
            }
        }

        let _ = writeln!(out, "\nRegistrations ({}):", self.registrations.len());
        for registration in &self.registrations {
            let _ = writeln!(out, "  {} -> {}", registration.event, registration.listener);
        }

        out
    }
}
