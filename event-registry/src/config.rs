//! Registry configuration types
//!
//! The registry itself has almost no knobs: how a supplied payload is handed to
//! listeners, and whether dispatch is traced per listener.

use crate::types::Payload;
use serde::{Deserialize, Serialize};

/// Configuration for an [`EventRegistry`](crate::EventRegistry)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How a supplied payload is forwarded to listeners on emit
    #[serde(default)]
    pub payload_policy: PayloadPolicy,

    /// Log every single listener invocation at trace level
    #[serde(default)]
    pub log_dispatch: bool,
}

/// Controls whether a "falsy" payload reaches listeners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadPolicy {
    /// Any payload passed to `emit` is forwarded, even `0`, `""`, `false` or `null`
    #[default]
    Explicit,
    /// Falsy payloads are dropped and listeners are called without a payload
    Truthy,
}

impl PayloadPolicy {
    /// Resolve what a listener receives for the payload given to `emit`
    pub fn apply(self, payload: Option<Payload>) -> Option<Payload> {
        match self {
            PayloadPolicy::Explicit => payload,
            PayloadPolicy::Truthy => payload.filter(is_truthy),
        }
    }
}

/// Truthiness of a JSON payload: `null`, `false`, zero and `""` are falsy
pub fn is_truthy(payload: &Payload) -> bool {
    match payload {
        Payload::Null => false,
        Payload::Bool(b) => *b,
        Payload::Number(n) => n.as_f64().map_or(true, |v| v != 0.0 && !v.is_nan()),
        Payload::String(s) => !s.is_empty(),
        Payload::Array(_) | Payload::Object(_) => true,
    }
}

impl RegistryConfig {
    /// Create a new registry configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the payload policy
    pub fn with_payload_policy(mut self, policy: PayloadPolicy) -> Self {
        self.payload_policy = policy;
        self
    }

    /// Builder method: enable or disable per-listener dispatch logging
    pub fn with_dispatch_logging(mut self, enabled: bool) -> Self {
        self.log_dispatch = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_config_builder() {
        let config = RegistryConfig::new()
            .with_payload_policy(PayloadPolicy::Truthy)
            .with_dispatch_logging(true);

        assert_eq!(config.payload_policy, PayloadPolicy::Truthy);
        assert!(config.log_dispatch);
    }

    #[test]
    fn test_defaults_are_explicit_and_quiet() {
        let config: RegistryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.payload_policy, PayloadPolicy::Explicit);
        assert!(!config.log_dispatch);
    }

    #[test]
    fn test_policy_names_are_lowercase() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"payload_policy": "truthy"}"#).unwrap();
        assert_eq!(config.payload_policy, PayloadPolicy::Truthy);
    }

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(-0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{} should be falsy", falsy);
        }
        for truthy in [json!(true), json!(1), json!(-2.5), json!("0"), json!([]), json!({})] {
            assert!(is_truthy(&truthy), "{} should be truthy", truthy);
        }
    }

    #[test]
    fn test_policy_apply() {
        assert_eq!(PayloadPolicy::Explicit.apply(Some(json!(0))), Some(json!(0)));
        assert_eq!(PayloadPolicy::Truthy.apply(Some(json!(0))), None);
        assert_eq!(PayloadPolicy::Truthy.apply(Some(json!("music"))), Some(json!("music")));
        assert_eq!(PayloadPolicy::Explicit.apply(None), None);
    }
}
