//! Scenario file loading and parsing

use anyhow::{Context, Result};
use event_registry::{Payload, RegistryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A scripted replay against one registry (loaded from a TOML file)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub delegates: Vec<DelegateConfig>,
    #[serde(default)]
    pub listeners: Vec<ListenerConfig>,
    pub steps: Vec<Step>,
}

/// A named recording delegate
///
/// `shares_add_with` / `shares_remove_with` reuse the hook of a delegate declared
/// earlier, which makes the two delegates compare as the same backend for that
/// operation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelegateConfig {
    pub name: String,
    pub shares_add_with: Option<String>,
    pub shares_remove_with: Option<String>,
}

/// Optional per-listener behavior; undeclared listeners are created on first use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    pub name: String,
    /// Return an error from every invocation
    #[serde(default)]
    pub fail: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Add {
        event: String,
        listener: String,
        #[serde(default)]
        extra: Vec<Payload>,
    },
    Remove {
        event: String,
        listener: String,
        #[serde(default)]
        extra: Vec<Payload>,
    },
    Emit {
        event: String,
        payload: Option<Payload>,
    },
    SetDelegate {
        delegate: String,
    },
    ClearDelegate,
}

/// Load a scenario from a TOML file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {:?}", path))?;

    parse_scenario(&content).with_context(|| format!("Failed to parse scenario file: {:?}", path))
}

/// Parse a scenario from TOML text
pub fn parse_scenario(content: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(content)?;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_registry::PayloadPolicy;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_scenario_deserialization() {
        let toml_content = r#"
            [registry]
            payload_policy = "truthy"

            [[delegates]]
            name = "native"

            [[delegates]]
            name = "patched"
            shares_remove_with = "native"

            [[steps]]
            action = "set_delegate"
            delegate = "native"

            [[steps]]
            action = "add"
            event = "tick"
            listener = "f"
            extra = [1, "capture"]

            [[steps]]
            action = "emit"
            event = "tick"
            payload = { count = 2 }

            [[steps]]
            action = "clear_delegate"
        "#;

        let scenario = parse_scenario(toml_content).unwrap();
        assert_eq!(scenario.registry.payload_policy, PayloadPolicy::Truthy);
        assert_eq!(scenario.delegates.len(), 2);
        assert_eq!(scenario.delegates[1].shares_remove_with.as_deref(), Some("native"));
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(
            scenario.steps[1],
            Step::Add {
                event: "tick".to_string(),
                listener: "f".to_string(),
                extra: vec![json!(1), json!("capture")],
            }
        );
        assert_eq!(
            scenario.steps[2],
            Step::Emit {
                event: "tick".to_string(),
                payload: Some(json!({"count": 2})),
            }
        );
        assert_eq!(scenario.steps[3], Step::ClearDelegate);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let toml_content = r#"
            [[steps]]
            action = "broadcast"
            event = "tick"
        "#;

        assert!(parse_scenario(toml_content).is_err());
    }

    #[test]
    fn test_load_scenario_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[steps]]\naction = \"emit\"\nevent = \"tick\"").unwrap();

        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.registry, RegistryConfig::default());
        assert!(scenario.delegates.is_empty());
        assert_eq!(scenario.steps.len(), 1);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_scenario(Path::new("does-not-exist.toml")).unwrap_err();
        assert!(err.to_string().contains("does-not-exist.toml"));
    }
}
