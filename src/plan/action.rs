use crate::browser::WaitState;
use crate::error::{BrowserError, Result};
use crate::plan::Step;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Parameters for the navigate tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
}

/// Parameters for tools that act on one element (click, extract_text)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectorParams {
    /// CSS selector; `:has-text("...")` and legacy `:contains('...')` are accepted
    pub selector: String,
}

/// Parameters for the type tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TypeParams {
    /// CSS selector for the input element
    pub selector: String,

    /// Text to type into the element
    #[serde(default)]
    pub text: String,

    /// Replace existing content (default: true); false appends keystrokes
    #[serde(default = "default_clear")]
    pub clear: bool,
}

fn default_clear() -> bool {
    true
}

/// Parameters for the wait_for tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WaitForParams {
    /// CSS selector to wait for
    pub selector: String,

    /// State to wait for (default: visible)
    #[serde(default)]
    pub state: WaitState,
}

/// One typed browser action, decoded from a step's tool name and arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(NavigateParams),
    Click(SelectorParams),
    Type(TypeParams),
    WaitFor(WaitForParams),
    ExtractText(SelectorParams),
    /// A tool this runner does not know; skipped at execution
    Unrecognized(String),
}

impl Action {
    /// Decode a step. Missing or ill-typed arguments are a step fault, not a load failure.
    pub fn from_step(step: &Step) -> Result<Self> {
        let action = match step.tool.as_str() {
            "navigate" => Action::Navigate(params(step)?),
            "click" => Action::Click(params(step)?),
            "type" => Action::Type(params(step)?),
            "wait_for" => Action::WaitFor(params(step)?),
            "extract_text" => Action::ExtractText(params(step)?),
            other => Action::Unrecognized(other.to_string()),
        };
        Ok(action)
    }
}

fn params<T: DeserializeOwned>(step: &Step) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(step.args.clone())).map_err(|e| {
        BrowserError::InvalidArguments {
            tool: step.tool.clone(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(tool: &str, args: serde_json::Value) -> Step {
        Step::new(tool, args.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_navigate() {
        let action = Action::from_step(&step("navigate", json!({"url": "https://example.test"}))).unwrap();
        assert_eq!(
            action,
            Action::Navigate(NavigateParams {
                url: "https://example.test".to_string()
            })
        );
    }

    #[test]
    fn test_type_defaults_to_clear() {
        let action = Action::from_step(&step("type", json!({"selector": "#user", "text": "standard_user"}))).unwrap();
        match action {
            Action::Type(params) => {
                assert!(params.clear);
                assert_eq!(params.text, "standard_user");
            }
            other => panic!("Expected type action, got {:?}", other),
        }
    }

    #[test]
    fn test_type_append() {
        let action = Action::from_step(&step("type", json!({"selector": "#q", "text": "x", "clear": false}))).unwrap();
        assert!(matches!(action, Action::Type(TypeParams { clear: false, .. })));
    }

    #[test]
    fn test_wait_for_state() {
        let action = Action::from_step(&step("wait_for", json!({"selector": ".spinner", "state": "hidden"}))).unwrap();
        assert!(matches!(
            action,
            Action::WaitFor(WaitForParams {
                state: WaitState::Hidden,
                ..
            })
        ));

        let action = Action::from_step(&step("wait_for", json!({"selector": ".list"}))).unwrap();
        assert!(matches!(
            action,
            Action::WaitFor(WaitForParams {
                state: WaitState::Visible,
                ..
            })
        ));
    }

    #[test]
    fn test_extract_text_ignores_id_arg() {
        let action = Action::from_step(&step("extract_text", json!({"selector": ".price", "id": "price"}))).unwrap();
        assert_eq!(
            action,
            Action::ExtractText(SelectorParams {
                selector: ".price".to_string()
            })
        );
    }

    #[test]
    fn test_missing_required_argument() {
        let err = Action::from_step(&step("click", json!({}))).unwrap_err();
        assert!(err.to_string().contains("click"));
        assert!(err.to_string().contains("selector"));
    }

    #[test]
    fn test_unknown_tool() {
        let action = Action::from_step(&step("hover", json!({"selector": "a"}))).unwrap();
        assert_eq!(action, Action::Unrecognized("hover".to_string()));
    }
}
