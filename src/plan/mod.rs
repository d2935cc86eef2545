//! Plan documents: data model, loading and validation
//!
//! A plan is UTF-8 JSON of the shape
//! `{"goal": "...", "steps": [{"tool": "...", "args": {...}, "id": "..."}], "final_report": "..."}`.
//! Loading fails fast on anything that is not a structurally sound plan; a broken plan is an
//! integration bug upstream and must never run as "zero steps, success".

pub mod action;

pub use action::{Action, NavigateParams, SelectorParams, TypeParams, WaitForParams};

use crate::error::{PlanLoadError, Result};
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Plan file used when no path is given
pub const DEFAULT_PLAN_PATH: &str = "plan.json";

/// A loaded plan. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub goal: String,

    pub steps: Vec<Step>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_report: Option<String>,
}

/// One step of a plan, with its capture id already resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub tool: String,

    pub args: Map<String, Value>,

    /// Name under which an extract_text result is captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Wire shape of a plan document, as handed to the planner in JSON Schema form
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PlanDocument {
    /// Plain-language goal the plan satisfies
    pub goal: String,

    /// Browser actions, executed strictly in order
    pub steps: Vec<StepDocument>,

    /// Optional summary template; `{id}` placeholders are replaced with captured values
    #[serde(default)]
    pub final_report: Option<String>,
}

/// Wire shape of a single step
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct StepDocument {
    /// One of: navigate, click, type, wait_for, extract_text
    pub tool: String,

    /// Tool arguments: `url` for navigate; `selector` for the others; `text` and `clear` for
    /// type; `state` (attached, detached, visible, hidden) for wait_for
    #[serde(default)]
    pub args: Option<Map<String, Value>>,

    /// Name for the value an extract_text step captures
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub id: Option<Value>,
}

impl Plan {
    /// Create a plan from already-built steps
    pub fn new(goal: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            goal: goal.into(),
            steps,
            final_report: None,
        }
    }

    /// Builder method: set the final report template
    pub fn with_final_report(mut self, template: impl Into<String>) -> Self {
        self.final_report = Some(template.into());
        self
    }
}

impl Step {
    /// Create a step without a capture id
    pub fn new(tool: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            args,
            id: None,
        }
    }

    /// Builder method: set the capture id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Decode the typed action this step runs
    pub fn action(&self) -> Result<Action> {
        Action::from_step(self)
    }

    fn from_document(index: usize, raw: &Value) -> std::result::Result<Self, PlanLoadError> {
        let doc: StepDocument = serde_json::from_value(raw.clone()).map_err(|e| PlanLoadError::InvalidStep {
            index,
            reason: e.to_string(),
        })?;

        let args = doc.args.unwrap_or_default();
        let id = resolve_step_id(doc.id.as_ref(), args.get("id"));

        Ok(Self {
            tool: doc.tool,
            args,
            id,
        })
    }
}

/// Resolve the capture id of a step.
///
/// Precedence: the step-level `id`, then `args.id` (older plans put it there). Strings and
/// numbers are accepted; empty strings and other types count as absent.
pub fn resolve_step_id(step_id: Option<&Value>, args_id: Option<&Value>) -> Option<String> {
    step_id.and_then(id_string).or_else(|| args_id.and_then(id_string))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse and validate plan text
pub fn parse_plan(text: &str) -> std::result::Result<Plan, PlanLoadError> {
    let value: Value = serde_json::from_str(text)?;
    let object = value.as_object().ok_or(PlanLoadError::NotAnObject)?;

    let raw_steps = object
        .get("steps")
        .and_then(Value::as_array)
        .ok_or(PlanLoadError::MissingSteps)?;

    let goal = match object.get("goal") {
        Some(Value::String(goal)) => goal.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    // Non-string templates cannot be rendered; treat them as absent
    let final_report = object
        .get("final_report")
        .and_then(Value::as_str)
        .map(str::to_string);

    let steps = raw_steps
        .iter()
        .enumerate()
        .map(|(i, raw)| Step::from_document(i + 1, raw))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Plan {
        goal,
        steps,
        final_report,
    })
}

/// Load a plan file
pub fn load_plan(path: impl AsRef<Path>) -> std::result::Result<Plan, PlanLoadError> {
    let path = path.as_ref();

    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PlanLoadError::NotFound(path.to_path_buf()),
        _ => PlanLoadError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    if text.trim().is_empty() {
        return Err(PlanLoadError::Empty(path.to_path_buf()));
    }

    let plan = parse_plan(&text)?;
    info!("Loaded plan with {} steps from {}", plan.steps.len(), path.display());
    Ok(plan)
}

/// Write a plan as pretty-printed JSON
pub fn save_plan(path: impl AsRef<Path>, plan: &Plan) -> io::Result<PathBuf> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(plan).map_err(io::Error::other)?;
    fs::write(path, text)?;
    Ok(path.to_path_buf())
}

/// JSON Schema of the plan document
pub fn plan_schema() -> Value {
    schemars::schema_for!(PlanDocument).to_value()
}
