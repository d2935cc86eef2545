//! The planning seam
//!
//! Plan generation itself (prompting a language model) lives outside this crate behind
//! [`Planner`]. This module builds what a planner receives and persists what it returns.

use crate::error::RunnerError;
use crate::plan::{Plan, plan_schema, save_plan};
use crate::snapshot::{ContextSource, PageInspector, Snapshot, SnapshotAcquirer};
use async_trait::async_trait;
use log::info;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Turns a goal and page context into a plan
#[async_trait]
pub trait Planner: Send + Sync {
    async fn generate_plan(&self, context: &PlanningContext) -> anyhow::Result<Plan>;
}

/// Everything a planner is given for one goal
#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub goal: String,

    /// JSON Schema the generated plan must follow
    pub json_schema: Value,

    pub snapshot: Snapshot,
}

impl PlanningContext {
    pub fn new(goal: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            goal: goal.into(),
            json_schema: plan_schema(),
            snapshot,
        }
    }

    /// `{goal, json_schema, <SOURCE>: summary}`, keyed by where the summary came from
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("goal".to_string(), Value::String(self.goal.clone()));
        payload.insert("json_schema".to_string(), self.json_schema.clone());
        payload.insert(
            self.snapshot.source.key().to_string(),
            serde_json::to_value(&self.snapshot.summary).unwrap_or(Value::Null),
        );
        Value::Object(payload)
    }
}

/// Acquire page context for `goal`, ask the planner for a plan and write it to `path`
pub async fn prepare_plan<P, R, I>(
    goal: &str,
    planner: &P,
    acquirer: &SnapshotAcquirer<R, I>,
    path: &Path,
) -> Result<PathBuf, RunnerError>
where
    P: Planner + ?Sized,
    R: ContextSource,
    I: PageInspector,
{
    if goal.trim().is_empty() {
        return Err(RunnerError::PlanGeneration("goal is empty".to_string()));
    }

    let snapshot = acquirer.acquire(goal).await;
    let context = PlanningContext::new(goal, snapshot);

    let plan = planner
        .generate_plan(&context)
        .await
        .map_err(|e| RunnerError::PlanGeneration(format!("{:#}", e)))?;

    let written = save_plan(path, &plan).map_err(|e| RunnerError::PlanGeneration(e.to_string()))?;
    info!("Wrote plan with {} steps to {}", plan.steps.len(), written.display());
    Ok(written)
}
