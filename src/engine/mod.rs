//! Plan execution
//!
//! [`PlanExecutor`] runs the steps of a [`Plan`] strictly in order against one browser session:
//!
//! - `Ready -> Running(1) -> ... -> Completed` when every step succeeds
//! - `Running(i) -> Failed(i)` on the first fault; remaining steps are abandoned, captures kept
//!
//! Whatever the terminal state, the run prints the captured values, the rendered report template
//! when it renders, and finally exactly one JSON report line. The session is closed when the run
//! ends, including when a step panics.

pub mod interpreter;
pub mod report;

pub use interpreter::{StepContext, StepOutcome, extract_text, run_step};
pub use report::{ExecutionReport, ExtractedValues, render_template};

use crate::browser::BrowserDriver;
use crate::plan::Plan;
use crate::selector::SelectorNormalizer;
use log::{debug, info, warn};
use serde_json::Value;
use std::io::{self, Write};
use std::time::Duration;

/// Deadline for every wait of a run unless configured otherwise
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Position of a run in its step sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Ready,
    /// Executing the step with this 1-based index
    Running(usize),
    Failed {
        step: usize,
        message: String,
    },
    Completed,
}

/// Result of a run: where it stopped and what it reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub state: RunState,
    pub report: ExecutionReport,
}

impl ExecutionOutcome {
    /// Message of the failing step, if the run failed
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            RunState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Executes plans against a browser driver
pub struct PlanExecutor<'a, D: BrowserDriver + ?Sized> {
    driver: &'a D,
    normalizer: SelectorNormalizer,
    timeout: Duration,
}

impl<'a, D: BrowserDriver + ?Sized> PlanExecutor<'a, D> {
    pub fn new(driver: &'a D) -> Self {
        Self {
            driver,
            normalizer: SelectorNormalizer::default(),
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    /// Builder method: set the deadline shared by every wait of the run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method: set the selector normalizer
    pub fn with_normalizer(mut self, normalizer: SelectorNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Run a plan, writing progress and the final report to `out`.
    ///
    /// Consumes the session: the driver is closed before this returns, on every path.
    pub fn execute(&self, plan: &Plan, out: &mut dyn Write) -> io::Result<ExecutionOutcome> {
        let _release = SessionRelease(self.driver);

        let ctx = StepContext {
            normalizer: &self.normalizer,
            timeout: self.timeout,
        };

        let mut extracted = ExtractedValues::new();
        let mut state = RunState::Ready;

        writeln!(out, "Goal: {}", if plan.goal.is_empty() { "(none)" } else { &plan.goal })?;

        for (i, step) in plan.steps.iter().enumerate() {
            let index = i + 1;
            state = RunState::Running(index);

            writeln!(out, "Step {}: {} {}", index, step.tool, Value::Object(step.args.clone()))?;
            info!("Running step {} of {}: {}", index, plan.steps.len(), step.tool);

            match run_step(self.driver, step, &ctx) {
                Ok(StepOutcome::Extracted(text)) => match &step.id {
                    Some(id) => extracted.record(id.as_str(), text),
                    None => debug!("Step {} extracted text without an id; not captured", index),
                },
                Ok(StepOutcome::Skipped(tool)) => writeln!(out, "Skipping unknown tool: {}", tool)?,
                Ok(StepOutcome::Completed) => {}
                Err(err) => {
                    let message = err.to_string();
                    warn!("Step {} failed: {}", index, message);
                    writeln!(out, "Error: {}", message)?;
                    state = RunState::Failed { step: index, message };
                    break;
                }
            }
        }

        if matches!(state, RunState::Ready | RunState::Running(_)) {
            state = RunState::Completed;
        }

        if !extracted.is_empty() {
            writeln!(out, "\n--- Extracted Values ---")?;
            for (id, value) in extracted.iter() {
                writeln!(out, "{}: {}", id, value)?;
            }
        }

        match plan.final_report.as_deref().map(|t| (t, render_template(t, &extracted))) {
            Some((_, Some(rendered))) => writeln!(out, "{}", rendered)?,
            Some((template, None)) => debug!("Final report template did not render, using canonical report: {}", template),
            None if state == RunState::Completed => writeln!(out, "Success! Plan executed.")?,
            None => {}
        }

        writeln!(out, "Closing browser...")?;

        let failure = match &state {
            RunState::Failed { message, .. } => Some(message.clone()),
            _ => None,
        };
        let report = ExecutionReport::new(plan.goal.clone(), extracted, failure);
        writeln!(out, "{}", report.to_json_line())?;
        out.flush()?;

        Ok(ExecutionOutcome { state, report })
    }
}

/// Closes the session when dropped
struct SessionRelease<'a, D: BrowserDriver + ?Sized>(&'a D);

impl<D: BrowserDriver + ?Sized> Drop for SessionRelease<'_, D> {
    fn drop(&mut self) {
        if let Err(err) = self.0.close() {
            warn!("Failed to close browser session: {}", err);
        }
    }
}
