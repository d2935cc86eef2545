//! # plan-runner
//!
//! Executes language-model generated browser action plans via Chrome DevTools Protocol (CDP).
//!
//! A plan is a small JSON document: a goal, an ordered list of browser steps and an optional
//! report template. The runner executes the steps against one headless Chrome session, captures
//! the text the plan asks for and always finishes with a single machine-readable report line.
//!
//! ## Running a Plan
//!
//! ```bash
//! # Run ./plan.json headless
//! cargo run --bin plan-runner
//!
//! # Run another plan with a visible, slowed-down browser
//! cargo run --bin plan-runner -- plans/checkout.json --headed --slow-mo 250
//! ```
//!
//! The last line of standard output is the report:
//!
//! ```text
//! {"goal":"Find the backpack price","extracted":{"price":"$29.99"}}
//! ```
//!
//! A plan that cannot be loaded exits with status 2 and prints nothing to standard output.
//!
//! ## Library Usage
//!
//! ### Executing a Plan
//!
//! ```rust,no_run
//! use plan_runner::{BrowserSession, LaunchOptions, PlanExecutor, load_plan};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = load_plan("plan.json")?;
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//!
//! let outcome = PlanExecutor::new(&session)
//!     .with_timeout(Duration::from_secs(10))
//!     .execute(&plan, &mut std::io::stdout())?;
//!
//! if let Some(message) = outcome.failure() {
//!     eprintln!("stopped early: {}", message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Gathering Page Context for a Planner
//!
//! ```rust,no_run
//! use plan_runner::{PlanningContext, SnapshotConfig, acquire_snapshot};
//!
//! # async fn run() {
//! let goal = "Find the price of the backpack on https://www.saucedemo.com";
//! let snapshot = acquire_snapshot(goal, SnapshotConfig::default()).await;
//!
//! // {goal, json_schema, MCP_SNAPSHOT_SUMMARY | DOM_FALLBACK_SUMMARY}
//! let payload = PlanningContext::new(goal, snapshot).to_payload();
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`selector`]: Selector normalization and item-card flattening
//! - [`browser`]: The [`BrowserDriver`] capability and its CDP session
//! - [`plan`]: Plan documents, loading and typed actions
//! - [`engine`]: Step interpreter, plan executor and reports
//! - [`snapshot`]: Page context from an MCP server, with a headless fallback
//! - [`planner`]: The planning seam and plan persistence
//! - [`output`]: Parsing the runner's standard output from the calling side
//! - [`runner`]: Running `plan-runner` as a bounded subprocess
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod engine;
pub mod error;
pub mod output;
pub mod plan;
pub mod planner;
pub mod runner;
pub mod selector;
pub mod snapshot;

pub use browser::{BrowserDriver, BrowserSession, LaunchOptions, WaitState};
pub use engine::{ExecutionOutcome, ExecutionReport, ExtractedValues, PlanExecutor, RunState};
pub use error::{BrowserError, PlanLoadError, Result, RunnerError, SnapshotError};
pub use output::parse_runner_output;
pub use plan::{Action, Plan, Step, load_plan, parse_plan};
pub use planner::{Planner, PlanningContext, prepare_plan};
pub use runner::{RunnerConfig, launch, run_plan_subprocess};
pub use selector::{Locator, SelectorNormalizer, normalize_selector};
pub use snapshot::{Snapshot, SnapshotAcquirer, SnapshotConfig, SnapshotSummary, acquire_snapshot};
