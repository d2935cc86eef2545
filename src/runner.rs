//! Invoking `plan-runner` as a bounded subprocess
//!
//! A calling service never runs a plan in-process: it writes the plan file, starts the runner
//! binary with a deadline and reads the report back from its standard output.

use crate::engine::ExecutionReport;
use crate::error::RunnerError;
use crate::output::parse_runner_output;
use crate::plan::DEFAULT_PLAN_PATH;
use crate::planner::{Planner, prepare_plan};
use crate::snapshot::{ContextSource, PageInspector, SnapshotAcquirer};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Overall deadline for one runner invocation when none is given
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// How a calling service starts the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path of the `plan-runner` executable
    pub program: PathBuf,

    /// Where the generated plan is written and read back from
    pub plan_path: PathBuf,

    pub timeout: Duration,
}

impl RunnerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            plan_path: PathBuf::from(DEFAULT_PLAN_PATH),
            timeout: DEFAULT_RUN_TIMEOUT,
        }
    }

    pub fn plan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_path = path.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run a plan file through the runner binary and return its standard output.
///
/// The child is killed if it outlives `timeout`. A non-zero exit is a failure carrying the
/// child's standard error.
pub async fn run_plan_subprocess(program: &Path, plan_path: &Path, timeout: Duration) -> Result<String, RunnerError> {
    info!("Starting {} {}", program.display(), plan_path.display());

    let child = Command::new(program)
        .arg(plan_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(RunnerError::Spawn)?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(RunnerError::Spawn)?,
        Err(_) => {
            warn!("Runner exceeded {}ms; killing it", timeout.as_millis());
            return Err(RunnerError::TimedOut);
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        warn!("Runner exited with {}", output.status);
        return Err(RunnerError::Failed(if detail.is_empty() {
            "Runner error".to_string()
        } else {
            detail.to_string()
        }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Plan a goal, run the plan and report what it captured.
///
/// Errors map onto caller statuses through [`RunnerError::status_code`].
pub async fn launch<P, R, I>(
    goal: &str,
    planner: &P,
    acquirer: &SnapshotAcquirer<R, I>,
    config: &RunnerConfig,
) -> Result<ExecutionReport, RunnerError>
where
    P: Planner + ?Sized,
    R: ContextSource,
    I: PageInspector,
{
    prepare_plan(goal, planner, acquirer, &config.plan_path).await?;
    let stdout = run_plan_subprocess(&config.program, &config.plan_path, config.timeout).await?;
    Ok(parse_runner_output(goal, &stdout))
}
