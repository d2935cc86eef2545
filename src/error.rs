use std::path::PathBuf;
use thiserror::Error;

/// Faults raised while driving the browser during a step
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Browser failed to launch
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// An element or page never reached the required state before the deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Element could not be resolved for an action
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Selector rejected by the page
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// JavaScript evaluation failed
    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    /// Step arguments missing or ill-typed
    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Action against a resolved element failed
    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    /// Tab operation failed
    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),
}

impl BrowserError {
    /// Whether this fault is timeout-kind
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::Timeout(_))
    }

    /// Classify an error surfaced by the CDP layer, keeping its timeouts timeout-kind
    pub(crate) fn from_cdp(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        let message = format!("{}: {}", context.into(), err);
        let lowered = message.to_lowercase();
        if lowered.contains("timeout") || lowered.contains("timed out") || lowered.contains("never came") {
            BrowserError::Timeout(message)
        } else {
            BrowserError::NavigationFailed(message)
        }
    }
}

/// Result type alias for browser and step operations
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Fatal plan-load failures. Any of these terminates the runner with [`PlanLoadError::EXIT_CODE`].
#[derive(Debug, Error)]
pub enum PlanLoadError {
    #[error("Plan file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read plan file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plan file is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("Plan is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Plan document is not a JSON object")]
    NotAnObject,

    #[error("Plan is missing a 'steps' array")]
    MissingSteps,

    #[error("Plan step {index} is malformed: {reason}")]
    InvalidStep { index: usize, reason: String },
}

impl PlanLoadError {
    /// Process exit status for a load-fatal error
    pub const EXIT_CODE: i32 = 2;
}

/// Snapshot acquisition faults. Never fatal to the process.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("mcp sse failed: {0}")]
    Connect(String),

    #[error("mcp handshake failed: {0}")]
    Handshake(String),

    #[error("mcp request failed: {0}")]
    Request(String),

    #[error("mcp snapshot timed out after {0}ms")]
    TimedOut(u128),

    #[error("no snapshot-like tool found on MCP server")]
    NoSnapshotTool,

    #[error("snapshot tool returned no usable JSON")]
    NoUsablePayload,

    #[error("no snapshot")]
    Empty,

    #[error("no URL found (include a URL in the goal or set START_URL)")]
    NoUrl,

    #[error("page inspection fallback failed: {0}")]
    Fallback(String),
}

impl From<BrowserError> for SnapshotError {
    fn from(err: BrowserError) -> Self {
        SnapshotError::Fallback(err.to_string())
    }
}

/// Caller-side faults when invoking the runner as a subprocess
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Plan generation failed: {0}")]
    PlanGeneration(String),

    #[error("Failed to start runner: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Runner timed out")]
    TimedOut,

    #[error("{0}")]
    Failed(String),
}

impl RunnerError {
    /// HTTP status a calling service reports for this fault
    pub fn status_code(&self) -> u16 {
        match self {
            RunnerError::PlanGeneration(_) => 400,
            RunnerError::TimedOut => 504,
            RunnerError::Spawn(_) | RunnerError::Failed(_) => 500,
        }
    }
}
