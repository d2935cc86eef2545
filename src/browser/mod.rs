//! Browser capability and its Chrome DevTools Protocol implementation
//!
//! The execution engine only talks to [`BrowserDriver`]; [`BrowserSession`] implements it on top
//! of `headless_chrome`. Tests substitute scripted drivers.

pub mod config;
pub mod session;
pub mod url;

pub use config::LaunchOptions;
pub use session::BrowserSession;

use crate::error::{BrowserError, Result};
use crate::selector::Locator;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Element state a `wait_for` step can wait for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    /// Present in the DOM
    Attached,
    /// Absent from the DOM
    Detached,
    /// Present with a non-empty box and not hidden by style
    #[default]
    Visible,
    /// Absent or not visible
    Hidden,
}

impl WaitState {
    /// Whether an observed element state satisfies this wait
    pub fn is_satisfied_by(self, observed: ElementState) -> bool {
        match self {
            WaitState::Attached => observed != ElementState::Detached,
            WaitState::Detached => observed == ElementState::Detached,
            WaitState::Visible => observed == ElementState::Visible,
            WaitState::Hidden => observed != ElementState::Visible,
        }
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
        };
        f.write_str(name)
    }
}

/// State of the first element a locator resolves to, as observed by one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    Detached,
    Hidden,
    Visible,
}

/// Low-level browser control the engine calls into.
///
/// Element actions operate on the first match of the locator and do not wait; callers wait for
/// the required state first.
pub trait BrowserDriver {
    /// Load a URL and wait until navigation settles or the timeout elapses
    fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Block until the first match reaches `state`, failing with a timeout-kind error at the deadline
    fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> Result<()>;

    /// Click the first match
    fn click(&self, locator: &Locator) -> Result<()>;

    /// Replace the first match's text content with `text`
    fn fill(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Append `text` to the first match as keystrokes
    fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Rendered text of the first match
    fn inner_text(&self, locator: &Locator) -> Result<String>;

    /// Release the session. Called once when a run ends.
    fn close(&self) -> Result<()>;
}

/// Build a timeout-kind error for a wait that never completed
pub(crate) fn wait_timeout(locator: &Locator, state: WaitState, timeout: Duration) -> BrowserError {
    BrowserError::Timeout(format!(
        "waiting for '{}' to be {} exceeded {}ms",
        locator.describe(),
        state,
        timeout.as_millis()
    ))
}
