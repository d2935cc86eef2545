use crate::{browser::{BrowserDriver, ElementState, WaitState, config::LaunchOptions, url::normalize_url, wait_timeout},
            error::{BrowserError, Result},
            selector::Locator};
use headless_chrome::{Browser, Element, Tab};
use log::debug;
use serde_json::json;
use std::{ffi::OsStr,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}},
          thread,
          time::{Duration, Instant}};

const LOCATE_JS: &str = include_str!("locate.js");

/// Attribute the locate script stamps on the element an action targets
const MARK_SELECTOR: &str = "[data-plan-runner-target]";

/// How often a wait re-checks the page
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Browser session that manages a Chrome/Chromium instance and one tab
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,

    /// The tab every action runs in
    tab: Arc<Tab>,

    /// Pause after each action
    slow_mo: Duration,

    closed: AtomicBool,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // A plan can sit in long waits; keep the browser from closing itself in between
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.sandbox = options.sandbox;

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        let browser = Browser::new(launch_opts).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self {
            browser,
            tab,
            slow_mo: options.slow_mo,
            closed: AtomicBool::new(false),
        })
    }

    /// Evaluate a script that returns JSON text and parse the result
    pub fn evaluate_json(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;

        let value = result
            .value
            .ok_or_else(|| BrowserError::EvaluationFailed("No value returned from script".to_string()))?;

        match value {
            serde_json::Value::String(text) => serde_json::from_str(&text)
                .map_err(|e| BrowserError::EvaluationFailed(format!("Script returned invalid JSON: {}", e))),
            other => Ok(other),
        }
    }

    fn run_locate(&self, locator: &Locator, mode: &str) -> Result<String> {
        let script = format!("({})({}, {})", LOCATE_JS.trim(), locator.to_query(), json!(mode));

        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;

        let outcome = result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| BrowserError::EvaluationFailed("Locator script returned no value".to_string()))?;

        match outcome.strip_prefix("invalid:") {
            Some(reason) => Err(BrowserError::InvalidSelector(format!("'{}': {}", locator.describe(), reason))),
            None => Ok(outcome),
        }
    }

    fn observe(&self, locator: &Locator) -> Result<ElementState> {
        let state = match self.run_locate(locator, "observe")?.as_str() {
            "visible" => ElementState::Visible,
            "hidden" => ElementState::Hidden,
            _ => ElementState::Detached,
        };
        Ok(state)
    }

    /// Resolve the first match of a locator to a CDP element handle
    fn element(&self, locator: &Locator) -> Result<Element<'_>> {
        if self.run_locate(locator, "mark")? != "marked" {
            return Err(BrowserError::ElementNotFound(format!("'{}'", locator.describe())));
        }

        self.tab
            .find_element(MARK_SELECTOR)
            .map_err(|e| BrowserError::ElementNotFound(format!("'{}': {}", locator.describe(), e)))
    }

    /// Focus an element and put the caret at the end of its value
    fn focus_end(element: &Element<'_>, tool: &str) -> Result<()> {
        element
            .call_js_fn(
                "function () { this.focus(); if (typeof this.value === 'string' && typeof this.setSelectionRange === 'function') { try { const n = this.value.length; this.setSelectionRange(n, n); } catch (e) {} } }",
                vec![],
                false,
            )
            .map_err(|e| BrowserError::ToolExecutionFailed {
                tool: tool.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn type_str(&self, text: &str, tool: &str) -> Result<()> {
        self.tab.type_str(text).map_err(|e| BrowserError::ToolExecutionFailed {
            tool: tool.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn pause(&self) {
        if !self.slow_mo.is_zero() {
            thread::sleep(self.slow_mo);
        }
    }
}

impl BrowserDriver for BrowserSession {
    fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let url = normalize_url(url);
        self.tab.set_default_timeout(timeout);

        self.tab
            .navigate_to(&url)
            .map_err(|e| BrowserError::from_cdp(format!("Failed to navigate to {}", url), e))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::from_cdp(format!("Navigation to {} did not complete", url), e))?;

        self.pause();
        Ok(())
    }

    fn wait_for(&self, locator: &Locator, state: WaitState, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.observe(locator) {
                Ok(observed) if state.is_satisfied_by(observed) => return Ok(()),
                Ok(_) => {}
                Err(err @ BrowserError::InvalidSelector(_)) => return Err(err),
                // The page may be mid-navigation; keep polling until the deadline
                Err(err) => debug!("Checking '{}' failed: {}", locator.describe(), err),
            }

            if Instant::now() >= deadline {
                return Err(wait_timeout(locator, state, timeout));
            }
            thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    fn click(&self, locator: &Locator) -> Result<()> {
        self.element(locator)?
            .click()
            .map_err(|e| BrowserError::ToolExecutionFailed {
                tool: "click".to_string(),
                reason: e.to_string(),
            })?;

        self.pause();
        Ok(())
    }

    fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.element(locator)?;
        element
            .call_js_fn(
                "function () { if ('value' in this) { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); } else if (this.isContentEditable) { this.textContent = ''; } }",
                vec![],
                false,
            )
            .map_err(|e| BrowserError::ToolExecutionFailed {
                tool: "type".to_string(),
                reason: e.to_string(),
            })?;

        Self::focus_end(&element, "type")?;
        self.type_str(text, "type")?;

        self.pause();
        Ok(())
    }

    fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.element(locator)?;
        Self::focus_end(&element, "type")?;
        self.type_str(text, "type")?;

        self.pause();
        Ok(())
    }

    fn inner_text(&self, locator: &Locator) -> Result<String> {
        self.element(locator)?
            .get_inner_text()
            .map_err(|e| BrowserError::ToolExecutionFailed {
                tool: "extract_text".to_string(),
                reason: e.to_string(),
            })
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // headless_chrome has no explicit shutdown; the process exits when Browser drops
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();
        for tab in tabs {
            if let Err(e) = tab.close(false) {
                debug!("Failed to close tab: {}", e);
            }
        }
        Ok(())
    }
}
