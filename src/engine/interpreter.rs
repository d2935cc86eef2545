use crate::browser::{BrowserDriver, WaitState};
use crate::error::Result;
use crate::plan::{Action, Step};
use crate::selector::SelectorNormalizer;
use log::{debug, warn};
use std::time::Duration;

/// Settings shared by every step of one run
#[derive(Debug, Clone)]
pub struct StepContext<'a> {
    pub normalizer: &'a SelectorNormalizer,

    /// Deadline for every wait in the run
    pub timeout: Duration,
}

/// What a successfully executed step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Extracted(String),
    /// Tool not recognized; nothing was done
    Skipped(String),
}

/// Execute one step against the browser
pub fn run_step<D: BrowserDriver + ?Sized>(driver: &D, step: &Step, ctx: &StepContext<'_>) -> Result<StepOutcome> {
    match step.action()? {
        Action::Navigate(params) => {
            driver.navigate(&params.url, ctx.timeout)?;
            Ok(StepOutcome::Completed)
        }
        Action::Click(params) => {
            let locator = ctx.normalizer.locate(&params.selector);
            driver.wait_for(&locator, WaitState::Visible, ctx.timeout)?;
            driver.click(&locator)?;
            Ok(StepOutcome::Completed)
        }
        Action::Type(params) => {
            let locator = ctx.normalizer.locate(&params.selector);
            driver.wait_for(&locator, WaitState::Visible, ctx.timeout)?;
            if params.clear {
                driver.fill(&locator, &params.text)?;
            } else {
                driver.type_text(&locator, &params.text)?;
            }
            Ok(StepOutcome::Completed)
        }
        Action::WaitFor(params) => {
            let locator = ctx.normalizer.locate(&params.selector);
            driver.wait_for(&locator, params.state, ctx.timeout)?;
            Ok(StepOutcome::Completed)
        }
        Action::ExtractText(params) => extract_text(driver, &params.selector, ctx).map(StepOutcome::Extracted),
        Action::Unrecognized(tool) => {
            warn!("Skipping unknown tool: {}", tool);
            Ok(StepOutcome::Skipped(tool))
        }
    }
}

/// Read the text of the element a selector targets, waiting for it to become visible first.
///
/// Item-card selectors are resolved as "first card containing the fragment, then its sub-field"
/// instead of evaluating the nested selector verbatim.
pub fn extract_text<D: BrowserDriver + ?Sized>(driver: &D, selector: &str, ctx: &StepContext<'_>) -> Result<String> {
    let locator = ctx.normalizer.locate(selector);
    debug!("Extracting text from {}", locator.describe());

    driver.wait_for(&locator, WaitState::Visible, ctx.timeout)?;
    driver.inner_text(&locator)
}
