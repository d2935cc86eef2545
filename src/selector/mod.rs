//! Selector normalization
//!
//! Plans come from a language model and often carry selector syntax the CDP layer cannot evaluate:
//! jQuery-style `:contains('X')`, or deeply nested filters that amount to "the card containing X,
//! then its name/price". This module rewrites them into a canonical form:
//!
//! 1. `:contains('X')`, `:contains("X")` and `:has-text('X')` become `:has-text("X")`, with
//!    backslashes and double quotes in `X` escaped.
//! 2. When the selector is scoped to an item card, carries a has-text fragment and references a
//!    name or price sub-field, it is flattened to `<card>:has-text("<fragment>") <sub-field>`.
//! 3. A fragment without a recognizable sub-field keeps the has-text form unchanged.
//!
//! Only the first has-text fragment participates in flattening; a flattened selector drops any
//! later fragments along with the rest of the original path.

pub mod locator;

pub use locator::Locator;

use lazy_static::lazy_static;
use log::info;
use regex::{Captures, Regex};

lazy_static! {
    static ref CONTAINS_PATTERN: Regex =
        Regex::new(r#":contains\(\s*(?:'([^']*)'|"((?:[^"\\]|\\.)*)")\s*\)"#).expect("valid regex pattern");
    static ref SINGLE_QUOTED_HAS_TEXT: Regex =
        Regex::new(r":has-text\(\s*'([^']*)'\s*\)").expect("valid regex pattern");
    static ref HAS_TEXT_PATTERN: Regex =
        Regex::new(r#":has-text\(\s*"((?:[^"\\]|\\.)*)"\s*\)"#).expect("valid regex pattern");
    static ref NAME_TOKEN: Regex = Regex::new(r"(?i)\bname\b").expect("valid regex pattern");
    static ref PRICE_TOKEN: Regex = Regex::new(r"(?i)\bprice\b").expect("valid regex pattern");
}

/// Class names describing a repeated "item card" and its named sub-fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCardPattern {
    /// Scope marker of one card, e.g. `.inventory_item`
    pub scope: String,

    /// Sub-field holding the item name
    pub name_field: String,

    /// Sub-field holding the item price
    pub price_field: String,
}

impl Default for ItemCardPattern {
    fn default() -> Self {
        Self {
            scope: ".inventory_item".to_string(),
            name_field: ".inventory_item_name".to_string(),
            price_field: ".inventory_item_price".to_string(),
        }
    }
}

impl ItemCardPattern {
    /// Create a pattern from explicit class selectors
    pub fn new(scope: impl Into<String>, name_field: impl Into<String>, price_field: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name_field: name_field.into(),
            price_field: price_field.into(),
        }
    }

    /// Whether the selector is scoped to the card itself (not merely a sub-field sharing its prefix)
    pub fn is_scoped(&self, selector: &str) -> bool {
        has_class_token(selector, &self.scope)
    }

    /// Sub-field referenced by a selector, preferring the one mentioned last.
    ///
    /// Class-name substrings win over loose `name`/`price` word tokens.
    pub fn sub_field(&self, selector: &str) -> Option<&str> {
        let by_class = [(&self.name_field, self.name_field.trim_start_matches('.')), (&self.price_field, self.price_field.trim_start_matches('.'))]
            .into_iter()
            .filter(|(_, class)| !class.is_empty())
            .filter_map(|(field, class)| selector.rfind(class).map(|pos| (pos, field.as_str())))
            .max_by_key(|(pos, _)| *pos);
        if let Some((_, field)) = by_class {
            return Some(field);
        }

        let last_match = |pattern: &Regex| pattern.find_iter(selector).last().map(|m| m.start());
        match (last_match(&NAME_TOKEN), last_match(&PRICE_TOKEN)) {
            (Some(name), Some(price)) if price > name => Some(&self.price_field),
            (Some(_), _) => Some(&self.name_field),
            (None, Some(_)) => Some(&self.price_field),
            (None, None) => None,
        }
    }
}

/// Rewrites loosely specified selectors into the canonical form the driver executes
#[derive(Debug, Clone, Default)]
pub struct SelectorNormalizer {
    pattern: ItemCardPattern,
}

impl SelectorNormalizer {
    /// Create a normalizer for a specific item-card pattern
    pub fn new(pattern: ItemCardPattern) -> Self {
        Self { pattern }
    }

    /// The item-card pattern in use
    pub fn pattern(&self) -> &ItemCardPattern {
        &self.pattern
    }

    /// Normalize a selector. Pure apart from logging the rewrite when one happens.
    pub fn normalize(&self, selector: &str) -> String {
        let rewritten = rewrite_text_filters(selector);
        let normalized = self.flatten_item_card(&rewritten).unwrap_or(rewritten);

        if normalized != selector {
            info!("Normalized selector: {} -> {}", selector, normalized);
        }

        normalized
    }

    /// Normalize a selector and build the query the driver should run for it
    pub fn locate(&self, selector: &str) -> Locator {
        Locator::from_selector(&self.normalize(selector), &self.pattern)
    }

    fn flatten_item_card(&self, selector: &str) -> Option<String> {
        let fragment = first_has_text(selector)?;
        if !self.pattern.is_scoped(selector) {
            return None;
        }

        let remainder = format!("{}{}", &selector[..fragment.start], &selector[fragment.end..]);
        let field = self.pattern.sub_field(&strip_has_text(&remainder))?;

        Some(format!("{}:has-text(\"{}\") {}", self.pattern.scope, fragment.raw, field))
    }
}

/// Normalize with the default item-card pattern
pub fn normalize_selector(selector: &str) -> String {
    SelectorNormalizer::default().normalize(selector)
}

/// First `:has-text("...")` occurrence in a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HasTextFragment<'a> {
    pub start: usize,
    pub end: usize,
    /// Fragment as written, quote escapes intact
    pub raw: &'a str,
}

impl HasTextFragment<'_> {
    /// Fragment text with quote escapes resolved
    pub fn text(&self) -> String {
        unescape_quotes(self.raw)
    }
}

pub(crate) fn first_has_text(selector: &str) -> Option<HasTextFragment<'_>> {
    let caps = HAS_TEXT_PATTERN.captures(selector)?;
    let whole = caps.get(0)?;
    let raw = caps.get(1)?.as_str();
    Some(HasTextFragment {
        start: whole.start(),
        end: whole.end(),
        raw,
    })
}

/// Remove every double-quoted has-text fragment, leaving the structural part of a selector
pub(crate) fn strip_has_text(selector: &str) -> String {
    HAS_TEXT_PATTERN.replace_all(selector, "").into_owned()
}

fn rewrite_text_filters(selector: &str) -> String {
    let canonical = CONTAINS_PATTERN.replace_all(selector, |caps: &Captures| {
        let text = match (caps.get(1), caps.get(2)) {
            (Some(single), _) => single.as_str().to_string(),
            (None, Some(double)) => unescape_quotes(double.as_str()),
            (None, None) => String::new(),
        };
        format!(":has-text(\"{}\")", escape_text(&text))
    });
    SINGLE_QUOTED_HAS_TEXT
        .replace_all(&canonical, |caps: &Captures| {
            let text = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            format!(":has-text(\"{}\")", escape_text(text))
        })
        .into_owned()
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn unescape_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Whether `token` occurs in `haystack` as a whole class/identifier (not as a prefix of a longer one)
fn has_class_token(haystack: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    haystack.match_indices(token).any(|(pos, _)| {
        haystack[pos + token.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '-'))
    })
}
