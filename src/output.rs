//! Reading the runner's standard output from the calling side
//!
//! Two independent stages: a strict stage that decodes the trailing JSON report, and a lenient
//! stage that collects `key: value` lines when no usable report is found.

use crate::engine::{ExecutionReport, ExtractedValues};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Prefix of the line the runner prints when a step fails
pub const ERROR_PREFIX: &str = "Error:";

/// Keys starting with these (case-insensitive) are progress output, not values
const EXCLUDED_PREFIXES: [&str; 4] = ["step", "goal", "error", "call log"];

/// Keys equal to these (case-insensitive) are progress output, not values
const EXCLUDED_KEYS: [&str; 2] = ["closing browser", "extracted values"];

lazy_static! {
    static ref VALUE_KEY: Regex = Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex pattern");
}

/// Message of the first `Error:` line, without the prefix
pub fn extract_error_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(ERROR_PREFIX))
        .map(|line| line[ERROR_PREFIX.len()..].trim().to_string())
}

/// Strict stage: the captured values of the last JSON object carrying an `extracted` object.
///
/// Lines are tried last to first; when no single line decodes, the span from the first `{` to
/// the last `}` is tried as a whole. Returns `None` when nothing decodes or the captured
/// mapping is empty.
pub fn parse_report_tail(stdout: &str) -> Option<ExtractedValues> {
    let from_lines = stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{') && line.ends_with('}'))
        .find_map(extracted_from_json);

    from_lines
        .or_else(|| {
            let start = stdout.find('{')?;
            let end = stdout.rfind('}')?;
            (start < end).then(|| &stdout[start..=end]).and_then(extracted_from_json)
        })
        .filter(|values| !values.is_empty())
}

fn extracted_from_json(text: &str) -> Option<ExtractedValues> {
    let value: Value = serde_json::from_str(text).ok()?;
    let extracted = value.get("extracted")?.as_object()?;

    Some(
        extracted
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect(),
    )
}

/// Lenient stage: `key: value` lines whose key looks like a capture id
pub fn fallback_key_values(stdout: &str) -> ExtractedValues {
    let mut values = ExtractedValues::new();

    for line in stdout.lines().map(str::trim) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let lowered = key.to_lowercase();

        if EXCLUDED_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
            continue;
        }
        if EXCLUDED_KEYS.contains(&lowered.as_str()) {
            continue;
        }
        if !VALUE_KEY.is_match(key) {
            continue;
        }

        values.record(key, value.trim());
    }

    values
}

/// Assemble the caller-facing result from a successful run's standard output.
///
/// The `error` field is only set when a step failed and nothing was captured.
pub fn parse_runner_output(goal: &str, stdout: &str) -> ExecutionReport {
    let error = extract_error_line(stdout);
    let extracted = parse_report_tail(stdout).unwrap_or_else(|| fallback_key_values(stdout));

    ExecutionReport::new(goal, extracted, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAILED_RUN: &str = "Goal: find price\n\
        Step 1: navigate {\"url\":\"https://example.test\"}\n\
        Step 2: click {\"selector\":\"#missing\"}\n\
        Error: Timeout: waiting for '#missing' to be visible exceeded 1000ms\n\
        Closing browser...\n\
        {\"goal\":\"find price\",\"extracted\":{},\"error\":\"Timeout: waiting for '#missing' to be visible exceeded 1000ms\"}\n";

    #[test]
    fn test_extract_error_line() {
        assert_eq!(
            extract_error_line(FAILED_RUN).as_deref(),
            Some("Timeout: waiting for '#missing' to be visible exceeded 1000ms")
        );
        assert_eq!(extract_error_line("Goal: g\nClosing browser...\n"), None);
    }

    #[test]
    fn test_report_tail_prefers_last_report() {
        let stdout = "Step 1: extract_text {\"selector\":\".a\"}\n\
            {\"goal\":\"g\",\"extracted\":{\"old\":\"1\"}}\n\
            {\"goal\":\"g\",\"extracted\":{\"price\":\"$29.99\",\"qty\":3}}\n";

        let values = parse_report_tail(stdout).unwrap();
        assert_eq!(values.get("price"), Some("$29.99"));
        assert_eq!(values.get("qty"), Some("3"));
        assert_eq!(values.get("old"), None);
    }

    #[test]
    fn test_report_tail_multiline_object() {
        let stdout = "Closing browser...\n{\n  \"goal\": \"g\",\n  \"extracted\": {\"n\": \"Widget\"}\n}\n";
        assert_eq!(parse_report_tail(stdout).unwrap().get("n"), Some("Widget"));
    }

    #[test]
    fn test_report_tail_rejects_objects_without_extracted() {
        assert!(parse_report_tail("Step 1: navigate {\"url\":\"https://example.test\"}\n").is_none());
        assert!(parse_report_tail("{\"goal\":\"g\",\"extracted\":{}}").is_none());
        assert!(parse_report_tail("no json here").is_none());
    }

    #[test]
    fn test_fallback_excludes_progress_lines() {
        let stdout = "Goal: g\n\
            Step 1: extract_text {}\n\
            Error: boom\n\
            Call log: waiting\n\
            Closing browser: now\n\
            --- Extracted Values ---\n\
            name: Sauce Labs Backpack\n\
            price: $29.99\n\
            at frame.rs:10: in main\n";

        let values = fallback_key_values(stdout);
        let pairs: Vec<(&str, &str)> = values.iter().collect();
        assert_eq!(pairs, vec![("name", "Sauce Labs Backpack"), ("price", "$29.99")]);
    }

    #[test]
    fn test_parse_runner_output_failed_run() {
        let report = parse_runner_output("find price", FAILED_RUN);
        assert!(report.extracted.is_empty());
        assert!(report.error.unwrap().starts_with("Timeout"));
    }

    #[test]
    fn test_parse_runner_output_error_hidden_by_captures() {
        let stdout = "Error: Timeout: x\nname: Widget\n{\"goal\":\"g\",\"extracted\":{\"name\":\"Widget\"}}\n";
        let report = parse_runner_output("g", stdout);
        assert_eq!(report.extracted.get("name"), Some("Widget"));
        assert_eq!(report.error, None);
    }

    #[test]
    fn test_parse_runner_output_uses_line_fallback() {
        let report = parse_runner_output("g", "Goal: g\nname: Widget\nClosing browser...\n");
        assert_eq!(report.goal, "g");
        assert_eq!(report.extracted.get("name"), Some("Widget"));
    }
}
