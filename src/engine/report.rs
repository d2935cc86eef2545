use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Values captured by extract_text steps, keyed by step id in execution order.
///
/// Values are only ever added or overwritten, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedValues(IndexMap<String, String>);

impl ExtractedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a value; a repeated id overwrites the earlier value in place
    pub fn record(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(id.into(), value.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Final structured report of one run, printed as the last line of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub goal: String,

    pub extracted: ExtractedValues,

    /// Only present when the run failed and captured nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionReport {
    pub fn new(goal: impl Into<String>, extracted: ExtractedValues, failure: Option<String>) -> Self {
        let error = if extracted.is_empty() { failure } else { None };
        Self {
            goal: goal.into(),
            extracted,
            error,
        }
    }

    /// Single-line JSON form
    pub fn to_json_line(&self) -> String {
        // Only string keys and values; serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"goal\":\"\",\"extracted\":{}}"))
    }
}

/// Render a `{id}`-style template against captured values.
///
/// `{{` and `}}` are literal braces. Returns `None` when a placeholder names a value that was not
/// captured, is positional, or the braces are unbalanced.
pub fn render_template(template: &str, values: &ExtractedValues) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        '{' => return None,
                        other => field.push(other),
                    }
                }
                // format spec and conversion are accepted but not applied
                let name = field.split([':', '!']).next().unwrap_or_default().trim();
                if name.is_empty() {
                    return None;
                }
                out.push_str(values.get(name)?);
            }
            '}' => return None,
            other => out.push(other),
        }
    }

    Some(out)
}
