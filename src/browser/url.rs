use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HTTP_URL: Regex = Regex::new(r"https?://\S+").expect("valid regex pattern");
}

/// Normalize an incomplete URL by adding missing protocol and handling common patterns
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    // If already has a protocol, return as-is
    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("file://")
        || trimmed.starts_with("data:")
        || trimmed.starts_with("about:")
        || trimmed.starts_with("chrome://")
    {
        return trimmed.to_string();
    }

    if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        return format!("http://{}", trimmed);
    }

    if trimmed.contains('.') {
        return format!("https://{}", trimmed);
    }

    // Bare words cannot be loaded; hand them through and let navigation report the failure
    trimmed.to_string()
}

/// First http(s) URL mentioned in free text, without trailing sentence punctuation
pub fn first_url_in(text: &str) -> Option<String> {
    HTTP_URL
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
        .filter(|url| !url.is_empty())
}
