use crate::browser::{BrowserDriver, BrowserSession, LaunchOptions};
use crate::error::SnapshotError;
use crate::snapshot::PageInspector;
use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use std::time::Duration;

const DOM_WALK_JS: &str = include_str!("dom_walk.js");

/// Page-load deadline used when none is configured
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Inspects a page in its own short-lived headless browser
#[derive(Debug, Clone)]
pub struct HeadlessInspector {
    launch: LaunchOptions,
    load_timeout: Duration,
}

impl HeadlessInspector {
    pub fn new(launch: LaunchOptions, load_timeout: Duration) -> Self {
        Self { launch, load_timeout }
    }
}

impl Default for HeadlessInspector {
    fn default() -> Self {
        Self::new(LaunchOptions::default(), DEFAULT_LOAD_TIMEOUT)
    }
}

#[async_trait]
impl PageInspector for HeadlessInspector {
    async fn inspect(&self, url: &str, max_nodes: usize) -> Result<Value, SnapshotError> {
        let launch = self.launch.clone();
        let load_timeout = self.load_timeout;
        let url = url.to_string();

        tokio::task::spawn_blocking(move || inspect_page(launch, &url, max_nodes, load_timeout))
            .await
            .map_err(|e| SnapshotError::Fallback(e.to_string()))?
    }
}

fn inspect_page(launch: LaunchOptions, url: &str, max_nodes: usize, load_timeout: Duration) -> Result<Value, SnapshotError> {
    info!("Inspecting {} in a headless browser", url);

    let session = BrowserSession::launch(launch.headless(true))?;
    session.navigate(url, load_timeout)?;

    let value = session.evaluate_json(&dom_walk_script(max_nodes))?;

    if let Err(e) = session.close() {
        debug!("Inspection browser did not close cleanly: {}", e);
    }
    Ok(value)
}

fn dom_walk_script(max_nodes: usize) -> String {
    format!("{}({})", DOM_WALK_JS.trim(), max_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_walk_script_is_invoked_with_limit() {
        let script = dom_walk_script(120);
        assert!(script.starts_with("(function (limit)"));
        assert!(script.ends_with("})(120)"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_inspect_data_url() {
        let html = r#"<html><body><button id="go" data-test="go-button">Go</button><div class="spacer"></div><div role="alert"></div></body></html>"#;
        let url = format!("data:text/html,{}", urlencoding::encode(html));

        let value = HeadlessInspector::default().inspect(&url, 10).await.unwrap();
        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0]["name"], "Go");
        assert_eq!(nodes[0]["attrs"]["data-test"], "go-button");
        assert!(nodes[0].get("role").is_none());
        assert!(nodes[1].get("role").is_none());
        assert_eq!(nodes[2]["role"], "alert");

        let summary = crate::snapshot::summary::summarize(&value, 10);
        let roles: Vec<Option<&str>> = summary.iter().map(|n| n.role.as_deref()).collect();
        assert_eq!(roles, vec![None, Some("alert")]);
    }
}
