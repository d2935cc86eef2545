//! Structured page snapshots from a Model Context Protocol server over SSE

use crate::error::SnapshotError;
use crate::snapshot::ContextSource;
use async_trait::async_trait;
use log::{debug, info};
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParam, CallToolResult},
    service::{RoleClient, RunningService},
    transport::SseClientTransport,
};
use serde_json::{Map, Value};

/// SSE endpoint used when none is configured
pub const DEFAULT_MCP_SSE_URL: &str = "http://127.0.0.1:4375/sse";

/// Tool names tried first, in order
const PREFERRED_TOOLS: [&str; 4] = ["snapshot", "pageSnapshot", "accessibilitySnapshot", "getPageSnapshot"];

/// Fetches a page snapshot by calling a snapshot tool on an MCP server
#[derive(Debug, Clone)]
pub struct McpContextSource {
    url: String,
}

impl McpContextSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for McpContextSource {
    fn default() -> Self {
        Self::new(DEFAULT_MCP_SSE_URL)
    }
}

#[async_trait]
impl ContextSource for McpContextSource {
    async fn fetch(&self) -> Result<Value, SnapshotError> {
        debug!("Connecting to MCP server at {}", self.url);

        let transport = SseClientTransport::start(self.url.as_str())
            .await
            .map_err(|e| SnapshotError::Connect(e.to_string()))?;

        let client = ()
            .serve(transport)
            .await
            .map_err(|e| SnapshotError::Handshake(e.to_string()))?;

        let result = call_snapshot_tool(&client).await;

        if let Err(e) = client.cancel().await {
            debug!("MCP client shutdown: {}", e);
        }

        result
    }
}

async fn call_snapshot_tool(client: &RunningService<RoleClient, ()>) -> Result<Value, SnapshotError> {
    let tools = client
        .list_all_tools()
        .await
        .map_err(|e| SnapshotError::Request(e.to_string()))?;

    let names: Vec<String> = tools.iter().map(|tool| tool.name.to_string()).collect();
    debug!("MCP server offers tools: {:?}", names);

    let chosen = pick_snapshot_tool(&names).ok_or(SnapshotError::NoSnapshotTool)?.to_string();
    info!("Requesting page snapshot via MCP tool '{}'", chosen);

    let result = client
        .call_tool(CallToolRequestParam {
            name: chosen.into(),
            arguments: Some(Map::new()),
        })
        .await
        .map_err(|e| SnapshotError::Request(e.to_string()))?;

    payload_from_result(&result).ok_or(SnapshotError::NoUsablePayload)
}

/// Choose the snapshot tool: a preferred name if offered, else the first name mentioning "snapshot"
pub fn pick_snapshot_tool<S: AsRef<str>>(names: &[S]) -> Option<&str> {
    let names: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();

    PREFERRED_TOOLS
        .iter()
        .find_map(|preferred| names.iter().find(|name| *name == preferred).copied())
        .or_else(|| {
            names
                .iter()
                .find(|name| name.to_lowercase().contains("snapshot"))
                .copied()
        })
}

/// Extract the snapshot JSON from a tool result
pub fn payload_from_result(result: &CallToolResult) -> Option<Value> {
    let texts = result
        .content
        .iter()
        .filter_map(|content| content.as_text())
        .map(|text| text.text.as_str());

    payload_from_parts(result.structured_content.as_ref(), texts)
}

/// Pick the snapshot out of a tool response.
///
/// Structured content wins when it is an object or array; otherwise the first text part that
/// parses as a JSON object or array is used. A bare array is wrapped as `{"nodes": [...]}`.
pub fn payload_from_parts<'a>(structured: Option<&Value>, texts: impl IntoIterator<Item = &'a str>) -> Option<Value> {
    if let Some(value) = structured.filter(|v| v.is_object() || v.is_array()) {
        return Some(wrap_array(value.clone()));
    }

    texts
        .into_iter()
        .filter_map(|text| serde_json::from_str::<Value>(text.trim()).ok())
        .find(|value| value.is_object() || value.is_array())
        .map(wrap_array)
}

fn wrap_array(value: Value) -> Value {
    match value {
        Value::Array(nodes) => serde_json::json!({ "nodes": nodes }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;
    use serde_json::json;

    #[test]
    fn test_pick_preferred_tool_in_order() {
        let names = ["getPageSnapshot", "click", "snapshot"];
        assert_eq!(pick_snapshot_tool(&names), Some("snapshot"));

        let names = ["getPageSnapshot", "accessibilitySnapshot"];
        assert_eq!(pick_snapshot_tool(&names), Some("accessibilitySnapshot"));
    }

    #[test]
    fn test_pick_falls_back_to_name_match() {
        let names = ["browser_navigate", "browser_snapshot", "browser_click"];
        assert_eq!(pick_snapshot_tool(&names), Some("browser_snapshot"));

        let names = ["DOM_Snapshot_v2"];
        assert_eq!(pick_snapshot_tool(&names), Some("DOM_Snapshot_v2"));
    }

    #[test]
    fn test_pick_none_without_snapshot_tool() {
        let names = ["navigate", "click"];
        assert_eq!(pick_snapshot_tool(&names), None);
        assert_eq!(pick_snapshot_tool::<&str>(&[]), None);
    }

    #[test]
    fn test_structured_content_preferred() {
        let structured = json!({"role": "document"});
        let payload = payload_from_parts(Some(&structured), [r#"{"role": "other"}"#]);
        assert_eq!(payload, Some(json!({"role": "document"})));
    }

    #[test]
    fn test_text_parts_parsed_in_order() {
        let payload = payload_from_parts(None, ["- button \"Login\"", "42", r#"[{"role": "link"}]"#]);
        assert_eq!(payload, Some(json!({"nodes": [{"role": "link"}]})));
    }

    #[test]
    fn test_no_usable_payload() {
        assert_eq!(payload_from_parts(Some(&json!("text")), ["not json", "\"quoted\""]), None);
    }

    #[test]
    fn test_payload_from_tool_result() {
        let result = CallToolResult::success(vec![Content::text(r#"{"url": "https://example.test", "nodes": []}"#)]);
        assert_eq!(
            payload_from_result(&result),
            Some(json!({"url": "https://example.test", "nodes": []}))
        );
    }
}
