use crate::error::SnapshotError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node cap applied when none is configured
pub const DEFAULT_MAX_NODES: usize = 120;

/// Nesting beyond this depth is not visited
const MAX_DEPTH: usize = 128;

/// Keys whose array values hold child nodes
const CHILD_KEYS: [&str; 2] = ["children", "nodes"];

/// Keys whose object values hold element attributes
const ATTRIBUTE_KEYS: [&str; 2] = ["attributes", "attrs"];

/// One element of a page summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `data-*`, `id` and `class` only
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, String>,
}

impl SnapshotNode {
    /// Build a record from a tree node; `None` unless it carries a role or a name
    fn from_object(node: &Map<String, Value>) -> Option<Self> {
        let role = node.get("role").and_then(non_empty_text);
        let name = node.get("name").and_then(non_empty_text);
        if role.is_none() && name.is_none() {
            return None;
        }

        let mut attrs = IndexMap::new();
        for key in ATTRIBUTE_KEYS {
            if let Some(Value::Object(bag)) = node.get(key) {
                for (attr, value) in bag {
                    if is_targeting_attribute(attr) {
                        if let Some(text) = attribute_text(value) {
                            attrs.insert(attr.clone(), text);
                        }
                    }
                }
            }
        }
        for attr in ["id", "class"] {
            if let Some(text) = node.get(attr).and_then(attribute_text) {
                attrs.insert(attr.to_string(), text);
            }
        }

        Some(Self { role, name, attrs })
    }
}

/// Compact page description handed to the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotSummary {
    Nodes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        nodes: Vec<SnapshotNode>,
    },
    Error {
        error: String,
    },
}

impl SnapshotSummary {
    pub fn is_error(&self) -> bool {
        matches!(self, SnapshotSummary::Error { .. })
    }

    pub fn nodes(&self) -> &[SnapshotNode] {
        match self {
            SnapshotSummary::Nodes { nodes, .. } => nodes,
            SnapshotSummary::Error { .. } => &[],
        }
    }
}

impl From<SnapshotError> for SnapshotSummary {
    fn from(err: SnapshotError) -> Self {
        SnapshotSummary::Error { error: err.to_string() }
    }
}

/// Flatten a snapshot tree into at most `max_nodes` records, depth-first in document order.
///
/// Object nodes contribute a record when they carry a role or a name; their `children` and
/// `nodes` arrays are visited in that order. Anything that is not an object is a leaf and is
/// ignored. Traversal stops as soon as the cap is reached, even mid-subtree.
pub fn summarize(snapshot: &Value, max_nodes: usize) -> Vec<SnapshotNode> {
    match snapshot {
        Value::Array(items) => collect_all(items, 0, max_nodes),
        other => collect(other, 0, max_nodes),
    }
}

/// Summarize a raw snapshot, rejecting an empty one
pub fn summarize_snapshot(snapshot: &Value, max_nodes: usize) -> Result<SnapshotSummary, SnapshotError> {
    let empty = match snapshot {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        return Err(SnapshotError::Empty);
    }

    let url = snapshot.get("url").and_then(Value::as_str).map(str::to_string);
    Ok(SnapshotSummary::Nodes {
        url,
        nodes: summarize(snapshot, max_nodes),
    })
}

fn collect(node: &Value, depth: usize, remaining: usize) -> Vec<SnapshotNode> {
    let Some(object) = node.as_object() else {
        return Vec::new();
    };
    if remaining == 0 || depth > MAX_DEPTH {
        return Vec::new();
    }

    let mut out: Vec<SnapshotNode> = SnapshotNode::from_object(object).into_iter().collect();
    for key in CHILD_KEYS {
        if let Some(Value::Array(children)) = object.get(key) {
            if out.len() >= remaining {
                break;
            }
            let below = collect_all(children, depth + 1, remaining - out.len());
            out.extend(below);
        }
    }
    out
}

fn collect_all(items: &[Value], depth: usize, remaining: usize) -> Vec<SnapshotNode> {
    let mut out = Vec::new();
    for item in items {
        if out.len() >= remaining {
            break;
        }
        let below = collect(item, depth, remaining - out.len());
        out.extend(below);
    }
    out
}

fn is_targeting_attribute(name: &str) -> bool {
    name.starts_with("data-") || name == "id" || name == "class"
}

fn non_empty_text(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keeps_only_targeting_attributes() {
        let snapshot = json!({
            "role": "button",
            "name": "Add to cart",
            "id": "add-backpack",
            "attributes": {"data-test": "add-to-cart", "style": "color: red", "data-empty": "", "class": "btn"},
            "href": "/cart"
        });

        let nodes = summarize(&snapshot, 10);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].role.as_deref(), Some("button"));
        assert_eq!(nodes[0].name.as_deref(), Some("Add to cart"));
        let keys: Vec<&str> = nodes[0].attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["data-test", "class", "id"]);
    }

    #[test]
    fn test_nodes_without_role_or_name_are_skipped_but_traversed() {
        let snapshot = json!({
            "id": "root",
            "children": [
                {"class": "wrapper", "children": [{"role": "link", "name": "Home"}]},
                "text leaf",
                42,
                null
            ]
        });

        let nodes = summarize(&snapshot, 10);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name.as_deref(), Some("Home"));
    }

    #[test]
    fn test_children_then_nodes_order() {
        let snapshot = json!({
            "role": "main",
            "nodes": [{"name": "second"}],
            "children": [{"name": "first"}]
        });

        let names: Vec<String> = summarize(&snapshot, 10).into_iter().filter_map(|n| n.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_cap_on_wide_tree() {
        let children: Vec<Value> = (0..1000).map(|i| json!({"role": "listitem", "name": format!("item {i}")})).collect();
        let snapshot = json!({"role": "list", "children": children});

        let nodes = summarize(&snapshot, 120);
        assert_eq!(nodes.len(), 120);
        assert_eq!(nodes[119].name.as_deref(), Some("item 118"));
    }

    #[test]
    fn test_attribute_order_follows_source() {
        let snapshot = json!({
            "role": "link",
            "attrs": {"data-z": "last-alphabetically", "class": "nav", "data-a": "first-alphabetically"}
        });

        let nodes = summarize(&snapshot, 10);
        let keys: Vec<&str> = nodes[0].attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["data-z", "class", "data-a"]);
    }

    fn chain(depth: usize) -> Value {
        let mut node = json!({"role": "leaf", "name": "bottom"});
        for i in (0..depth).rev() {
            node = json!({"role": "group", "name": format!("level {i}"), "children": [node]});
        }
        node
    }

    #[test]
    fn test_deep_chain_stops_at_max_depth() {
        let snapshot = chain(1_000);

        let nodes = summarize(&snapshot, 10_000);
        assert_eq!(nodes.len(), MAX_DEPTH + 1);
        assert_eq!(nodes[0].name.as_deref(), Some("level 0"));
        assert_eq!(nodes[MAX_DEPTH].name.as_deref(), Some(format!("level {MAX_DEPTH}").as_str()));

        assert_eq!(summarize(&snapshot, 50).len(), 50);
        assert_eq!(summarize(&snapshot, 1).len(), 1);
        assert!(summarize(&snapshot, 0).is_empty());
    }

    #[test]
    fn test_cap_on_wide_nested_tree() {
        let groups: Vec<Value> = (0..50)
            .map(|g| {
                let items: Vec<Value> = (0..50).map(|i| json!({"role": "cell", "name": format!("{g}.{i}")})).collect();
                json!({"role": "row", "name": format!("row {g}"), "children": items})
            })
            .collect();
        let snapshot = json!({"role": "table", "children": groups});

        let nodes = summarize(&snapshot, DEFAULT_MAX_NODES);
        assert_eq!(nodes.len(), DEFAULT_MAX_NODES);
        assert_eq!(nodes[1].name.as_deref(), Some("row 0"));
        assert_eq!(nodes[52].name.as_deref(), Some("row 1"));
        assert_eq!(nodes[DEFAULT_MAX_NODES - 1].name.as_deref(), Some("2.15"));
    }

    #[test]
    fn test_top_level_array() {
        let snapshot = json!([{"role": "a"}, {"role": "b"}, {"role": "c"}]);
        assert_eq!(summarize(&snapshot, 2).len(), 2);
    }

    #[test]
    fn test_summarize_snapshot_rejects_empty() {
        assert!(matches!(summarize_snapshot(&json!(null), 10), Err(SnapshotError::Empty)));
        assert!(matches!(summarize_snapshot(&json!({}), 10), Err(SnapshotError::Empty)));
        assert!(matches!(summarize_snapshot(&json!([]), 10), Err(SnapshotError::Empty)));
    }

    #[test]
    fn test_summarize_snapshot_keeps_url() {
        let raw = json!({"url": "https://example.test/", "nodes": [{"role": "button", "name": "Go", "attrs": {"id": "go"}}]});
        let summary = summarize_snapshot(&raw, 10).unwrap();

        let text = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            text,
            json!({"url": "https://example.test/", "nodes": [{"role": "button", "name": "Go", "attrs": {"id": "go"}}]})
        );
    }

    #[test]
    fn test_error_summary_shape() {
        let summary = SnapshotSummary::from(SnapshotError::NoUrl);
        assert!(summary.is_error());
        assert!(summary.nodes().is_empty());
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({"error": "no URL found (include a URL in the goal or set START_URL)"})
        );
    }
}
