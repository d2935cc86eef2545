//! Page context for planning
//!
//! A compact, bounded summary of the page a goal is about. The structured snapshot from an MCP
//! server is preferred; when it is unavailable for any reason the page is inspected directly in a
//! headless browser. Acquisition never fails: the worst case is a summary carrying an `error`.

pub mod inspect;
pub mod mcp;
pub mod summary;

pub use inspect::{DEFAULT_LOAD_TIMEOUT, HeadlessInspector};
pub use mcp::{DEFAULT_MCP_SSE_URL, McpContextSource, payload_from_parts, pick_snapshot_tool};
pub use summary::{DEFAULT_MAX_NODES, SnapshotNode, SnapshotSummary, summarize, summarize_snapshot};

use crate::browser::LaunchOptions;
use crate::browser::url::first_url_in;
use crate::error::SnapshotError;
use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// MCP request deadline used when none is configured
pub const DEFAULT_MCP_TIMEOUT: Duration = Duration::from_secs(15);

/// Source of a raw structured page snapshot
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, SnapshotError>;
}

/// Direct inspection of a page by URL, returning `{url, nodes}`
#[async_trait]
pub trait PageInspector: Send + Sync {
    async fn inspect(&self, url: &str, max_nodes: usize) -> Result<Value, SnapshotError>;
}

/// Settings for snapshot acquisition
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub mcp_url: String,

    /// Page inspected when the goal names no URL
    pub start_url: Option<String>,

    pub max_nodes: usize,

    pub mcp_timeout: Duration,

    pub load_timeout: Duration,

    /// Launch settings of the inspection browser; it always runs headless
    pub launch: LaunchOptions,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            mcp_url: DEFAULT_MCP_SSE_URL.to_string(),
            start_url: None,
            max_nodes: DEFAULT_MAX_NODES,
            mcp_timeout: DEFAULT_MCP_TIMEOUT,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            launch: LaunchOptions::default(),
        }
    }
}

impl SnapshotConfig {
    pub fn mcp_url(mut self, url: impl Into<String>) -> Self {
        self.mcp_url = url.into();
        self
    }

    pub fn start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn mcp_timeout(mut self, timeout: Duration) -> Self {
        self.mcp_timeout = timeout;
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn launch(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }
}

/// Which path produced a summary; serializes as the planning payload key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotSource {
    McpSnapshotSummary,
    DomFallbackSummary,
}

impl SnapshotSource {
    pub fn key(self) -> &'static str {
        match self {
            SnapshotSource::McpSnapshotSummary => "MCP_SNAPSHOT_SUMMARY",
            SnapshotSource::DomFallbackSummary => "DOM_FALLBACK_SUMMARY",
        }
    }
}

/// An acquired page summary and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub source: SnapshotSource,
    pub summary: SnapshotSummary,
}

/// Acquires page context: structured snapshot first, direct inspection as fallback
pub struct SnapshotAcquirer<R, P> {
    remote: R,
    inspector: P,
    config: SnapshotConfig,
}

impl SnapshotAcquirer<McpContextSource, HeadlessInspector> {
    /// Acquirer backed by an MCP server and a headless browser
    pub fn from_config(config: SnapshotConfig) -> Self {
        let remote = McpContextSource::new(config.mcp_url.clone());
        let inspector = HeadlessInspector::new(config.launch.clone(), config.load_timeout);
        Self::new(remote, inspector, config)
    }
}

impl<R: ContextSource, P: PageInspector> SnapshotAcquirer<R, P> {
    pub fn new(remote: R, inspector: P, config: SnapshotConfig) -> Self {
        Self {
            remote,
            inspector,
            config,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Summarize the page relevant to `goal`
    pub async fn acquire(&self, goal: &str) -> Snapshot {
        match self.remote_summary().await {
            Ok(summary) => {
                info!("Using structured snapshot with {} nodes", summary.nodes().len());
                Snapshot {
                    source: SnapshotSource::McpSnapshotSummary,
                    summary,
                }
            }
            Err(err) => {
                warn!("Structured snapshot unavailable ({}); inspecting the page directly", err);
                let summary = self.fallback_summary(goal).await.unwrap_or_else(|err| {
                    warn!("Page inspection failed: {}", err);
                    SnapshotSummary::from(err)
                });
                Snapshot {
                    source: SnapshotSource::DomFallbackSummary,
                    summary,
                }
            }
        }
    }

    async fn remote_summary(&self) -> Result<SnapshotSummary, SnapshotError> {
        let raw = tokio::time::timeout(self.config.mcp_timeout, self.remote.fetch())
            .await
            .map_err(|_| SnapshotError::TimedOut(self.config.mcp_timeout.as_millis()))??;

        summarize_snapshot(&raw, self.config.max_nodes)
    }

    async fn fallback_summary(&self, goal: &str) -> Result<SnapshotSummary, SnapshotError> {
        let url = first_url_in(goal)
            .or_else(|| self.config.start_url.clone())
            .ok_or(SnapshotError::NoUrl)?;

        let raw = self.inspector.inspect(&url, self.config.max_nodes).await?;
        summarize_snapshot(&raw, self.config.max_nodes)
    }
}

/// Acquire page context with the default MCP and headless-browser sources
pub async fn acquire_snapshot(goal: &str, config: SnapshotConfig) -> Snapshot {
    SnapshotAcquirer::from_config(config).acquire(goal).await
}
