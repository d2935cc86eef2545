//! page-snapshot
//!
//! Prints the page context a planner would receive for a goal: the bounded node summary, or with
//! `--payload` the complete planning payload including the plan JSON Schema.

use clap::Parser;
use env_logger::{Env, Target};
use plan_runner::browser::LaunchOptions;
use plan_runner::snapshot::{DEFAULT_MAX_NODES, DEFAULT_MCP_SSE_URL};
use plan_runner::{PlanningContext, SnapshotConfig, acquire_snapshot};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "page-snapshot")]
#[command(version)]
#[command(about = "Summarize page context for plan generation", long_about = None)]
struct Cli {
    /// Plain-language goal; the first http(s) URL in it is inspected on fallback
    #[arg(value_name = "GOAL")]
    goal: String,

    /// SSE endpoint of the MCP server providing page snapshots
    #[arg(long, env = "MCP_SSE_URL", default_value = DEFAULT_MCP_SSE_URL)]
    mcp_url: String,

    /// Page inspected when the goal contains no URL
    #[arg(long, env = "START_URL")]
    start_url: Option<String>,

    /// Maximum number of summary nodes
    #[arg(long, default_value_t = DEFAULT_MAX_NODES)]
    max_nodes: usize,

    /// Deadline in milliseconds for the MCP snapshot request
    #[arg(long, default_value_t = 15_000)]
    mcp_timeout_ms: u64,

    /// Page-load deadline in milliseconds for the fallback inspection
    #[arg(long, default_value_t = 20_000)]
    load_timeout_ms: u64,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Disable the Chrome sandbox of the fallback browser
    #[arg(long, env = "BROWSER_NO_SANDBOX")]
    no_sandbox: bool,

    /// Print the full planning payload instead of the summary
    #[arg(long)]
    payload: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().filter_or("LOG_LEVEL", "info"))
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();

    let mut launch = LaunchOptions::new().sandbox(!cli.no_sandbox);
    if let Some(path) = cli.chrome_path {
        launch = launch.chrome_path(path);
    }

    let mut config = SnapshotConfig::default()
        .mcp_url(cli.mcp_url)
        .max_nodes(cli.max_nodes)
        .mcp_timeout(Duration::from_millis(cli.mcp_timeout_ms))
        .load_timeout(Duration::from_millis(cli.load_timeout_ms))
        .launch(launch);
    if let Some(url) = cli.start_url {
        config = config.start_url(url);
    }

    let snapshot = acquire_snapshot(&cli.goal, config).await;
    eprintln!("Snapshot source: {}", snapshot.source.key());

    let output = if cli.payload {
        PlanningContext::new(cli.goal, snapshot).to_payload()
    } else {
        serde_json::to_value(&snapshot.summary)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
