//! plan-runner
//!
//! Executes one plan file in one browser session. Progress lines and the final JSON report go to
//! standard output; diagnostics go to standard error. Exit status 2 means the plan could not be
//! loaded and nothing was run.

use clap::Parser;
use clap::builder::BoolishValueParser;
use env_logger::{Env, Target};
use plan_runner::engine::ExecutionReport;
use plan_runner::plan::DEFAULT_PLAN_PATH;
use plan_runner::{BrowserSession, LaunchOptions, PlanExecutor, PlanLoadError, load_plan};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "plan-runner")]
#[command(version)]
#[command(about = "Execute a browser action plan", long_about = None)]
struct Cli {
    /// Plan file to execute
    #[arg(value_name = "PLAN", default_value = DEFAULT_PLAN_PATH)]
    plan: PathBuf,

    /// Deadline in milliseconds for every wait of the run
    #[arg(long, env = "PLAN_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,

    /// Run the browser without a window; `false` behaves like --headed
    #[arg(long, env = "HEADLESS_MODE", default_value_t = true, value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    headless: bool,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Disable the Chrome sandbox (needed when running as root in containers)
    #[arg(long, env = "BROWSER_NO_SANDBOX")]
    no_sandbox: bool,

    /// Browser window size as WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_window_size)]
    window_size: Option<(u32, u32)>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Pause in milliseconds after every browser action
    #[arg(long, env = "BROWSER_SLOW_MO", default_value_t = 0)]
    slow_mo: u64,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,
}

impl Cli {
    fn launch_options(&self) -> LaunchOptions {
        let mut options = LaunchOptions::new()
            .headless(self.headless && !self.headed)
            .sandbox(!self.no_sandbox)
            .slow_mo(Duration::from_millis(self.slow_mo));
        if let Some((width, height)) = self.window_size {
            options = options.window_size(width, height);
        }
        if let Some(path) = &self.chrome_path {
            options = options.chrome_path(path);
        }
        if let Some(dir) = &self.user_data_dir {
            options = options.user_data_dir(dir);
        }
        options
    }
}

fn parse_window_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let parse = |part: &str| part.trim().parse::<u32>().map_err(|e| format!("invalid size '{}': {}", part, e));
    Ok((parse(width)?, parse(height)?))
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().filter_or("LOG_LEVEL", "info"))
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();

    let plan = match load_plan(&cli.plan) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(PlanLoadError::EXIT_CODE as u8);
        }
    };

    let options = cli.launch_options();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let session = match BrowserSession::launch(options) {
        Ok(session) => session,
        Err(err) => {
            log::error!("{}", err);
            let report = ExecutionReport::new(plan.goal.clone(), Default::default(), Some(err.to_string()));
            let printed = writeln!(out, "Error: {}", err)
                .and_then(|_| writeln!(out, "{}", report.to_json_line()))
                .and_then(|_| out.flush());
            return if printed.is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE };
        }
    };

    let executor = PlanExecutor::new(&session).with_timeout(Duration::from_millis(cli.timeout_ms));
    match executor.execute(&plan, &mut out) {
        Ok(outcome) => {
            if let Some(message) = outcome.failure() {
                log::info!("Run stopped early: {}", message);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Failed to write output: {}", err);
            ExitCode::FAILURE
        }
    }
}
