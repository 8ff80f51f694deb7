//! E2E harness entry point
//!
//! This file is the test binary that runs verification scenarios from YAML
//! specs. Run with: cargo test --package streamlens-e2e --test e2e

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use streamlens_e2e::playwright::{Browser, PlaywrightConfig};
use streamlens_e2e::runner::{RunnerConfig, SuiteResult};
use streamlens_e2e::server::ServerConfig;
use streamlens_e2e::visual::VisualConfig;
use streamlens_e2e::{E2eResult, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "streamlens-e2e")]
#[command(about = "E2E verification harness for StreamLens")]
struct Args {
    /// Path to scenario specs directory
    #[arg(short, long, default_value = "crates/e2e/specs")]
    specs: PathBuf,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Update visual baselines instead of comparing
    #[arg(long)]
    update_baselines: bool,

    /// Path to the dashboard server binary
    #[arg(long, default_value = "target/debug/streamlens-web")]
    server_binary: PathBuf,

    /// Serve UI assets from this directory instead of the embedded copies
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Port to run the server on (0 = auto)
    #[arg(long, default_value = "0")]
    port: u16,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Run in headless mode
    #[arg(long, default_value = "true")]
    headless: bool,

    /// Viewport width
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Visual diff threshold (percentage)
    #[arg(long, default_value = "0.5")]
    visual_threshold: f64,

    /// Per-scenario wall-clock cap in seconds
    #[arg(long, default_value = "120")]
    scenario_timeout: u64,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let browser: Browser = match args.browser.parse() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let config = RunnerConfig {
        server: ServerConfig {
            binary_path: args.server_binary,
            static_dir: args.static_dir,
            port: if args.port == 0 { None } else { Some(args.port) },
            ..Default::default()
        },
        playwright: PlaywrightConfig {
            viewport_width: args.viewport_width,
            viewport_height: args.viewport_height,
            browser,
            headless: args.headless,
            script_timeout: Duration::from_secs(args.scenario_timeout),
            screenshot_dir: args.output.join("screenshots"),
            ..Default::default()
        },
        visual: VisualConfig {
            baseline_dir: args.output.join("baselines"),
            actual_dir: args.output.join("screenshots"),
            diff_dir: args.output.join("diffs"),
            threshold: args.visual_threshold,
            auto_update: args.update_baselines,
        },
        specs_dir: args.specs,
        output_dir: args.output,
    };

    let mut runner = ScenarioRunner::with_config(config);

    runner.start_server().await?;

    let results = if let Some(name) = args.name {
        let result = runner.run_named(&name).await?;
        SuiteResult {
            total: 1,
            passed: if result.success { 1 } else { 0 },
            failed: if result.success { 0 } else { 1 },
            duration_ms: result.duration_ms,
            results: vec![result],
        }
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&tag).await?
    } else {
        runner.run_all().await?
    };

    if args.update_baselines {
        runner.update_baselines()?;
    }

    runner.write_results(&results)?;

    Ok(results.failed == 0)
}
