//! StreamLens CLI - Main Entry Point
//!
//! Command-line interface for analyzing listening-history exports and
//! managing the dashboard server.

use clap::{Parser, Subcommand};

mod client;
mod commands;
mod output;

use commands::{analyze, web};

/// StreamLens - Listening History Dashboard
#[derive(Parser)]
#[command(name = "streamlens")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Dashboard server address
    #[arg(long, default_value = "http://127.0.0.1:8080", global = true)]
    server_addr: String,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze export files into dashboard statistics
    Analyze(analyze::AnalyzeArgs),

    /// Web server management
    #[command(subcommand)]
    Web(web::WebCommands),

    /// Check dashboard server status
    Status,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Analyze(args) => analyze::execute(args, cli.format).await?,
        Commands::Web(cmd) => web::execute(cmd).await?,
        Commands::Status => {
            let client = client::DashboardClient::new(&cli.server_addr)?;
            if client.health_check().await {
                output::print_success(&format!("Dashboard is running at {}", cli.server_addr));
            } else {
                output::print_error(&format!(
                    "Dashboard is not responding at {}",
                    cli.server_addr
                ));
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("StreamLens CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Listening-history dashboard and verification tooling");
        }
    }

    Ok(())
}
