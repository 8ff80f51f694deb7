//! CLI commands for the StreamLens web server

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use streamlens_web::server::{serve, WebServerConfig};

#[derive(Subcommand)]
pub enum WebCommands {
    /// Start the dashboard server
    Serve(WebServeArgs),
}

#[derive(Args)]
pub struct WebServeArgs {
    /// Web server bind address
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,

    /// Serve built UI from disk instead of the embedded assets
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

pub async fn execute(cmd: WebCommands) -> anyhow::Result<()> {
    match cmd {
        WebCommands::Serve(args) => {
            let addr: SocketAddr = args.addr.parse()?;

            // Flags win over the environment
            let mut cfg = WebServerConfig::from_env();
            if args.static_dir.is_some() {
                cfg.static_dir = args.static_dir;
            }

            serve(addr, cfg).await
        }
    }
}
