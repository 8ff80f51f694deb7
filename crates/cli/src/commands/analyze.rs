//! Offline analysis of export files

use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use streamlens_common::{ingest, DashboardStats};
use streamlens_common::stats::{MonthlyPoint, RankedEntry, Summary};

use crate::client::DashboardClient;
use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Export files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Limit ranking tables to this many rows
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Base URL of a running dashboard; analysis runs there instead of locally
    #[arg(long)]
    pub server: Option<String>,
}

pub async fn execute(args: AnalyzeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let records = ingest::load_paths(&args.paths)?;
    debug!("Loaded {} record(s)", records.len());

    let stats = match &args.server {
        Some(base) => DashboardClient::new(base)?.analyze(&records).await?,
        None => DashboardStats::from_records(&records),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&stats)?);
        }
        _ => {
            output::print_item(&stats.summary, format);

            output::print_heading("Listening over time", format);
            output::print_list(&stats.monthly, format);

            output::print_heading("Top artists", format);
            let shown = stats.top_artists.len().min(args.top);
            output::print_list(&stats.top_artists[..shown], format);

            output::print_heading("Top songs", format);
            let shown = stats.top_tracks.len().min(args.top);
            output::print_list(&stats.top_tracks[..shown], format);
        }
    }

    Ok(())
}

impl TableDisplay for Summary {
    fn headers() -> Vec<&'static str> {
        vec![
            "Plays",
            "Minutes",
            "Hours",
            "Unique artists",
            "Unique songs",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.total_plays.to_string(),
            self.total_minutes.to_string(),
            self.total_hours.to_string(),
            self.unique_artists.to_string(),
            self.unique_tracks.to_string(),
        ]
    }
}

impl TableDisplay for MonthlyPoint {
    fn headers() -> Vec<&'static str> {
        vec!["Month", "Hours"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.month.clone(), format!("{:.1}", self.hours)]
    }
}

impl TableDisplay for RankedEntry {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Minutes", "First played"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.minutes.to_string(),
            self.first_played
                .map(|ts| ts.format("%b %Y").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        ]
    }
}
