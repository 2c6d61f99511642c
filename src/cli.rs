use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fluxdash")]
#[command(about = "Terminal sparkline dashboard over Flux queries", long_about = None)]
pub struct Cli {
    /// Query backend host URL
    #[arg(long, default_value = "http://localhost:8086")]
    pub host: String,

    /// Dashboard layout file (JSON)
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// API token sent to the backend
    #[arg(long)]
    pub token: Option<String>,

    /// Organization the queries run under
    #[arg(long)]
    pub org: Option<String>,

    /// Seconds between updates of each widget
    #[arg(long, default_value_t = 1)]
    pub interval: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the layout file, then print a summary
    CheckConfig,

    /// Print every widget's rendered query text without executing it
    RenderQueries,
}

pub fn parse() -> Cli {
    Cli::parse()
}
