use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
#[clap(rename_all = "kebab_case")]
pub enum Command {
    /// Compare a baseline image against a current one
    Compare {
        baseline: PathBuf,
        current: PathBuf,

        /// Save the diff image after a successful comparison
        #[arg(short, long)]
        download: bool,

        /// Directory for the downloaded diff, overrides PIXELDIFF_DOWNLOAD_DIR
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write the inline diff preview to this file
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Check that the comparison service is up
    Health,
    /// Print the limits announced for uploads
    Limits,
}

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    /// Comparison service base url, overrides PIXELDIFF_SERVICE_URL
    #[arg(long, global = true)]
    pub service_url: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Emit logs as flattened json
    #[arg(long, global = true)]
    pub json: bool,
}
