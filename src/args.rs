use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_MAX_PAGES, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

#[derive(Parser, Debug)]
#[command(
    name = "medalscan",
    about = "Scan private-tracker sites for purchasable medals using your browser's cookies",
    version,
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Browser whose cookies are used (firefox, chrome, chromium, edge, vivaldi, brave).
    /// Chromium browsers usually keep values encrypted, which is not supported.
    #[arg(short, long, default_value = "firefox", global = true)]
    pub browser: String,

    /// Path to the cookie database, overriding the browser default
    #[arg(long, global = true)]
    pub cookies: Option<PathBuf>,

    /// Custom temporary file path for the cookie database copy
    #[arg(long, global = true)]
    pub temp_path: Option<PathBuf>,

    /// Path to the settings/results store
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan every configured site
    Scan {
        /// Per-request timeout in seconds
        #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Maximum pages visited per site
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        /// User-Agent header sent with every request
        #[arg(long, default_value = DEFAULT_USER_AGENT)]
        user_agent: String,

        /// Literal marker counted on each page
        #[arg(short, long)]
        marker: Option<String>,

        /// Regex marker counted on each page (takes precedence over --marker)
        #[arg(long)]
        marker_regex: Option<String>,
    },

    /// Print the configured site list
    Sites,

    /// Save a site list from a text file with one `name|url` per line
    Save {
        /// Site list file
        file: PathBuf,
    },

    /// Import sites from a JSON file and save them
    Import {
        /// JSON file of the form {"sites": [{"name", "url"}]}
        file: PathBuf,
    },

    /// Export the site list as dated JSON
    Export {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show the stored results of the last scan
    Results,

    /// Open every site that has medals
    Open {
        /// Print the URLs instead of opening them
        #[arg(long)]
        print: bool,
    },

    /// Remove stored scan results
    Clear,
}
