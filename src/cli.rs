// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use clap's "derive" API: the CLI structure is described with Rust
// structs and attributes, and clap generates the parsing, validation and
// --help output for us.
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Enums: Types that can be one of several variants
// - TryFrom: Fallible conversion from CLI arguments into CheckSettings
// =============================================================================

use crate::checker::CheckSettings;
use crate::headers::Identity;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "sitemap-guardian",
    version,
    about = "Checks the health of every URL listed in a website's sitemap",
    long_about = "sitemap-guardian resolves a sitemap (including nested sitemap indexes and \
                  gzip-compressed sitemaps) into a list of URLs, then checks each URL for \
                  broken links, redirects, slow responses and soft 404s."
)]
pub struct Cli {
    /// Show debug logging (every probe and retry)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a sitemap and print the URLs it contains
    ///
    /// Example: sitemap-guardian urls https://example.com/sitemap.xml
    Urls {
        /// Sitemap URL (http/https) or path to a local .xml / .xml.gz file
        source: String,

        /// Print the URLs as a JSON array instead of one per line
        #[arg(long)]
        json: bool,

        /// User-Agent preset name or a full User-Agent string
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Resolve a sitemap and check every URL in it
    ///
    /// Example: sitemap-guardian check https://example.com/sitemap.xml --format csv
    Check(CheckArgs),

    /// List the built-in User-Agent presets
    UserAgents,
}

// Arguments for the `check` subcommand
//
// Kept in its own struct (instead of inline in the enum variant) so it can
// be converted into CheckSettings with TryFrom.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Sitemap URL (http/https) or path to a local .xml / .xml.gz file
    pub source: String,

    /// How many URLs to check at the same time
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub concurrency: u8,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u8).range(1..=120))]
    pub timeout: u8,

    /// Extra attempts after a network failure
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub retries: u8,

    /// Report 3xx responses as-is instead of following them
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Always use GET (normally HEAD is tried first)
    #[arg(long)]
    pub no_head_then_get: bool,

    /// Don't retry 403/404 responses with an alternate browser identity
    #[arg(long)]
    pub no_alt_retry: bool,

    /// User-Agent preset name or a full User-Agent string
    ///
    /// Run `sitemap-guardian user-agents` to see the presets.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Only report 4xx, 5xx, errors and soft 404s
    #[arg(long)]
    pub failures_only: bool,

    /// Sort the report
    #[arg(long, value_enum, default_value_t = SortKey::Original)]
    pub sort: SortKey,

    /// Reverse the sort order
    #[arg(long)]
    pub descending: bool,

    /// No progress bar or status messages, just the report
    #[arg(long, short)]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Order the URLs appeared in the sitemap
    Original,
    /// Final status code
    Status,
    /// Response time
    Time,
    /// Number of redirects
    Redirects,
}

impl TryFrom<&CheckArgs> for CheckSettings {
    type Error = anyhow::Error;

    fn try_from(args: &CheckArgs) -> Result<Self, Self::Error> {
        if args.concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }

        Ok(CheckSettings {
            concurrency: usize::from(args.concurrency),
            timeout: Duration::from_secs(u64::from(args.timeout)),
            follow_redirects: !args.no_follow_redirects,
            head_then_get: !args.no_head_then_get,
            retries: u32::from(args.retries),
            identity: args
                .user_agent
                .as_deref()
                .map(Identity::from_input)
                .unwrap_or_default(),
            alternate_identity_retry: !args.no_alt_retry,
        })
    }
}
