// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Resolve the sitemap into a URL list
// 4. Check every URL, showing a progress bar
// 5. Print or export the report
// 6. Exit with proper code (0 = all healthy, 1 = failures found, 2 = error)
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - Result<T, E>: For error handling (anyhow::Result in the application)
// - Arc<dyn Fn>: Callbacks shared with the resolver and checker tasks
// =============================================================================

mod checker;
mod cli;
mod headers;
mod report;
mod sitemap;

use anyhow::{Context, Result};
use checker::{CheckSettings, ProgressCallback};
use clap::Parser;
use cli::{CheckArgs, Cli, Commands, OutputFormat};
use headers::Identity;
use indicatif::{ProgressBar, ProgressStyle};
use sitemap::{SitemapResolver, SitemapSource, StatusCallback};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so they never mix with a report written to stdout.
// RUST_LOG, when set, wins over the flags.
fn init_logging(cli: &Cli) {
    let quiet = matches!(&cli.command, Commands::Check(args) if args.quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(cli.verbose, quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn default_log_filter(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "sitemap_guardian=debug"
    } else if quiet {
        "sitemap_guardian=warn"
    } else {
        "sitemap_guardian=info"
    }
}

// Returns:
//   Ok(0) = every URL is healthy
//   Ok(1) = at least one failure (4xx, 5xx, transport error, soft 404)
//   Err   = something went wrong before we could produce a report
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Urls { source, json, user_agent } => {
            let identity = user_agent.as_deref().map(Identity::from_input).unwrap_or_default();
            handle_urls(&source, json, &identity).await
        }
        Commands::Check(args) => handle_check(&args).await,
        Commands::UserAgents => {
            handle_user_agents();
            Ok(0)
        }
    }
}

// Handles the 'urls' subcommand
async fn handle_urls(source: &str, json: bool, identity: &Identity) -> Result<i32> {
    let urls = resolve_sitemap(source, identity, false).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&urls)?);
    } else {
        for url in &urls {
            println!("{}", url);
        }
    }
    Ok(0)
}

// Handles the 'check' subcommand
async fn handle_check(args: &CheckArgs) -> Result<i32> {
    let settings = CheckSettings::try_from(args)?;

    let urls = resolve_sitemap(&args.source, &settings.identity, args.quiet).await?;
    if urls.is_empty() {
        anyhow::bail!("No URLs found in sitemap {}", args.source);
    }

    if !args.quiet {
        eprintln!("🌐 Checking {} URL(s)...", urls.len());
    }

    let bar = progress_bar(urls.len(), args.quiet);
    let progress: ProgressCallback = {
        let bar = bar.clone();
        Arc::new(move |done, _total| bar.set_position(done as u64))
    };

    let results = checker::check_all(urls.clone(), &settings, Some(progress))
        .await
        .context("Failed to build HTTP client")?;
    bar.finish_and_clear();

    let mut rows = report::rows_in_input_order(results, &urls);
    let has_failures = rows.iter().any(report::ReportRow::is_failure);

    if args.failures_only {
        rows = report::failures_only(rows);
    }
    report::sort_rows(&mut rows, args.sort, args.descending);

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            report::write_report(&mut writer, &rows, args.format)?;
            writer
                .flush()
                .with_context(|| format!("Failed to write {}", path.display()))?;

            if !args.quiet {
                eprintln!("💾 Report written to {}", path.display());
                if args.format != OutputFormat::Table {
                    let mut stderr = io::stderr().lock();
                    report::write_summary(&mut stderr, &report::Summary::from_rows(&rows))?;
                }
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            report::write_report(&mut stdout, &rows, args.format)?;
        }
    }

    Ok(if has_failures { 1 } else { 0 })
}

// Handles the 'user-agents' subcommand
fn handle_user_agents() {
    for identity in Identity::presets() {
        println!("{:<24} {}", identity.label, identity.user_agent);
    }
}

// Resolves a sitemap with a spinner showing what's being fetched
async fn resolve_sitemap(source: &str, identity: &Identity, quiet: bool) -> Result<Vec<String>> {
    let source = load_source(source).await?;

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };
    let status: StatusCallback = {
        let spinner = spinner.clone();
        Arc::new(move |message: &str| spinner.set_message(message.to_string()))
    };

    let resolver = SitemapResolver::new(identity)
        .context("Failed to build HTTP client")?
        .with_status_callback(status);
    let urls = resolver.resolve(source).await;
    spinner.finish_and_clear();

    if !quiet {
        eprintln!("📄 Found {} unique URL(s)", urls.len());
    }
    Ok(urls)
}

// URLs are fetched by the resolver; anything else is read as a file
async fn load_source(source: &str) -> Result<SitemapSource> {
    let trimmed = source.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(SitemapSource::Url(trimmed.to_string()));
    }

    let bytes = tokio::fs::read(trimmed)
        .await
        .with_context(|| format!("Failed to read sitemap file {}", trimmed))?;
    Ok(SitemapSource::Bytes(bytes))
}

fn progress_bar(total: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta})") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_source_url() {
        match load_source("  https://example.com/sitemap.xml ").await.unwrap() {
            SitemapSource::Url(url) => assert_eq!(url, "https://example.com/sitemap.xml"),
            other => panic!("expected a URL source, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_source_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<urlset><url><loc>https://a.test/</loc></url></urlset>").unwrap();

        let source = load_source(file.path().to_str().unwrap()).await.unwrap();
        match source {
            SitemapSource::Bytes(bytes) => assert!(bytes.starts_with(b"<urlset>")),
            other => panic!("expected bytes, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.xml");

        let err = load_source(missing.to_str().unwrap()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read sitemap file"));
    }

    #[tokio::test]
    async fn test_resolve_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"<urlset><url><loc>https://a.test/</loc></url><url><loc>https://b.test/</loc></url></urlset>",
        )
        .unwrap();

        let urls = resolve_sitemap(file.path().to_str().unwrap(), &Identity::default(), true)
            .await
            .unwrap();
        assert_eq!(urls, vec!["https://a.test/", "https://b.test/"]);
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(default_log_filter(false, false), "sitemap_guardian=info");
        assert_eq!(default_log_filter(false, true), "sitemap_guardian=warn");
        assert_eq!(default_log_filter(true, true), "sitemap_guardian=debug");
    }
}
