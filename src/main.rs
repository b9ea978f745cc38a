//! Tagwatch main entry point
//!
//! This is the command-line interface for the Tagwatch newest-tag crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tagwatch::config::{load_config_with_hash, Config, WatchEntry, MAX_WATCH_HOURS};
use tagwatch::crawler::crawl_watch;
use tagwatch::{CacheStore, CrawlReport, TagCrawler};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Tagwatch: newest-tag discovery for Stack Exchange style sites
///
/// Crawls each watched site's newest-tags listing back to the start of its
/// watch window and prints the tags created inside it.
#[derive(Parser, Debug)]
#[command(name = "tagwatch")]
#[command(version)]
#[command(about = "Discover newly created tags", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl only this site instead of the configured watch list
    #[arg(long, value_name = "HOST")]
    site: Option<String>,

    /// Override the watch window in hours
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WATCH_HOURS))
    )]
    hours: Option<u32>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let watches = watch_list(&config, cli.site.as_deref(), cli.hours);
    if watches.is_empty() {
        anyhow::bail!("no sites to watch; add a [[watch]] entry or pass --site");
    }

    if cli.dry_run {
        handle_dry_run(&config, &watches);
        return Ok(());
    }

    handle_crawl(&config, &watches).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tagwatch=info,warn"),
            1 => EnvFilter::new("tagwatch=debug,info"),
            2 => EnvFilter::new("tagwatch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves which sites to crawl, applying command-line overrides
fn watch_list(config: &Config, site: Option<&str>, hours: Option<u32>) -> Vec<WatchEntry> {
    let mut watches = match site {
        Some(site) => vec![config
            .watch
            .iter()
            .find(|entry| entry.site.eq_ignore_ascii_case(site))
            .cloned()
            .unwrap_or_else(|| WatchEntry {
                site: site.to_string(),
                hours: 1,
            })],
        None => config.watch.clone(),
    };

    if let Some(hours) = hours {
        for entry in &mut watches {
            entry.hours = hours;
        }
    }

    watches
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, watches: &[WatchEntry]) {
    println!("=== Tagwatch Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nWatched Sites ({}):", watches.len());
    for entry in watches {
        println!(
            "  - https://{}/tags?tab=new ({}H window)",
            entry.site, entry.hours
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Crawls every watched site once and prints what was found
///
/// Sites are crawled one after another. Ctrl-C cancels the crawl in
/// progress; whatever it had merged is still printed.
async fn handle_crawl(config: &Config, watches: &[WatchEntry]) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let crawler = TagCrawler::from_config(config, CacheStore::new())
        .context("failed to build HTTP client")?
        .with_cancellation(cancel.clone());

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current page");
                cancel.cancel();
            }
        }
    });

    let mut failures = 0;
    for entry in watches {
        if cancel.is_cancelled() {
            break;
        }

        tracing::info!("Watching tags on {} ({}H interval)", entry.site, entry.hours);

        match crawl_watch(&crawler, entry).await {
            Ok(report) => print_report(&report, entry),
            Err(e) => {
                failures += 1;
                tracing::error!("Crawl of {} failed: {}", entry.site, e);

                let partial = crawler.store().snapshot(&entry.site).await;
                if !partial.is_empty() {
                    tracing::warn!(
                        "{} tags were cached for {} before the failure",
                        partial.len(),
                        entry.site
                    );
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} crawls failed", failures, watches.len());
    }

    Ok(())
}

fn print_report(report: &CrawlReport, entry: &WatchEntry) {
    let recent = report.tags.created_since(report.from_date);

    println!(
        "\n{}: {} new tags in the last {}H ({} pages, stopped: {})",
        report.site,
        recent.len(),
        entry.hours,
        report.pages_fetched,
        report.stop
    );

    if !report.stop.is_complete() {
        println!("  (incomplete: tags inside the window may be missing)");
    }

    for tag in recent {
        let created = tag
            .created_at
            .map(|stamp| stamp.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default();
        let link = tag
            .url(&report.site)
            .map(|url| url.to_string())
            .unwrap_or_else(|| tag.link.clone());
        println!(
            "  [{}] {} posts, created {} - {}",
            tag.name, tag.post_count, created, link
        );
        if !tag.description.is_empty() {
            println!("      {}", tag.description);
        }
    }
}
