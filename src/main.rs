//! CLI entry point for the refcheck tool.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use refcheck_core::{
    ArchiveClient, RateLimiter, Report, Verifier, VerifyOptions, extract_references, render_json,
    render_text,
};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // Read input: from the positional file or stdin
    let input_text = if let Some(path) = &args.input {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!("No input provided. Pass a file path or pipe text via stdin.");
        info!("Example: refcheck paper.txt");
        return Ok(ExitCode::SUCCESS);
    };

    let refs = extract_references(&input_text);

    if refs.is_empty() {
        info!("No references found in input");
        return Ok(ExitCode::SUCCESS);
    }

    info!(references = refs.len(), "Extracted references");

    let options = VerifyOptions {
        check_links: args.links_enabled(),
        check_retractions: args.retractions_enabled(),
        link_concurrency: usize::from(args.concurrency),
        retraction_concurrency: usize::from(args.retraction_concurrency),
        request_timeout: Duration::from_secs(args.timeout),
        min_request_interval: Duration::from_millis(args.rate_limit),
        cache_ttl: Duration::from_secs(args.cache_ttl),
        verbose: args.verbose > 0,
        ..VerifyOptions::default()
    };

    let counter = Arc::new(AtomicUsize::new(0));
    let verifier = Verifier::new(options)?.with_progress_counter(Arc::clone(&counter));

    let use_spinner = io::stderr().is_terminal() && !args.quiet;
    let total = verifier.planned_checks(&refs);
    let (progress_handle, progress_stop) = spawn_progress_ui(use_spinner, counter, total);

    let report = verifier.verify(&refs).await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    if args.archive {
        archive_reachable(&args, &report).await?;
    }

    let mut rendered = if args.json {
        render_json(&report)?
    } else {
        render_text(&report, &refs)
    };
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }

    match &args.output_file {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => print!("{rendered}"),
    }

    if report.has_problems() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

/// Submits every reachable URL from the report to the archive service.
async fn archive_reachable(args: &Args, report: &Report) -> Result<()> {
    let urls: Vec<String> = report
        .link_results
        .iter()
        .filter(|result| result.reachable)
        .map(|result| result.identifier.clone())
        .collect();

    if urls.is_empty() {
        info!("No reachable URLs to archive");
        return Ok(());
    }

    // Create rate limiter based on CLI flag
    let rate_limiter = if args.rate_limit == 0 {
        debug!("rate limiting disabled");
        Arc::new(RateLimiter::disabled())
    } else {
        debug!(rate_limit_ms = args.rate_limit, "rate limiting enabled");
        Arc::new(RateLimiter::new(Duration::from_millis(args.rate_limit)))
    };

    let client = ArchiveClient::new(Duration::from_secs(args.timeout), rate_limiter)?;

    info!(urls = urls.len(), "Submitting reachable URLs for archiving");
    let outcomes = client.archive_all(&urls).await;

    let archived = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_ok())
        .count();
    info!(
        archived,
        failed = outcomes.len() - archived,
        "Archiving finished"
    );
    Ok(())
}

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
fn spawn_progress_ui(
    use_spinner: bool,
    counter: Arc<AtomicUsize>,
    total: usize,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(counter, total, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_spinner_inner(
    counter: Arc<AtomicUsize>,
    total: usize,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            let done = counter.load(Ordering::SeqCst);
            spinner.set_message(format!(
                "[{}/{}] Checking references...",
                done.min(total),
                total
            ));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}
