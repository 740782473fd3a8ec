mod data_loader;
mod error;
mod events;
mod fetch;
mod output;
mod pipeline;
mod ranking;
mod report;
mod snapshot;
mod snapshot_context;
mod util;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use fetch::*;
use output::*;
use pipeline::*;
use report::*;
use snapshot_context::*;

/*
    One run fetches both feeds, builds the snapshot and overwrites the output file.
    Meant to be scheduled; a failed run writes nothing and the next one starts fresh.
*/

#[derive(Parser, Debug)]
#[command(name = "ranking_snapshot")]
#[command(about = "Build the current/predicted leaderboard snapshot from the ranking and event feeds")]
struct Args {
    /// JSON file with any subset of the snapshot settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "RANKING_URL")]
    ranking_url: Option<String>,

    #[arg(long, env = "EVENTS_URL")]
    events_url: Option<String>,

    /// Where the snapshot JSON is written
    #[arg(long, short, env = "SNAPSHOT_OUTPUT")]
    output: Option<PathBuf>,

    /// Comma separated rank tiers, e.g. 1,10,100
    #[arg(long, value_delimiter = ',')]
    ranks: Option<Vec<u32>>,

    #[arg(long, value_enum)]
    ends_at: Option<EndsAtSource>,

    /// Leave the per-rank point series out of the output
    #[arg(long)]
    no_graph: bool,

    /// Don't print the standings table
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ranking_snapshot=info")),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("snapshot not written: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let quiet = args.quiet;
    let ctx = build_context(args)?;
    ctx.validate()?;

    let fetcher = Fetcher::new(Duration::from_secs(ctx.http_timeout_secs))?;

    let ranking_body = fetcher
        .fetch_text(&ctx.ranking_url)
        .context("ranking feed is required")?;

    let now_secs = Utc::now().timestamp_millis() as f64 / 1000.0;
    let snapshot = build_snapshot(&ranking_body, || fetcher.open_stream(&ctx.events_url), &ctx, now_secs)?;

    write_snapshot(&ctx.output_path, &snapshot)?;
    tracing::info!(path = %ctx.output_path.display(), ranks = snapshot.data.len(), "snapshot written");

    if !quiet {
        output_report(&snapshot);
    }

    Ok(())
}

// Defaults, then the config file, then flags and environment.
fn build_context(args: Args) -> Result<SnapshotContext> {
    let mut ctx = match &args.config {
        Some(path) => SnapshotContext::load(path)?,
        None => SnapshotContext::default(),
    };

    if let Some(url) = args.ranking_url { ctx.ranking_url = url; }
    if let Some(url) = args.events_url { ctx.events_url = url; }
    if let Some(path) = args.output { ctx.output_path = path; }
    if let Some(ranks) = args.ranks { ctx.target_ranks = ranks; }
    if let Some(source) = args.ends_at { ctx.ends_at_source = source; }
    if args.no_graph { ctx.include_graph = false; }

    Ok(ctx)
}
