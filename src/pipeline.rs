use std::io::Read;
use crate::data_loader::RankingFeed;
use crate::error::Result;
use crate::events::{resolve, EventDescriptor};
use crate::ranking::reduce_ranks;
use crate::snapshot::*;
use crate::snapshot_context::SnapshotContext;

/*
    Ranking feed -> reduce -> event feed -> resolve -> assemble.
    The ranking feed is mandatory and any problem with it fails the run. The event
    feed is opened only after the reduction succeeded, and nothing that goes wrong
    with it gets past a warning.
*/
pub fn build_snapshot<R, F>(ranking_body: &str, open_events: F, ctx: &SnapshotContext, now_secs: f64) -> Result<Snapshot>
where
    R: Read,
    F: FnOnce() -> Result<R>,
{
    let feed = RankingFeed::parse(ranking_body)?;
    let reduction = reduce_ranks(&feed, &ctx.target_ranks, ctx.include_graph)?;

    if !reduction.missing_ranks.is_empty() {
        tracing::info!(count = reduction.missing_ranks.len(), "requested ranks absent from feed");
        tracing::debug!(ranks = ?reduction.missing_ranks, "absent ranks");
    }

    let reference_ts = reference_timestamp(&reduction, now_secs);
    let event_info = active_event(open_events, ctx, reference_ts);

    Ok(assemble(reduction, event_info, ctx.ends_at_source))
}

fn active_event<R, F>(open_events: F, ctx: &SnapshotContext, reference_ts: f64) -> Option<EventDescriptor>
where
    R: Read,
    F: FnOnce() -> Result<R>,
{
    let stream = match open_events() {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("event feed unavailable, continuing without event_info: {:#}", anyhow::Error::new(e));
            return None;
        }
    };

    let resolution = match resolve(stream, &ctx.events_identifier, reference_ts, ctx.event_scan_cap_bytes, ctx.event_chunk_size) {
        Ok(resolution) => resolution,
        Err(e) => {
            tracing::warn!("could not read event table, continuing without event_info: {:#}", anyhow::Error::new(e));
            return None;
        }
    };

    if resolution.skipped > 0 {
        tracing::warn!(skipped = resolution.skipped, considered = resolution.considered, "event records skipped");
    }

    match &resolution.active {
        Some(ev) => tracing::info!(
            id = ev.id.as_deref().unwrap_or(""),
            name = ev.name.as_deref().unwrap_or(""),
            start = ev.start,
            "active event"
        ),
        None => tracing::warn!(reference_ts, "no event has started yet"),
    }

    resolution.active
}
