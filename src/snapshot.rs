use serde::{Deserialize, Serialize};
use crate::events::EventDescriptor;
use crate::ranking::*;
use crate::snapshot_context::EndsAtSource;
use crate::util::secs_to_millis;

// The published document. `updatedAt`/`endsAt` are milliseconds; everything nested
// keeps the feed's seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
    #[serde(rename = "endsAt")]
    pub ends_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_info: Option<EventDescriptor>,
    pub data: Vec<RankSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranks: Option<Vec<RankSeries>>,
}

// The event lookup is pinned to the data's own clock when there is one, so the
// event shown matches the standings rather than the moment the job ran.
pub fn reference_timestamp(reduction: &RankReduction, now_secs: f64) -> f64 {
    reduction.latest_real_ts.unwrap_or(now_secs)
}

// A reduction is required; the event is enrichment and may be missing.
pub fn assemble(reduction: RankReduction, event_info: Option<EventDescriptor>, ends_at_source: EndsAtSource) -> Snapshot {
    let ends_at_secs = match ends_at_source {
        EndsAtSource::Event => event_info.as_ref().and_then(|e| e.end),
        EndsAtSource::Prediction => reduction.latest_predicted_ts,
    };

    Snapshot {
        updated_at: reduction.latest_real_ts.map_or(0, secs_to_millis),
        ends_at: ends_at_secs.map_or(0, secs_to_millis),
        event_info,
        data: reduction.summaries,
        ranks: reduction.series,
    }
}
