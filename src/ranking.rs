use serde::{Deserialize, Serialize};
use crate::data_loader::*;
use crate::error::Result;
use crate::util::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankSummary {
    pub rank: u32,
    #[serde(serialize_with = "serialize_compact")]
    pub current: f64,
    #[serde(serialize_with = "serialize_compact")]
    pub predicted: f64,
}

// One chart point, copied verbatim from the feed after sorting. `ts` stays in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    #[serde(serialize_with = "serialize_compact")]
    pub ts: f64,
    #[serde(serialize_with = "serialize_compact")]
    pub ep: f64,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(rename = "l", serialize_with = "serialize_compact_opt")]
    pub lower_bound: Option<f64>,
    #[serde(rename = "u", serialize_with = "serialize_compact_opt")]
    pub upper_bound: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankSeries {
    pub rank: u32,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Default)]
pub struct RankReduction {
    pub summaries: Vec<RankSummary>,
    pub series: Option<Vec<RankSeries>>,
    // Both in seconds; the assembler owns the conversion to milliseconds.
    pub latest_real_ts: Option<f64>,
    pub latest_predicted_ts: Option<f64>,
    // Requested tiers the feed had no line for.
    pub missing_ranks: Vec<u32>,
}

// Walks the requested tiers, reducing each one's history to its latest real and
// latest predicted score. Output is sorted by rank no matter how the tiers were listed.
pub fn reduce_ranks(feed: &RankingFeed, target_ranks: &[u32], include_graph: bool) -> Result<RankReduction> {
    let mut reduction = RankReduction {
        series: if include_graph { Some(Vec::new()) } else { None },
        ..RankReduction::default()
    };
    let mut seen: Vec<u32> = Vec::with_capacity(target_ranks.len());

    for &rank in target_ranks {
        if seen.contains(&rank) { continue; }
        seen.push(rank);

        let mut entries = match feed.entries_for(rank)? {
            Some(entries) if !entries.is_empty() => entries,
            Some(_) => continue,
            None => {
                reduction.missing_ranks.push(rank);
                continue;
            }
        };

        sort_chronologically(&mut entries);

        let (summary, latest_real, latest_predicted) = summarize_sorted(rank, &entries);
        reduction.summaries.push(summary);

        if let Some(ts) = latest_real {
            reduction.latest_real_ts = max_option(reduction.latest_real_ts, ts);
        }
        if let Some(ts) = latest_predicted {
            reduction.latest_predicted_ts = max_option(reduction.latest_predicted_ts, ts);
        }

        if let Some(series) = reduction.series.as_mut() {
            series.push(RankSeries {
                rank,
                points: entries.iter().map(to_point).collect(),
            });
        }
    }

    reduction.summaries.sort_by_key(|s| s.rank);
    if let Some(series) = reduction.series.as_mut() {
        series.sort_by_key(|s| s.rank);
    }

    Ok(reduction)
}

// Stable: entries sharing a timestamp keep their feed order, so the later one wins below.
pub fn sort_chronologically(entries: &mut [RankEntry]) {
    entries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}

// Expects chronological order. Returns the summary plus the largest real and
// predicted timestamps seen for this rank.
pub fn summarize_sorted(rank: u32, entries: &[RankEntry]) -> (RankSummary, Option<f64>, Option<f64>) {
    let mut last_real: Option<&RankEntry> = None;
    let mut last_predicted: Option<&RankEntry> = None;
    let mut max_real: Option<f64> = None;
    let mut max_predicted: Option<f64> = None;

    for entry in entries {
        match entry.kind() {
            EntryKind::Real => {
                last_real = Some(entry);
                max_real = max_option(max_real, entry.timestamp);
            }
            EntryKind::Predicted => {
                last_predicted = Some(entry);
                max_predicted = max_option(max_predicted, entry.timestamp);
            }
        }
    }

    let summary = RankSummary {
        rank,
        current: last_real.map_or(0.0, |e| e.ep),
        predicted: last_predicted.map_or(0.0, |e| e.ep),
    };

    (summary, max_real, max_predicted)
}

fn to_point(entry: &RankEntry) -> SeriesPoint {
    SeriesPoint {
        ts: entry.timestamp,
        ep: entry.ep,
        entry_type: entry.entry_type.clone().unwrap_or_else(|| "r".to_string()),
        lower_bound: entry.lower_bound,
        upper_bound: entry.upper_bound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapshotError;
    use rand::seq::SliceRandom;

    fn entry(ts: f64, ep: f64, kind: &str) -> RankEntry {
        RankEntry {
            timestamp: ts,
            ep,
            entry_type: Some(kind.to_string()),
            lower_bound: None,
            upper_bound: None,
        }
    }

    fn feed(json: &str) -> RankingFeed {
        RankingFeed::parse(json).unwrap()
    }

    #[test]
    fn real_only_rank_has_zero_prediction() {
        let mut entries = vec![entry(300.0, 30.0, "r"), entry(100.0, 10.0, "r"), entry(200.0, 20.0, "r")];
        sort_chronologically(&mut entries);

        let (summary, max_real, max_pred) = summarize_sorted(7, &entries);
        assert_eq!(summary, RankSummary { rank: 7, current: 30.0, predicted: 0.0 });
        assert_eq!(max_real, Some(300.0));
        assert_eq!(max_pred, None);
    }

    #[test]
    fn later_entry_wins_on_equal_timestamp() {
        let mut entries = vec![
            entry(100.0, 1.0, "r"),
            entry(100.0, 2.0, "r"),
            entry(50.0, 9.0, "p"),
            entry(50.0, 8.0, "p"),
        ];
        sort_chronologically(&mut entries);

        let (summary, _, _) = summarize_sorted(1, &entries);
        assert_eq!(summary.current, 2.0);
        assert_eq!(summary.predicted, 8.0);
    }

    #[test]
    fn latest_wins_even_when_lower() {
        let mut entries = vec![entry(200.0, 5.0, "r"), entry(100.0, 500.0, "r")];
        sort_chronologically(&mut entries);
        let (summary, _, _) = summarize_sorted(3, &entries);
        assert_eq!(summary.current, 5.0);
    }

    #[test]
    fn empty_and_absent_ranks_are_not_emitted() {
        let feed = feed(r#"{"lines": {
            "1": {"entries": []},
            "2": {"entries": [{"timestamp": 10, "ep": 100, "entry_type": "r"}]}
        }}"#);

        let reduction = reduce_ranks(&feed, &[1, 2, 3], false).unwrap();
        assert_eq!(reduction.summaries.len(), 1);
        assert_eq!(reduction.summaries[0].rank, 2);
        assert_eq!(reduction.missing_ranks, vec![3]);
        assert!(reduction.series.is_none());
    }

    #[test]
    fn output_sorted_regardless_of_target_order() {
        let feed = feed(r#"{"lines": {
            "1": {"entries": [{"timestamp": 10, "ep": 900, "entry_type": "r"}]},
            "10": {"entries": [{"timestamp": 11, "ep": 500, "entry_type": "r"}]},
            "100": {"entries": [{"timestamp": 12, "ep": 100, "entry_type": "r"}]},
            "1000": {"entries": [{"timestamp": 13, "ep": 10, "entry_type": "r"}]}
        }}"#);

        let mut targets = vec![1, 10, 100, 1000, 5, 50];
        let mut rng = rand::rng();
        for _ in 0..10 {
            targets.shuffle(&mut rng);
            let reduction = reduce_ranks(&feed, &targets, true).unwrap();

            let ranks: Vec<u32> = reduction.summaries.iter().map(|s| s.rank).collect();
            assert_eq!(ranks, vec![1, 10, 100, 1000]);

            let series_ranks: Vec<u32> = reduction.series.unwrap().iter().map(|s| s.rank).collect();
            assert_eq!(series_ranks, vec![1, 10, 100, 1000]);
            assert_eq!(reduction.latest_real_ts, Some(13.0));
        }
    }

    #[test]
    fn global_maxima_track_each_kind_separately() {
        let feed = feed(r#"{"lines": {
            "1": {"entries": [
                {"timestamp": 500, "ep": 1, "entry_type": "p"},
                {"timestamp": 100, "ep": 1, "entry_type": "r"}
            ]},
            "2": {"entries": [
                {"timestamp": 300, "ep": 1, "entry_type": "r"},
                {"timestamp": 400, "ep": 1, "entry_type": "p"}
            ]}
        }}"#);

        let reduction = reduce_ranks(&feed, &[2, 1], false).unwrap();
        assert_eq!(reduction.latest_real_ts, Some(300.0));
        assert_eq!(reduction.latest_predicted_ts, Some(500.0));
    }

    #[test]
    fn graph_points_are_sorted_and_default_to_real() {
        let feed = feed(r#"{"lines": {"4": {"entries": [
            {"timestamp": 20, "ep": 2, "entry_type": "p", "ep_lb": 1, "ep_ub": 3},
            {"timestamp": 10, "ep": 1}
        ]}}}"#);

        let reduction = reduce_ranks(&feed, &[4], true).unwrap();
        let series = reduction.series.unwrap();
        let points = &series[0].points;

        assert_eq!(points[0].ts, 10.0);
        assert_eq!(points[0].entry_type, "r");
        assert_eq!(points[0].lower_bound, None);
        assert_eq!(points[1].entry_type, "p");
        assert_eq!(points[1].upper_bound, Some(3.0));

        // The untagged entry is still a forecast for the summary.
        assert_eq!(reduction.summaries[0].predicted, 2.0);
        assert_eq!(reduction.summaries[0].current, 0.0);
    }

    #[test]
    fn duplicate_targets_reduce_once() {
        let feed = feed(r#"{"lines": {"1": {"entries": [{"timestamp": 1, "ep": 1, "entry_type": "r"}]}}}"#);
        let reduction = reduce_ranks(&feed, &[1, 1], false).unwrap();
        assert_eq!(reduction.summaries.len(), 1);
    }

    #[test]
    fn malformed_entry_fails_the_reduction() {
        let feed = feed(r#"{"lines": {"1": {"entries": [{"ep": 1, "entry_type": "r"}]}}}"#);
        assert!(matches!(
            reduce_ranks(&feed, &[1], false),
            Err(SnapshotError::DataShape { rank: 1, index: 0, .. })
        ));
    }
}
