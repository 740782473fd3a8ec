use serde::*;
use serde_aux::field_attributes::{deserialize_number_from_string, deserialize_option_number_from_string};
use serde_json::Value;
use std::collections::HashMap;
use crate::error::{Result, SnapshotError};

// The ranking feed as served. Each line is kept as raw JSON until its rank is
// requested, so a malformed entry is reported against the rank it belongs to
// and tiers nobody asked for are never decoded.
#[derive(Deserialize, Debug, Default)]
pub struct RankingFeed {
    #[serde(default)]
    pub lines: HashMap<String, Value>,
}

#[derive(Deserialize, Debug)]
struct RankLine {
    entries: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Real,
    Predicted,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RankEntry {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timestamp: f64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ep: f64,
    #[serde(default)]
    pub entry_type: Option<String>,
    #[serde(rename(deserialize = "ep_lb"), default, deserialize_with = "deserialize_option_number_from_string")]
    pub lower_bound: Option<f64>,
    #[serde(rename(deserialize = "ep_ub"), default, deserialize_with = "deserialize_option_number_from_string")]
    pub upper_bound: Option<f64>,
}

impl RankEntry {
    // Only "r" is an observation; anything else, including no tag, is a forecast.
    pub fn kind(&self) -> EntryKind {
        match self.entry_type.as_deref() {
            Some("r") => EntryKind::Real,
            _ => EntryKind::Predicted,
        }
    }
}

impl RankingFeed {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| SnapshotError::Parse {
            what: "ranking feed",
            source,
        })
    }

    // None when the feed has no line for this rank.
    pub fn entries_for(&self, rank: u32) -> Result<Option<Vec<RankEntry>>> {
        let Some(raw) = self.lines.get(&rank.to_string()) else {
            return Ok(None);
        };

        let line = RankLine::deserialize(raw).map_err(|source| SnapshotError::Parse {
            what: "ranking line",
            source,
        })?;

        let mut entries = Vec::with_capacity(line.entries.len());
        for (index, raw_entry) in line.entries.iter().enumerate() {
            let entry = RankEntry::deserialize(raw_entry)
                .map_err(|source| SnapshotError::DataShape { rank, index, source })?;
            entries.push(entry);
        }

        Ok(Some(entries))
    }
}
