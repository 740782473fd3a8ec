use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use crate::error::{Result, SnapshotError};

pub const RANKING_URL: &str = "https://raw.githubusercontent.com/Jiiku831/Jiiku831.github.io/refs/heads/main/data/sekarun_current.json";
pub const EVENTS_URL: &str = "https://raw.githubusercontent.com/Jiiku831/Jiiku831.github.io/refs/heads/main/data/sekarun.js";

pub const DEFAULT_TARGET_RANKS: [u32; 27] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10,
    20, 30, 40, 50,
    100, 200, 300, 400, 500,
    1000, 1500, 2000, 2500, 3000, 4000, 5000,
    10000,
];

// Where `endsAt` comes from. The two are not interchangeable: the event end is the
// scheduled close, the prediction horizon is whatever the forecaster last emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EndsAtSource {
    Event,
    Prediction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotContext {
    pub ranking_url: String,
    pub events_url: String,
    pub events_identifier: String,

    pub event_scan_cap_bytes: usize,
    pub event_chunk_size: usize,

    pub target_ranks: Vec<u32>,
    pub include_graph: bool,
    pub ends_at_source: EndsAtSource,

    pub output_path: PathBuf,
    pub http_timeout_secs: u64,
}

impl Default for SnapshotContext {
    fn default() -> Self {
        Self {
            ranking_url: RANKING_URL.to_string(),
            events_url: EVENTS_URL.to_string(),
            events_identifier: "events".to_string(),

            event_scan_cap_bytes: 1024 * 1024,
            event_chunk_size: 8192,

            target_ranks: DEFAULT_TARGET_RANKS.to_vec(),
            include_graph: true,
            ends_at_source: EndsAtSource::Event,

            output_path: PathBuf::from("public/ranking.json"),
            http_timeout_secs: 30,
        }
    }
}

impl SnapshotContext {
    // Any subset of fields may be present; the rest keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&data).map_err(|source| SnapshotError::Parse {
            what: "config file",
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_ranks.is_empty() {
            return Err(SnapshotError::Config("no target ranks".to_string()));
        }
        if self.target_ranks.contains(&0) {
            return Err(SnapshotError::Config("rank 0 is not a valid tier".to_string()));
        }
        if self.event_scan_cap_bytes == 0 || self.event_chunk_size == 0 {
            return Err(SnapshotError::Config("scan cap and chunk size must be positive".to_string()));
        }
        if self.events_identifier.trim().is_empty() {
            return Err(SnapshotError::Config("events identifier is empty".to_string()));
        }
        Ok(())
    }
}
