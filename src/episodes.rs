use crate::error::SyncError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Static per-episode configuration: where the intro ends and where the
/// mid-episode break sits, in seconds from video start. Never mutated
/// after the catalog is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub episode_id: String,
    /// Seconds from video start to the end of the intro segment.
    pub intro_end_time: f64,
    /// Start/end seconds of the mid-episode break.
    pub break_interval: (f64, f64),
}

/// Intro end and break interval per episode, campaign 2 reference data.
/// Episodes with a one-second "break" ran without a real intermission.
const MIGHTY_NEIN: &[(&str, f64, (f64, f64))] = &[
    ("c2e001", 854.0, (5529.0, 6547.0)),
    ("c2e002", 504.0, (7583.0, 8470.0)),
    ("c2e003", 420.0, (7992.0, 8921.0)),
    ("c2e004", 526.0, (7203.0, 7885.0)),
    ("c2e005", 538.0, (10636.0, 11524.0)),
    ("c2e006", 474.0, (8406.0, 9226.0)),
    ("c2e007", 528.0, (8745.0, 9481.0)),
    ("c2e008", 602.0, (5583.0, 6517.0)),
    ("c2e009", 665.0, (7083.0, 7966.0)),
    ("c2e010", 638.0, (6414.0, 7297.0)),
    ("c2e011", 624.0, (6723.0, 7646.0)),
    ("c2e012", 479.0, (5529.0, 6311.0)),
    ("c2e013", 375.0, (7680.0, 8504.0)),
    ("c2e014", 616.0, (5783.0, 6546.0)),
    ("c2e015", 641.0, (7157.0, 8210.0)),
    ("c2e016", 569.0, (7594.0, 8343.0)),
    ("c2e017", 712.0, (7095.0, 7869.0)),
    ("c2e018", 621.0, (6665.0, 7640.0)),
    ("c2e019", 594.0, (7168.0, 8358.0)),
    ("c2e020", 521.0, (8125.0, 8126.0)),
    ("c2e021", 591.0, (8560.0, 8561.0)),
    ("c2e022", 500.0, (8615.0, 8616.0)),
    ("c2e023", 497.0, (6988.0, 6989.0)),
    ("c2e024", 599.0, (7988.0, 7989.0)),
    ("c2e025", 542.0, (5139.0, 5140.0)),
];

/// Immutable lookup of episode metadata, fixed at build time.
#[derive(Debug, Clone)]
pub struct EpisodeCatalog {
    entries: HashMap<String, EpisodeMetadata>,
    order: Vec<String>,
}

impl EpisodeCatalog {
    pub fn new(episodes: Vec<EpisodeMetadata>) -> Self {
        let order = episodes.iter().map(|e| e.episode_id.clone()).collect();
        let entries = episodes
            .into_iter()
            .map(|e| (e.episode_id.clone(), e))
            .collect();
        Self { entries, order }
    }

    /// The 25 known campaign 2 episodes of the reference deployment.
    pub fn mighty_nein() -> Self {
        Self::new(
            MIGHTY_NEIN
                .iter()
                .map(|&(id, intro_end, break_interval)| EpisodeMetadata {
                    episode_id: id.to_string(),
                    intro_end_time: intro_end,
                    break_interval,
                })
                .collect(),
        )
    }

    pub fn get(&self, episode_id: &str) -> Result<&EpisodeMetadata, SyncError> {
        self.entries
            .get(episode_id)
            .ok_or_else(|| SyncError::UnknownEpisode(episode_id.to_string()))
    }

    pub fn contains(&self, episode_id: &str) -> bool {
        self.entries.contains_key(episode_id)
    }

    /// Episode ids in catalog order.
    pub fn episode_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Parse the numeric episode component of an id like `c2e013`.
pub fn episode_number(episode_id: &str) -> Result<u32, SyncError> {
    static EPISODE_ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = EPISODE_ID_RE.get_or_init(|| Regex::new(r"^c\d+e(\d+)$").unwrap());
    re.captures(episode_id)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| SyncError::UnknownEpisode(episode_id.to_string()))
}
