use thiserror::Error;

/// Typed error hierarchy for scene resolution and playback sync.
///
/// Resolution errors are local to a single poll tick: the sync loop logs
/// them and retries on the next interval instead of tearing the timer down.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The filtered scene set came up empty (e.g. a speaker who never
    /// speaks in this episode). Callers may retry without filters.
    #[error("no scenes match: {0}")]
    EmptyTable(String),

    /// More than one scene claims the same timestamp. This is a
    /// data-integrity defect in the scene table and must fail loudly;
    /// never silently pick one of the claimants.
    #[error("overlapping scenes at t={time}: scene {first} and scene {second}")]
    Overlap { time: f64, first: u32, second: u32 },

    /// Episode id absent from the static metadata catalog.
    #[error("unknown episode: {0}")]
    UnknownEpisode(String),

    /// Scene table loading or parsing failed.
    #[error("scene table load failed: {0}")]
    Load(String),

    #[error("{0}")]
    Other(String),
}

/// Serialize as a plain string so host frontends receive the same
/// `"error message"` string convention the display layer expects.
impl serde::Serialize for SyncError {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

// ── From impls ─────────────────────────────────────────────────────────────

impl From<anyhow::Error> for SyncError {
    fn from(e: anyhow::Error) -> Self {
        SyncError::Load(e.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Load(e.to_string())
    }
}

/// Allows `.map_err(|e| format!("…", e))?` and `ok_or_else(|| format!(…))?`
/// to coerce into SyncError without changing the call sites.
impl From<String> for SyncError {
    fn from(s: String) -> Self {
        SyncError::Other(s)
    }
}

/// Allows `.ok_or("literal string")?` to coerce into SyncError.
impl From<&str> for SyncError {
    fn from(s: &str) -> Self {
        SyncError::Other(s.to_string())
    }
}
