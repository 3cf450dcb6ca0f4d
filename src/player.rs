use serde::{Deserialize, Serialize};

/// Playback provider state, decoded from the provider's numeric
/// state-change codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    /// Whether this transition should force an immediate resync poll:
    /// a new episode was cued (`Unstarted`/`Cued`) or the user jumped to
    /// a different part of the video (`Playing`). The debounce gate must
    /// not suppress the first update after these.
    pub fn forces_resync(&self) -> bool {
        matches!(self, Self::Unstarted | Self::Playing | Self::Cued)
    }
}

/// Opaque clock + seek surface of the playback provider.
pub trait PlaybackClock: Send + Sync {
    /// Current playback position in seconds, or `None` while the
    /// provider is not ready. The engine treats `None` as 0.0 rather
    /// than an error.
    fn current_time(&self) -> Option<f64>;

    fn seek_to(&self, seconds: f64);

    /// Load (without autoplay) the video with the given provider id.
    fn cue_by_id(&self, video_id: &str);
}
