use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default root URL for the pre-rendered scene image dataset.
pub const DEFAULT_IMAGE_URL_ROOT: &str =
    "https://huggingface.co/datasets/cosmicBboy/critical-dream-scene-images-mighty-nein-v2/resolve/main";

/// Engine tuning knobs.
///
/// Defaults match the reference deployment; any value can be overridden
/// from an `.env`-style file via [`Config::apply_env_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Speaker poll cadence in milliseconds.
    pub poll_interval_ms: u64,
    /// Minimum playback seconds between image changes (debounce window).
    pub scene_min_duration: f64,
    /// Number of pre-rendered image variants per scene.
    pub variant_count: usize,
    /// Redraw attempts before accepting a repeated variant.
    pub max_variant_attempts: usize,
    /// Root URL the image template is built against.
    pub image_url_root: String,
    /// Delay before the new image source is swapped in.
    pub crossfade_swap_delay_ms: u64,
    /// Delay (after the swap) before the new image is revealed.
    pub crossfade_reveal_delay_ms: u64,
    /// Delay before the seek is re-issued when skipping the intro.
    pub seek_retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            scene_min_duration: 10.0,
            variant_count: 12,
            max_variant_attempts: 100,
            image_url_root: DEFAULT_IMAGE_URL_ROOT.to_string(),
            crossfade_swap_delay_ms: 50,
            crossfade_reveal_delay_ms: 50,
            seek_retry_delay_ms: 100,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn crossfade_swap_delay(&self) -> Duration {
        Duration::from_millis(self.crossfade_swap_delay_ms)
    }

    pub fn crossfade_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.crossfade_reveal_delay_ms)
    }

    pub fn seek_retry_delay(&self) -> Duration {
        Duration::from_millis(self.seek_retry_delay_ms)
    }

    /// Apply `KEY=value` overrides from an `.env`-style file. Unknown
    /// keys, comments, and malformed values are ignored with a warning so
    /// a bad override can never prevent startup.
    pub fn apply_env_file(&mut self, path: &Path) {
        if let Some(v) = load_env_value(path, "SCENESYNC_POLL_INTERVAL_MS") {
            self.set_u64(&v, |c, n| c.poll_interval_ms = n, "SCENESYNC_POLL_INTERVAL_MS");
        }
        if let Some(v) = load_env_value(path, "SCENESYNC_SCENE_MIN_DURATION") {
            match v.parse::<f64>() {
                Ok(n) => self.scene_min_duration = n,
                Err(_) => log::warn!("Ignoring non-numeric SCENESYNC_SCENE_MIN_DURATION: {}", v),
            }
        }
        if let Some(v) = load_env_value(path, "SCENESYNC_VARIANT_COUNT") {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => self.variant_count = n,
                _ => log::warn!("Ignoring invalid SCENESYNC_VARIANT_COUNT: {}", v),
            }
        }
        if let Some(v) = load_env_value(path, "SCENESYNC_IMAGE_URL_ROOT") {
            self.image_url_root = v;
        }
        if let Some(v) = load_env_value(path, "SCENESYNC_SEEK_RETRY_DELAY_MS") {
            self.set_u64(&v, |c, n| c.seek_retry_delay_ms = n, "SCENESYNC_SEEK_RETRY_DELAY_MS");
        }
    }

    fn set_u64(&mut self, value: &str, apply: impl FnOnce(&mut Self, u64), key: &str) {
        match value.parse::<u64>() {
            Ok(n) => apply(self, n),
            Err(_) => log::warn!("Ignoring non-numeric {}: {}", key, value),
        }
    }
}

/// Load a value from an env-style file by key name.
pub fn load_env_value(path: &Path, key: &str) -> Option<String> {
    let prefix = format!("{}=", key);
    if let Ok(content) = std::fs::read_to_string(path) {
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with(&prefix) {
                let value = trimmed[prefix.len()..]
                    .trim()
                    .trim_matches('"')
                    .trim_matches('\'');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}
