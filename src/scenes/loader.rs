use crate::error::SyncError;
use crate::scenes::{Scene, SceneTable};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Transcript speaker whose rows carry the scene alignment (the
/// narrator). Dataset ingest keeps only these rows.
pub const NARRATOR_SPEAKER: &str = "MATT";

/// Source of parsed scene rows and playback-provider video ids.
///
/// Implementations may fetch, read from disk, or serve from memory; the
/// engine always goes through a [`MemoizedLoader`] so each episode is
/// loaded at most once per session.
pub trait SceneTableLoader: Send + Sync {
    /// Parsed scene rows for one episode, in table order.
    fn load(&self, episode_id: &str) -> Result<Vec<Scene>, SyncError>;

    /// Playback-provider video id for the episode.
    fn video_id(&self, episode_id: &str) -> Result<String, SyncError>;
}

/// Explicit per-episode cache over any loader.
///
/// The same episode id always yields the same `Arc` without re-invoking
/// the inner loader. Unbounded by design: the episode catalog is small
/// and fixed, so there is nothing to evict.
pub struct MemoizedLoader<L> {
    inner: L,
    tables: Mutex<HashMap<String, Arc<SceneTable>>>,
    video_ids: Mutex<HashMap<String, String>>,
}

impl<L: SceneTableLoader> MemoizedLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            tables: Mutex::new(HashMap::new()),
            video_ids: Mutex::new(HashMap::new()),
        }
    }

    pub fn table(&self, episode_id: &str) -> Result<Arc<SceneTable>, SyncError> {
        let mut cache = self
            .tables
            .lock()
            .map_err(|e| SyncError::Other(format!("scene cache poisoned: {}", e)))?;
        if let Some(table) = cache.get(episode_id) {
            return Ok(table.clone());
        }
        let scenes = self.inner.load(episode_id)?;
        log::info!("Loaded {} scenes for {}", scenes.len(), episode_id);
        let table = Arc::new(SceneTable::new(episode_id, scenes));
        cache.insert(episode_id.to_string(), table.clone());
        Ok(table)
    }

    pub fn video_id(&self, episode_id: &str) -> Result<String, SyncError> {
        let mut cache = self
            .video_ids
            .lock()
            .map_err(|e| SyncError::Other(format!("video id cache poisoned: {}", e)))?;
        if let Some(id) = cache.get(episode_id) {
            return Ok(id.clone());
        }
        let id = self.inner.video_id(episode_id)?;
        cache.insert(episode_id.to_string(), id.clone());
        Ok(id)
    }
}

/// In-memory loader over pre-parsed rows. Used in tests and by hosts
/// that ship the scene tables with the application.
#[derive(Default)]
pub struct StaticLoader {
    rows: HashMap<String, Vec<Scene>>,
    video_ids: HashMap<String, String>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_episode(mut self, episode_id: &str, scenes: Vec<Scene>) -> Self {
        self.rows.insert(episode_id.to_string(), scenes);
        self
    }

    pub fn with_video_id(mut self, episode_id: &str, video_id: &str) -> Self {
        self.video_ids
            .insert(episode_id.to_string(), video_id.to_string());
        self
    }
}

impl SceneTableLoader for StaticLoader {
    fn load(&self, episode_id: &str) -> Result<Vec<Scene>, SyncError> {
        self.rows
            .get(episode_id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownEpisode(episode_id.to_string()))
    }

    fn video_id(&self, episode_id: &str) -> Result<String, SyncError> {
        self.video_ids
            .get(episode_id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownEpisode(episode_id.to_string()))
    }
}

/// Raw scene row as serialized by the alignment dataset. `start`/`end`
/// are accepted as aliases for the renamed columns.
#[derive(Debug, Deserialize)]
struct SceneRow {
    #[serde(alias = "episode_name")]
    episode_id: String,
    scene_id: u32,
    #[serde(alias = "start")]
    start_time: f64,
    #[serde(alias = "end")]
    end_time: f64,
    speaker: String,
    character: String,
}

/// Parse scene rows from a JSON array document, keeping only narrator
/// rows as the dataset ingest does. Row order is preserved.
pub fn scenes_from_json(json: &str) -> Result<Vec<Scene>, SyncError> {
    let rows: Vec<SceneRow> = serde_json::from_str(json)?;
    Ok(rows
        .into_iter()
        .filter(|r| r.speaker == NARRATOR_SPEAKER)
        .map(|r| {
            Scene::new(
                r.episode_id,
                r.scene_id,
                r.start_time,
                r.end_time,
                r.speaker,
                r.character,
            )
        })
        .collect())
}
