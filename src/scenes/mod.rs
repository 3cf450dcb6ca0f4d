pub mod loader;

use serde::{Deserialize, Serialize};

/// Character tag marking ambient/establishing shots rather than
/// character dialogue. Intro and break display always use these.
pub const ENVIRONMENT_CHARACTER: &str = "environment";

/// One aligned scene interval within an episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub episode_id: String,
    pub scene_id: u32,
    pub start_time: f64,
    pub end_time: f64,
    /// `start_time + (end_time - start_time) / 2`, precomputed at load.
    pub mid_point: f64,
    pub speaker: String,
    pub character: String,
}

impl Scene {
    pub fn new(
        episode_id: impl Into<String>,
        scene_id: u32,
        start_time: f64,
        end_time: f64,
        speaker: impl Into<String>,
        character: impl Into<String>,
    ) -> Self {
        Self {
            episode_id: episode_id.into(),
            scene_id,
            start_time,
            end_time,
            mid_point: start_time + (end_time - start_time) / 2.0,
            speaker: speaker.into(),
            character: character.into(),
        }
    }

    /// Asset name used by the image dataset, e.g. `scene_042`.
    pub fn scene_name(&self) -> String {
        format!("scene_{:03}", self.scene_id)
    }

    pub fn is_environment(&self) -> bool {
        self.character == ENVIRONMENT_CHARACTER
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// Immutable ordered scene collection for a single episode. Replaced
/// wholesale when another episode is selected.
#[derive(Debug, Clone)]
pub struct SceneTable {
    episode_id: String,
    scenes: Vec<Scene>,
}

impl SceneTable {
    pub fn new(episode_id: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            episode_id: episode_id.into(),
            scenes,
        }
    }

    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
