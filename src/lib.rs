//! Keeps a displayed image synchronized with the playback position of an
//! external video stream.
//!
//! Timestamps are mapped to pre-computed scene records, and a
//! non-repeating image variant is selected for the resolved scene. The
//! playback provider, scene-table source, and display surface are
//! collaborator traits ([`player::PlaybackClock`],
//! [`scenes::loader::SceneTableLoader`], [`display::DisplaySink`]); the
//! crate owns the resolution rules, the debounce gate, and the
//! poll-driven [`sync::SyncEngine`] loop around them.

pub mod characters;
pub mod config;
pub mod display;
pub mod episodes;
pub mod error;
pub mod player;
pub mod resolver;
pub mod scenes;
pub mod sync;
pub mod variants;

pub use characters::{CharacterAlias, CharacterResolver};
pub use config::Config;
pub use episodes::{EpisodeCatalog, EpisodeMetadata};
pub use error::SyncError;
pub use scenes::{Scene, SceneTable};
pub use sync::{Command, SyncEngine, SyncState};
