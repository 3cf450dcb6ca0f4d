#[cfg(test)]
mod tests;

use crate::characters::CharacterResolver;
use crate::config::Config;
use crate::display::{image_url, DisplaySink};
use crate::episodes::{EpisodeCatalog, EpisodeMetadata};
use crate::error::SyncError;
use crate::player::{PlaybackClock, PlayerState};
use crate::resolver::resolve_scene;
use crate::scenes::loader::{MemoizedLoader, SceneTableLoader};
use crate::scenes::SceneTable;
use crate::variants::VariantPicker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// External triggers consumed by [`SyncEngine::run`].
#[derive(Debug, Clone)]
pub enum Command {
    /// The playback provider finished initializing; starts the speaker
    /// poll. A second ready event is ignored — only one poll timer may
    /// exist per session.
    PlayerReady,
    /// Load the given episode and reset session state.
    SelectEpisode(String),
    /// Raw provider state-change code.
    PlayerStateChange(i32),
    /// Seek past the intro (the seek is re-issued once shortly after).
    SkipIntro,
    /// Seek to the end of the mid-episode break.
    SkipBreak,
}

/// Engine lifecycle phase: `Idle` until an episode is loaded and the
/// provider has signalled ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Ready,
}

/// Mutable session state, owned exclusively by the engine loop and reset
/// in full whenever the episode changes. `scene_id` is always either
/// unset or an id from the current episode's table.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub speaker: Option<String>,
    pub character: Option<String>,
    pub scene_id: Option<u32>,
    pub last_scene_change_time: f64,
    pub last_variant: Option<usize>,
}

impl SyncState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of the debounce gate for one poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    /// Apply the resolved scene and trigger an image change.
    pub apply: bool,
    /// Move `last_scene_change_time` forward to the current reading.
    pub refresh_change_time: bool,
}

/// Decide whether a freshly resolved scene may replace the displayed one.
///
/// A change is only considered (`force`) once the minimum scene duration
/// has elapsed, or when playback sits at exactly zero (episode restart).
/// It is applied when the duration was exceeded or the character/scene
/// actually changed. Playback-at-zero with an identical character and
/// scene deliberately does not fire on its own; keep the combined
/// condition exactly as is and do not extend it by analogy.
pub fn change_gate(
    current_time: f64,
    last_change_time: f64,
    scene_min_duration: f64,
    character_changed: bool,
    scene_changed: bool,
) -> GateDecision {
    let mut force = false;
    let mut exceeds_min_duration = false;
    if current_time - last_change_time > scene_min_duration {
        force = true;
        exceeds_min_duration = true;
    } else if current_time == 0.0 {
        force = true;
    }
    GateDecision {
        apply: force && (exceeds_min_duration || character_changed || scene_changed),
        refresh_change_time: force,
    }
}

struct ActiveEpisode {
    meta: EpisodeMetadata,
    table: Arc<SceneTable>,
}

/// Keeps the displayed image synchronized with the playback position.
///
/// Single logical thread of control: all state mutation happens inside
/// [`SyncEngine::run`] in response to serialized poll ticks and commands,
/// so no locking is needed around [`SyncState`]. Crossfade staging and
/// seek retries run as cancellable one-shot tasks that are invalidated
/// wholesale on episode switch.
pub struct SyncEngine<L> {
    config: Config,
    catalog: EpisodeCatalog,
    characters: CharacterResolver,
    loader: MemoizedLoader<L>,
    clock: Arc<dyn PlaybackClock>,
    display: Arc<dyn DisplaySink>,
    picker: VariantPicker,
    state: SyncState,
    episode: Option<ActiveEpisode>,
    /// Parent token for all one-shot timers of the current episode.
    episode_timers: CancellationToken,
    /// Speaker-poll guard; only one poll timer per session.
    polling: bool,
}

impl<L: SceneTableLoader> SyncEngine<L> {
    pub fn new(
        config: Config,
        catalog: EpisodeCatalog,
        characters: CharacterResolver,
        loader: L,
        clock: Arc<dyn PlaybackClock>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        let picker = VariantPicker::new(config.variant_count, config.max_variant_attempts);
        Self {
            config,
            catalog,
            characters,
            loader: MemoizedLoader::new(loader),
            clock,
            display,
            picker,
            state: SyncState::default(),
            episode: None,
            episode_timers: CancellationToken::new(),
            polling: false,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn phase(&self) -> EnginePhase {
        if self.polling && self.episode.is_some() {
            EnginePhase::Ready
        } else {
            EnginePhase::Idle
        }
    }

    /// Drive the engine until shutdown or the command channel closes.
    ///
    /// A failed tick logs and retries on the next interval; resolution
    /// errors never tear the poll timer down.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>, shutdown: CancellationToken) {
        log::info!("Sync loop started");
        let mut poll = tokio::time::interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Sync loop shutting down");
                    break;
                }
                _ = poll.tick() => {
                    if !self.polling {
                        continue;
                    }
                    if let Err(e) = self.poll_tick() {
                        log::warn!("Poll tick failed, retrying next interval: {}", e);
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => {
                            log::info!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Abandon staged one-shots before the loop exits.
        self.episode_timers.cancel();
        log::info!("Sync loop stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlayerReady => self.start_polling(),
            Command::SelectEpisode(episode_id) => {
                if let Err(e) = self.select_episode(&episode_id) {
                    log::error!("Episode select failed for {}: {}", episode_id, e);
                }
            }
            Command::PlayerStateChange(code) => self.on_player_state_change(code),
            Command::SkipIntro => self.skip_intro(),
            Command::SkipBreak => self.skip_break(),
        }
    }

    fn start_polling(&mut self) {
        if self.polling {
            log::warn!("Speaker poll already active, ignoring duplicate ready event");
            return;
        }
        self.polling = true;
        log::info!(
            "Speaker poll started (interval: {:?})",
            self.config.poll_interval()
        );
    }

    /// Load an episode, cue its video, and reset session state. Pending
    /// one-shot timers from the previous episode are invalidated first so
    /// a stale crossfade can never flip the image back.
    pub(crate) fn select_episode(&mut self, episode_id: &str) -> Result<(), SyncError> {
        let meta = self.catalog.get(episode_id)?.clone();

        self.episode_timers.cancel();
        self.episode_timers = CancellationToken::new();

        let table = self.loader.table(episode_id)?;
        let video_id = self.loader.video_id(episode_id)?;
        log::info!("Episode {} selected (video id: {})", episode_id, video_id);

        self.clock.cue_by_id(&video_id);
        self.state.reset();
        self.episode = Some(ActiveEpisode { meta, table });

        // First image goes up immediately; the debounce only applies to
        // subsequent poll ticks.
        self.update_image(self.clock.current_time().unwrap_or(0.0))
    }

    /// One speaker-poll cycle: read the clock, resolve unfiltered, run
    /// the change gate, and on apply adopt the scene and stage an image
    /// change.
    pub(crate) fn poll_tick(&mut self) -> Result<(), SyncError> {
        let (meta, table) = match &self.episode {
            Some(active) => (active.meta.clone(), active.table.clone()),
            None => return Ok(()),
        };
        let current_time = self.clock.current_time().unwrap_or(0.0);
        let scene = resolve_scene(&meta, &self.characters, &table, current_time, None, None)?;

        let character_changed = self.state.character.as_deref() != Some(scene.character.as_str());
        let scene_changed = self.state.scene_id != Some(scene.scene_id);
        let decision = change_gate(
            current_time,
            self.state.last_scene_change_time,
            self.config.scene_min_duration,
            character_changed,
            scene_changed,
        );

        if decision.refresh_change_time {
            self.state.last_scene_change_time = current_time;
        }
        if decision.apply {
            log::info!(
                "Scene change at t={:.1}: character {:?} -> {}, scene {:?} -> {}",
                current_time,
                self.state.character,
                scene.character,
                self.state.scene_id,
                scene.scene_id,
            );
            self.state.speaker = Some(scene.speaker.clone());
            self.state.character = Some(scene.character.clone());
            self.state.scene_id = Some(scene.scene_id);
            self.update_image(current_time)?;
        }
        Ok(())
    }

    /// Resolve with the stored speaker/character as filters (which may
    /// legitimately differ from the unfiltered gate resolution), pick a
    /// non-repeating variant, and stage the hide → swap → reveal update.
    pub(crate) fn update_image(&mut self, current_time: f64) -> Result<(), SyncError> {
        let (meta, table) = match &self.episode {
            Some(active) => (active.meta.clone(), active.table.clone()),
            None => return Ok(()),
        };
        let speaker = self.state.speaker.clone();
        let character = self.state.character.clone();

        let scene = match resolve_scene(
            &meta,
            &self.characters,
            &table,
            current_time,
            speaker.as_deref(),
            character.as_deref(),
        ) {
            Ok(scene) => scene,
            Err(SyncError::EmptyTable(detail)) => {
                // The stored filters can name a character that never
                // appears in this episode; retry unfiltered.
                log::warn!("Filtered resolution empty ({}), retrying unfiltered", detail);
                resolve_scene(&meta, &self.characters, &table, current_time, None, None)?
            }
            Err(e) => return Err(e),
        };

        let variant = self.picker.pick(self.state.last_variant);
        self.state.last_variant = Some(variant);
        let url = image_url(
            &self.config.image_url_root,
            &meta.episode_id,
            &scene.scene_name(),
            variant,
        );
        log::info!("Updating image, current time: {:.1}", current_time);

        self.display.hide();
        stage_crossfade(
            self.display.clone(),
            url,
            self.config.crossfade_swap_delay(),
            self.config.crossfade_reveal_delay(),
            self.episode_timers.child_token(),
        );
        Ok(())
    }

    /// Provider state-change handler: resync-forcing transitions run an
    /// immediate poll cycle and reset the debounce reference so the next
    /// update is not suppressed after a seek or episode switch.
    pub(crate) fn on_player_state_change(&mut self, code: i32) {
        // Read the clock before the forced poll; the debounce reset uses
        // the position at event time.
        let current_time = self.clock.current_time().unwrap_or(0.0);
        let Some(state) = PlayerState::from_code(code) else {
            log::warn!("Unknown player state code: {}", code);
            return;
        };
        log::info!("Player state change: {:?}", state);
        if state.forces_resync() {
            if let Err(e) = self.poll_tick() {
                log::warn!("Forced resync failed: {}", e);
            }
            self.state.last_scene_change_time = current_time;
        }
    }

    pub(crate) fn skip_intro(&mut self) {
        let Some(active) = &self.episode else {
            log::warn!("Skip intro ignored: no episode loaded");
            return;
        };
        let target = active.meta.intro_end_time;
        log::info!("Seeking to {} (intro end)", target);
        self.clock.seek_to(target);

        // The provider sometimes swallows the first seek depending on
        // prior playback state; re-issue it once.
        let clock = self.clock.clone();
        schedule_once(
            self.config.seek_retry_delay(),
            self.episode_timers.child_token(),
            move || clock.seek_to(target),
        );
    }

    pub(crate) fn skip_break(&mut self) {
        let Some(active) = &self.episode else {
            log::warn!("Skip break ignored: no episode loaded");
            return;
        };
        let target = active.meta.break_interval.1;
        log::info!("Seeking to {} (break end)", target);
        self.clock.seek_to(target);
    }
}

/// Run the swap and reveal phases of an image change after their
/// configured delays. Cancelling `token` (episode switch, shutdown)
/// abandons any phase not yet executed.
fn stage_crossfade(
    display: Arc<dyn DisplaySink>,
    url: String,
    swap_delay: Duration,
    reveal_delay: Duration,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = async {
                tokio::time::sleep(swap_delay).await;
                display.set_source(&url);
                tokio::time::sleep(reveal_delay).await;
                display.reveal();
            } => {}
        }
    });
}

/// Run `f` after `delay` unless `cancel` fires first.
fn schedule_once<F>(delay: Duration, cancel: CancellationToken, f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => f(),
        }
    });
}
