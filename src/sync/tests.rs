// Gate and engine tests. The engine tests run on a paused tokio clock so
// staged one-shot timers fire deterministically.

use super::*;
use crate::player::PlaybackClock;
use crate::scenes::loader::{StaticLoader, NARRATOR_SPEAKER};
use crate::scenes::Scene;
use std::sync::{Arc, Mutex};

// =========================================================================
// Change gate
// =========================================================================

mod gate {
    use super::change_gate;

    const MIN_DURATION: f64 = 10.0;

    #[test]
    fn test_blocks_within_min_duration_even_if_character_changed() {
        // elapsed 8 ≤ 10: nothing fires this tick
        let decision = change_gate(108.0, 100.0, MIN_DURATION, true, true);
        assert!(!decision.apply);
        assert!(!decision.refresh_change_time);
    }

    #[test]
    fn test_applies_after_min_duration_without_any_change() {
        // elapsed 12: exceeding the window alone satisfies the gate
        let decision = change_gate(112.0, 100.0, MIN_DURATION, false, false);
        assert!(decision.apply);
        assert!(decision.refresh_change_time);
    }

    #[test]
    fn test_boundary_elapsed_exactly_min_duration_blocks() {
        let decision = change_gate(110.0, 100.0, MIN_DURATION, true, true);
        assert!(!decision.apply);
    }

    #[test]
    fn test_zero_time_alone_does_not_apply() {
        // force due to t=0 with identical character/scene refreshes the
        // change time but triggers no image change
        let decision = change_gate(0.0, 0.0, MIN_DURATION, false, false);
        assert!(!decision.apply);
        assert!(decision.refresh_change_time);
    }

    #[test]
    fn test_zero_time_with_scene_change_applies() {
        let decision = change_gate(0.0, 0.0, MIN_DURATION, false, true);
        assert!(decision.apply);
        assert!(decision.refresh_change_time);
    }

    #[test]
    fn test_zero_time_with_character_change_applies() {
        let decision = change_gate(0.0, 0.0, MIN_DURATION, true, false);
        assert!(decision.apply);
    }

    #[test]
    fn test_backwards_seek_does_not_force() {
        // elapsed is negative after seeking backwards; no force either way
        let decision = change_gate(50.0, 1495.0, MIN_DURATION, true, true);
        assert!(!decision.apply);
        assert!(!decision.refresh_change_time);
    }
}

// =========================================================================
// Engine fixtures
// =========================================================================

#[derive(Default)]
struct MockClock {
    time: Mutex<Option<f64>>,
    seeks: Mutex<Vec<f64>>,
    cued: Mutex<Vec<String>>,
}

impl MockClock {
    fn set_time(&self, t: f64) {
        *self.time.lock().unwrap() = Some(t);
    }
}

impl PlaybackClock for MockClock {
    fn current_time(&self) -> Option<f64> {
        *self.time.lock().unwrap()
    }

    fn seek_to(&self, seconds: f64) {
        self.seeks.lock().unwrap().push(seconds);
    }

    fn cue_by_id(&self, video_id: &str) {
        self.cued.lock().unwrap().push(video_id.to_string());
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DisplayCall {
    Hide,
    SetSource(String),
    Reveal,
}

#[derive(Default)]
struct MockDisplay {
    calls: Mutex<Vec<DisplayCall>>,
}

impl MockDisplay {
    fn calls(&self) -> Vec<DisplayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn sources(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DisplayCall::SetSource(url) => Some(url),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySink for MockDisplay {
    fn hide(&self) {
        self.calls.lock().unwrap().push(DisplayCall::Hide);
    }

    fn set_source(&self, url: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(DisplayCall::SetSource(url.to_string()));
    }

    fn reveal(&self) {
        self.calls.lock().unwrap().push(DisplayCall::Reveal);
    }
}

fn scene(id: u32, start: f64, end: f64, character: &str) -> Scene {
    Scene::new("c2e001", id, start, end, NARRATOR_SPEAKER, character)
}

/// c2e001: environment intro, dialogue scenes, a timeline gap, and a
/// scene spanning past the break.
fn c2e001_scenes() -> Vec<Scene> {
    vec![
        scene(1, 0.0, 300.0, "environment"),
        scene(2, 300.5, 700.0, "environment"),
        scene(3, 700.5, 900.0, "environment"),
        scene(4, 900.5, 1500.0, "fjord"),
        scene(5, 1500.5, 2000.0, "jester"),
        scene(6, 2500.0, 5599.5, "beau"),
        scene(7, 5600.0, 7000.0, "caleb"),
    ]
}

fn c2e002_scenes() -> Vec<Scene> {
    vec![
        Scene::new("c2e002", 1, 0.0, 600.0, NARRATOR_SPEAKER, "environment"),
        Scene::new("c2e002", 2, 600.5, 9000.0, NARRATOR_SPEAKER, "nott"),
    ]
}

/// c2e003 carries a data-integrity defect: scenes 2 and 3 overlap.
fn c2e003_scenes() -> Vec<Scene> {
    vec![
        Scene::new("c2e003", 1, 0.0, 400.0, NARRATOR_SPEAKER, "environment"),
        Scene::new("c2e003", 2, 500.0, 900.0, NARRATOR_SPEAKER, "fjord"),
        Scene::new("c2e003", 3, 800.0, 1200.0, NARRATOR_SPEAKER, "jester"),
    ]
}

struct Fixture {
    engine: SyncEngine<StaticLoader>,
    clock: Arc<MockClock>,
    display: Arc<MockDisplay>,
}

fn fixture() -> Fixture {
    let clock = Arc::new(MockClock::default());
    let display = Arc::new(MockDisplay::default());
    let loader = StaticLoader::new()
        .with_episode("c2e001", c2e001_scenes())
        .with_video_id("c2e001", "vid-001")
        .with_episode("c2e002", c2e002_scenes())
        .with_video_id("c2e002", "vid-002")
        .with_episode("c2e003", c2e003_scenes())
        .with_video_id("c2e003", "vid-003");

    let engine = SyncEngine::new(
        Config::default(),
        EpisodeCatalog::mighty_nein(),
        CharacterResolver::default(),
        loader,
        clock.clone(),
        display.clone(),
    );
    Fixture {
        engine,
        clock,
        display,
    }
}

/// Let staged one-shot timers run out on the paused clock.
async fn drain_timers() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}

// =========================================================================
// Episode selection + crossfade staging
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_episode_cues_video_and_stages_crossfade() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();

    assert_eq!(f.clock.cued.lock().unwrap().as_slice(), ["vid-001"]);
    // hide happens synchronously, before any staged phase
    assert_eq!(f.display.calls()[0], DisplayCall::Hide);

    drain_timers().await;
    let calls = f.display.calls();
    let set_idx = calls
        .iter()
        .position(|c| matches!(c, DisplayCall::SetSource(_)))
        .expect("set_source staged");
    let reveal_idx = calls
        .iter()
        .position(|c| *c == DisplayCall::Reveal)
        .expect("reveal staged");
    assert!(set_idx < reveal_idx, "swap must precede reveal");

    // clock not ready → t=0 → intro rule → opening environment shot
    let sources = f.display.sources();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].contains("/c2e001/scene_001_image_"));
    assert!(sources[0].ends_with(".png"));
}

#[tokio::test(start_paused = true)]
async fn test_select_unknown_episode_fails_and_stays_idle() {
    let mut f = fixture();
    let err = f.engine.select_episode("c2e099").unwrap_err();
    assert!(matches!(err, SyncError::UnknownEpisode(_)));
    assert_eq!(f.engine.phase(), EnginePhase::Idle);
    assert!(f.display.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_episode_switch_cancels_staged_crossfade() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    // switch before the staged swap fires
    f.engine.select_episode("c2e002").unwrap();

    drain_timers().await;
    let sources = f.display.sources();
    assert!(
        sources.iter().all(|url| !url.contains("/c2e001/")),
        "stale crossfade leaked through: {:?}",
        sources
    );
    assert!(sources.iter().any(|url| url.contains("/c2e002/")));
    assert_eq!(
        f.clock.cued.lock().unwrap().as_slice(),
        ["vid-001", "vid-002"]
    );
    // session state was rebuilt for the new episode
    assert_eq!(f.engine.state().scene_id, None);
    assert_eq!(f.engine.state().character, None);
}

// =========================================================================
// Poll tick + gate integration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_poll_tick_without_episode_is_a_no_op() {
    let mut f = fixture();
    f.engine.poll_tick().unwrap();
    assert!(f.display.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poll_tick_adopts_scene_after_min_duration() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    drain_timers().await;
    f.display.clear();

    f.clock.set_time(1200.0);
    f.engine.poll_tick().unwrap();

    assert_eq!(f.engine.state().character.as_deref(), Some("fjord"));
    assert_eq!(f.engine.state().scene_id, Some(4));
    assert_eq!(f.engine.state().last_scene_change_time, 1200.0);

    drain_timers().await;
    assert!(f
        .display
        .sources()
        .iter()
        .any(|url| url.contains("scene_004_image_")));
}

#[tokio::test(start_paused = true)]
async fn test_gate_suppresses_change_within_debounce_window() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    f.clock.set_time(1495.0);
    f.engine.poll_tick().unwrap();
    assert_eq!(f.engine.state().character.as_deref(), Some("fjord"));
    drain_timers().await;
    f.display.clear();

    // 8 seconds later the resolved scene differs, but the window blocks it
    f.clock.set_time(1503.0);
    f.engine.poll_tick().unwrap();
    assert_eq!(f.engine.state().character.as_deref(), Some("fjord"));
    assert_eq!(f.engine.state().scene_id, Some(4));
    drain_timers().await;
    assert!(f.display.calls().is_empty());

    // past the window the change goes through
    f.clock.set_time(1515.0);
    f.engine.poll_tick().unwrap();
    assert_eq!(f.engine.state().character.as_deref(), Some("jester"));
    assert_eq!(f.engine.state().scene_id, Some(5));
}

#[tokio::test(start_paused = true)]
async fn test_poll_survives_resolution_errors() {
    let mut f = fixture();
    f.engine.select_episode("c2e003").unwrap();

    // inside the overlap: the tick fails loudly...
    f.clock.set_time(850.0);
    let err = f.engine.poll_tick().unwrap_err();
    assert!(matches!(err, SyncError::Overlap { .. }));
    assert_eq!(f.engine.state().scene_id, None);

    // ...and the next tick recovers
    f.clock.set_time(600.0);
    f.engine.poll_tick().unwrap();
    assert_eq!(f.engine.state().scene_id, Some(2));
}

// =========================================================================
// Player state changes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_forced_resync_resets_debounce_reference() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    f.clock.set_time(1495.0);
    f.engine.poll_tick().unwrap();
    assert_eq!(f.engine.state().last_scene_change_time, 1495.0);

    // user seeks backwards; PLAYING fires
    f.clock.set_time(50.0);
    f.engine.on_player_state_change(1);
    assert_eq!(f.engine.state().last_scene_change_time, 50.0);

    // the debounce reference now trails the position, so the next tick
    // past the window applies
    f.clock.set_time(70.0);
    f.engine.poll_tick().unwrap();
    assert_eq!(f.engine.state().scene_id, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_buffering_do_not_resync() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    f.clock.set_time(1495.0);
    f.engine.poll_tick().unwrap();

    f.clock.set_time(50.0);
    f.engine.on_player_state_change(2); // paused
    f.engine.on_player_state_change(3); // buffering
    f.engine.on_player_state_change(42); // unknown code
    assert_eq!(f.engine.state().last_scene_change_time, 1495.0);
}

// =========================================================================
// Filtered image resolution
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_update_image_falls_back_when_filters_match_nothing() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    drain_timers().await;
    f.display.clear();

    // a character that never appears in this episode
    f.engine.state.character = Some("yasha".to_string());
    f.engine.update_image(1200.0).unwrap();

    drain_timers().await;
    assert!(f
        .display
        .sources()
        .iter()
        .any(|url| url.contains("scene_004_image_")));
}

#[tokio::test(start_paused = true)]
async fn test_update_image_uses_stored_character_filter() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    drain_timers().await;
    f.display.clear();

    // the filter narrows resolution to the jester scene's interval
    f.engine.state.character = Some("jester".to_string());
    f.engine.update_image(1700.0).unwrap();

    drain_timers().await;
    assert!(f
        .display
        .sources()
        .iter()
        .any(|url| url.contains("scene_005_image_")));
}

// =========================================================================
// Seek helpers
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_intro_seeks_and_retries_once() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    f.engine.skip_intro();

    assert_eq!(f.clock.seeks.lock().unwrap().as_slice(), [854.0]);
    drain_timers().await;
    assert_eq!(f.clock.seeks.lock().unwrap().as_slice(), [854.0, 854.0]);
}

#[tokio::test(start_paused = true)]
async fn test_skip_break_seeks_to_break_end() {
    let mut f = fixture();
    f.engine.select_episode("c2e001").unwrap();
    f.engine.skip_break();
    assert_eq!(f.clock.seeks.lock().unwrap().as_slice(), [6547.0]);
}

#[tokio::test(start_paused = true)]
async fn test_seek_helpers_ignored_while_idle() {
    let mut f = fixture();
    f.engine.skip_intro();
    f.engine.skip_break();
    assert!(f.clock.seeks.lock().unwrap().is_empty());
}

// =========================================================================
// Full loop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_loop_end_to_end() {
    let f = fixture();
    let clock = f.clock.clone();
    let display = f.display.clone();

    let (tx, rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(f.engine.run(rx, shutdown.clone()));

    tx.send(Command::PlayerReady).await.unwrap();
    tx.send(Command::SelectEpisode("c2e001".to_string()))
        .await
        .unwrap();
    // duplicate ready must not start a second poll timer
    tx.send(Command::PlayerReady).await.unwrap();

    clock.set_time(1200.0);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(clock.cued.lock().unwrap().as_slice(), ["vid-001"]);
    let calls = display.calls();
    assert!(calls.contains(&DisplayCall::Hide));
    assert!(calls.contains(&DisplayCall::Reveal));
    assert!(display
        .sources()
        .iter()
        .any(|url| url.contains("scene_004_image_")));

    shutdown.cancel();
    handle.await.unwrap();
}
