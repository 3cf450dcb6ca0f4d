use crate::characters::CharacterResolver;
use crate::episodes::{self, EpisodeMetadata};
use crate::error::SyncError;
use crate::scenes::{Scene, SceneTable};

/// Scene whose `mid_point` lies closest to `time`, optionally restricted
/// to environment scenes. Ties go to the earliest row in table order.
fn closest_scene<'a>(
    rows: &[&'a Scene],
    time: f64,
    environment_only: bool,
) -> Option<&'a Scene> {
    let mut best: Option<(&'a Scene, f64)> = None;
    for &scene in rows {
        if environment_only && !scene.is_environment() {
            continue;
        }
        let distance = (scene.mid_point - time).abs();
        // strict < keeps the first row on ties
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((scene, distance));
        }
    }
    best.map(|(scene, _)| scene)
}

/// Resolve the scene to display at `time`.
///
/// Resolution rules, applied in order after filtering and clamping:
/// 1. intro: at or before the episode's intro end, the environment scene
///    nearest `time` wins;
/// 2. break: inside the mid-episode break, the opening environment shot
///    (nearest t=0) wins regardless of `time`;
/// 3. containment: the unique scene whose interval contains `time`; two
///    or more claimants is a data-integrity defect ([`SyncError::Overlap`]);
/// 4. fallback: for gaps in the timeline, the scene with the nearest
///    `mid_point`.
///
/// `time` is clamped into the filtered table's covered span first, so a
/// non-empty filtered set always resolves. Midpoint-distance ties go to
/// the first row in table order.
pub fn resolve_scene<'a>(
    meta: &EpisodeMetadata,
    characters: &CharacterResolver,
    table: &'a SceneTable,
    time: f64,
    speaker_filter: Option<&str>,
    character_filter: Option<&str>,
) -> Result<&'a Scene, SyncError> {
    let episode_number = episodes::episode_number(&meta.episode_id)?;

    let mut rows: Vec<&Scene> = table
        .scenes()
        .iter()
        .filter(|s| s.episode_id == meta.episode_id)
        .collect();

    if let Some(speaker) = speaker_filter {
        rows.retain(|s| s.speaker == speaker);
    }
    if let Some(character) = character_filter {
        let canonical = characters.resolve(episode_number, character);
        rows.retain(|s| s.character == canonical);
    }
    if rows.is_empty() {
        return Err(SyncError::EmptyTable(format!(
            "episode {} (speaker: {:?}, character: {:?})",
            meta.episode_id, speaker_filter, character_filter
        )));
    }

    // Clamp into the covered span so a match always exists.
    let min_start = rows.iter().map(|s| s.start_time).fold(f64::INFINITY, f64::min);
    let max_end = rows.iter().map(|s| s.end_time).fold(f64::NEG_INFINITY, f64::max);
    let time = time.min(max_end).max(min_start);

    if time <= meta.intro_end_time {
        return closest_scene(&rows, time, true).ok_or_else(|| {
            SyncError::EmptyTable(format!(
                "episode {} has no environment scenes",
                meta.episode_id
            ))
        });
    }

    let (break_start, break_end) = meta.break_interval;
    if break_start <= time && time <= break_end {
        // Mid-episode breaks always show the opening environment shot.
        return closest_scene(&rows, 0.0, true).ok_or_else(|| {
            SyncError::EmptyTable(format!(
                "episode {} has no environment scenes",
                meta.episode_id
            ))
        });
    }

    let mut containing = rows.iter().copied().filter(|s| s.contains(time));
    if let Some(first) = containing.next() {
        if let Some(second) = containing.next() {
            return Err(SyncError::Overlap {
                time,
                first: first.scene_id,
                second: second.scene_id,
            });
        }
        return Ok(first);
    }

    // Gap in the timeline: the nearest midpoint wins.
    closest_scene(&rows, time, false).ok_or_else(|| {
        SyncError::EmptyTable(format!("episode {} has no scenes", meta.episode_id))
    })
}
