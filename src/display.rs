/// Sink for the staged image swap.
///
/// Contract: `hide` completes before `set_source`, and `reveal` follows
/// `set_source`. The delays between phases are a presentation detail
/// owned by [`crate::config::Config`].
pub trait DisplaySink: Send + Sync {
    fn hide(&self);
    fn set_source(&self, url: &str);
    fn reveal(&self);
}

/// Build the variant image URL:
/// `{root}/{episode_id}/{scene_name}_image_{variant:02}.png`.
pub fn image_url(root: &str, episode_id: &str, scene_name: &str, variant: usize) -> String {
    format!(
        "{}/{}/{}_image_{:02}.png",
        root.trim_end_matches('/'),
        episode_id,
        scene_name,
        variant
    )
}
