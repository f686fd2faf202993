//! Background video embeds: swap marked iframes for a chromeless player
//! container and hand it to the video player capability.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::Document;
use crate::error::Result;
use crate::ids::NodeId;

pub const VIDEO_ID_ATTR: &str = "data-vimeo-id";
pub const INITIALIZED_CLASS: &str = "plyr-initialized";
pub const EMBED_CLASS: &str = "plyr__video-embed";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoError {
    #[error("video player rejected the container: {0}")]
    Rejected(String),
}

pub trait VideoPlayer {
    fn is_available(&self) -> bool {
        true
    }

    fn mount(
        &mut self,
        doc: &Document,
        container: NodeId,
        options: &PlayerOptions,
    ) -> std::result::Result<(), VideoError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VimeoOptions {
    pub byline: bool,
    pub portrait: bool,
    pub title: bool,
    pub speed: bool,
    pub transparent: bool,
    pub background: bool,
}

/// Autoplaying, muted, looping, with every control hidden.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerOptions {
    pub autoplay: bool,
    pub muted: bool,
    pub loop_active: bool,
    pub controls: Vec<String>,
    pub hide_controls: bool,
    pub click_to_play: bool,
    pub keyboard_focused: bool,
    pub keyboard_global: bool,
    pub tooltips: bool,
    pub display_duration: bool,
    pub vimeo: VimeoOptions,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            muted: true,
            loop_active: true,
            controls: Vec::new(),
            hide_controls: true,
            click_to_play: false,
            keyboard_focused: false,
            keyboard_global: false,
            tooltips: false,
            display_duration: false,
            vimeo: VimeoOptions {
                byline: false,
                portrait: false,
                title: false,
                speed: false,
                transparent: false,
                background: true,
            },
        }
    }
}

pub fn embed_src(video_id: &str) -> String {
    format!("https://player.vimeo.com/video/{video_id}?autoplay=1&loop=1&muted=1&background=1")
}

#[derive(Debug, Default)]
pub struct VideoEmbedder {
    options: PlayerOptions,
    /// Containers built while the player was not loaded yet.
    pending: Vec<NodeId>,
}

impl VideoEmbedder {
    pub fn new(options: PlayerOptions) -> Self {
        Self {
            options,
            pending: Vec::new(),
        }
    }

    pub fn pending(&self) -> &[NodeId] {
        &self.pending
    }

    /// Replace every unprocessed video iframe. Returns the new containers.
    pub fn upgrade(&mut self, doc: &mut Document, player: &mut dyn VideoPlayer) -> Result<Vec<NodeId>> {
        let mut created = Vec::new();
        for iframe in doc.elements_with_attr(doc.root(), "iframe", VIDEO_ID_ATTR) {
            if doc.has_class(iframe, INITIALIZED_CLASS) {
                continue;
            }
            let Some(video_id) = doc.attr(iframe, VIDEO_ID_ATTR).map(str::to_string) else {
                continue;
            };
            let container = doc.create_element("div");
            doc.set_attr(container, "class", &format!("{EMBED_CLASS} {INITIALIZED_CLASS}"))?;
            let frame = doc.create_element("iframe");
            doc.set_attr(frame, "src", &embed_src(&video_id))?;
            doc.set_attr(frame, "allow", "autoplay; fullscreen")?;
            doc.set_attr(frame, "playsinline", "")?;
            doc.append_child(container, frame)?;
            doc.replace_child(iframe, container)?;
            self.pending.push(container);
            created.push(container);
        }
        self.retry_pending(doc, player);
        Ok(created)
    }

    /// Mount pending containers if the player has loaded. Returns how many
    /// were mounted.
    pub fn retry_pending(&mut self, doc: &Document, player: &mut dyn VideoPlayer) -> usize {
        if !player.is_available() || self.pending.is_empty() {
            return 0;
        }
        let mut mounted = 0;
        for container in std::mem::take(&mut self.pending) {
            match player.mount(doc, container, &self.options) {
                Ok(()) => mounted += 1,
                Err(err) => log::warn!("[video] mount failed for {container:?}: {err}"),
            }
        }
        mounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingPlayer {
        available: bool,
        mounted: Vec<NodeId>,
    }

    impl VideoPlayer for RecordingPlayer {
        fn is_available(&self) -> bool {
            self.available
        }

        fn mount(
            &mut self,
            _doc: &Document,
            container: NodeId,
            options: &PlayerOptions,
        ) -> std::result::Result<(), VideoError> {
            assert!(options.autoplay && options.muted && options.loop_active);
            self.mounted.push(container);
            Ok(())
        }
    }

    fn doc_with(markup: &str) -> Document {
        let mut doc = Document::new();
        let body = doc.body();
        doc.parse_fragment(body, markup).unwrap();
        doc
    }

    #[test]
    fn replaces_marked_iframes_once() {
        let mut doc = doc_with(r#"<div><iframe data-vimeo-id="42"></iframe><iframe src="x"></iframe></div>"#);
        let mut player = RecordingPlayer {
            available: true,
            ..Default::default()
        };
        let mut embedder = VideoEmbedder::default();
        let created = embedder.upgrade(&mut doc, &mut player).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(player.mounted, created);
        let html = doc.inner_html(doc.body());
        assert!(html.contains(r#"class="plyr__video-embed plyr-initialized""#));
        assert!(html.contains("https://player.vimeo.com/video/42?autoplay=1&amp;loop=1"));
        assert!(html.contains(r#"<iframe src="x">"#));

        assert!(embedder.upgrade(&mut doc, &mut player).unwrap().is_empty());
        assert_eq!(player.mounted.len(), 1);
    }

    #[test]
    fn waits_for_player_to_load() {
        let mut doc = doc_with(r#"<iframe data-vimeo-id="7"></iframe>"#);
        let mut player = RecordingPlayer::default();
        let mut embedder = VideoEmbedder::default();
        embedder.upgrade(&mut doc, &mut player).unwrap();
        assert_eq!(embedder.pending().len(), 1);
        assert!(player.mounted.is_empty());

        player.available = true;
        assert_eq!(embedder.retry_pending(&doc, &mut player), 1);
        assert!(embedder.pending().is_empty());
    }
}
