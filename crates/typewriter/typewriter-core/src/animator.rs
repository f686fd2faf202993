//! Capabilities the engine consumes from its host: the character animator
//! that reveals text and the layout/randomness probe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::Document;
use crate::ids::{AnimationHandle, NodeId};
use crate::prepare::TypingJob;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimatorError {
    #[error("character animator is not loaded")]
    Unavailable,
    #[error("character animator rejected the job: {0}")]
    Rejected(String),
}

/// Reveals markup character by character into a target node.
///
/// `start` must not report completion synchronously; the host passes the
/// returned handle back through `Inputs::completed` exactly once when the
/// reveal ends.
pub trait CharacterAnimator {
    fn is_available(&self) -> bool {
        true
    }

    fn start(
        &mut self,
        doc: &mut Document,
        request: &AnimationRequest,
    ) -> Result<AnimationHandle, AnimatorError>;

    fn destroy(&mut self, handle: AnimationHandle) -> Result<(), AnimatorError>;
}

/// Layout and randomness the engine cannot compute itself.
pub trait Host {
    /// Rendered height of an element; 0 when unknown. A non-finite value
    /// means measuring failed, and the block is left as it is.
    fn rendered_height(&self, doc: &Document, node: NodeId) -> f32;
    /// Uniform sample in [0, 1) used for start jitter.
    fn jitter(&mut self) -> f64;
}

/// Host without layout: heights are unknown (no locking) and jitter is zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessHost;

impl Host for HeadlessHost {
    fn rendered_height(&self, _doc: &Document, _node: NodeId) -> f32 {
        0.0
    }

    fn jitter(&mut self) -> f64 {
        0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Html,
    Text,
}

/// Reveal options. The defaults describe a single forward pass: no loop,
/// no cursor, no backspacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimatorOptions {
    #[serde(rename = "loop")]
    pub looping: bool,
    pub show_cursor: bool,
    pub cursor_char: String,
    pub back_speed: u32,
    pub back_delay: u32,
    pub smart_backspace: bool,
    pub shuffle: bool,
    pub fade_out: bool,
    pub bind_input_focus_events: bool,
    pub content_type: ContentType,
}

impl Default for AnimatorOptions {
    fn default() -> Self {
        Self {
            looping: false,
            show_cursor: false,
            cursor_char: String::new(),
            back_speed: 0,
            back_delay: 0,
            smart_backspace: true,
            shuffle: false,
            fade_out: false,
            bind_input_focus_events: false,
            content_type: ContentType::Html,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationRequest {
    pub target: NodeId,
    /// Markup with `^N` pause markers.
    pub text: String,
    /// Milliseconds per character.
    pub type_speed: u32,
    pub start_delay: f64,
    pub options: AnimatorOptions,
}

impl AnimationRequest {
    pub fn for_job(job: &TypingJob, start_delay: f64) -> Self {
        Self {
            target: job.target,
            text: job.processed_text.clone(),
            type_speed: job.interval,
            start_delay,
            options: AnimatorOptions::default(),
        }
    }
}
