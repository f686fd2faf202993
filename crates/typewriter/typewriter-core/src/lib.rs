//! Typewriter Core (engine-agnostic)
//!
//! Scroll-triggered, character-by-character reveal of paragraph text that
//! keeps every inline link clickable. The crate owns an arena [`Document`],
//! prepares containers into [`TypingJob`]s, and drives them one block at a
//! time through a host-provided [`CharacterAnimator`]. Hosts report
//! visibility, signals, completions and elapsed time via [`Engine::update`]
//! and apply the returned [`Outputs`].

pub mod animator;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod driver;
pub mod engine;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod links;
pub mod outputs;
pub mod pauses;
pub mod prepare;
pub mod registry;
pub mod rescan;
pub mod scheduler;
pub mod status;
pub mod style;
pub mod timers;
pub mod video;

// Re-exports for consumers (adapters)
pub use animator::{
    AnimationRequest, AnimatorError, AnimatorOptions, CharacterAnimator, ContentType,
    HeadlessHost, Host,
};
pub use config::{Config, Context, PauseCfg};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsCfg, Severity};
pub use dom::{Document, Element, NodeData};
pub use driver::{Driver, RunState};
pub use engine::Engine;
pub use error::{Result, TypewriterError};
pub use ids::{AnimationHandle, NodeId, TimerId};
pub use inputs::{Inputs, Intersection, Signal, SignalInput};
pub use links::{LinkLedger, LinkPolicy};
pub use outputs::{Outputs, TypewriterEvent};
pub use prepare::{prepare_section, PreparedSection, TypingJob};
pub use registry::InstanceRegistry;
pub use scheduler::{VisibilityScheduler, WatchStrategy};
pub use status::{Markers, Status};
pub use video::{PlayerOptions, VideoEmbedder, VideoError, VideoPlayer};
