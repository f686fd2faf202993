//! Engine configuration and the injected runtime context.

use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticsCfg;
use crate::error::{Result, TypewriterError};

/// Static configuration for selectors, timings and speeds.
/// All durations are in host time units (milliseconds in the browser adapter).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Class that marks a typing container.
    pub container_class: String,
    /// Tag of the blocks typed inside a container.
    pub block_tag: String,
    /// Tag of the ancestor used for section-scoped visibility.
    pub section_tag: String,
    /// Per-block speed override attribute.
    pub speed_attribute: String,

    /// Nominal per-character speed when a block has no override.
    pub default_speed: u32,
    /// Engine-wide speed that wins over per-block attributes.
    pub speed_override: Option<u32>,
    pub pauses: PauseCfg,
    /// Upper bound of the random delay before a job starts typing.
    pub max_start_jitter: f64,

    /// Fraction of a watched element that must be visible to start typing.
    pub visibility_threshold: f32,
    /// How long a suppressed section waits for the readiness signal.
    pub suppression_timeout: u64,
    pub rescan_debounce: u64,
    /// Delay between the last block finishing and the ready event.
    pub ready_grace: u64,
    /// Poll interval while the animator capability is not yet available.
    pub capability_retry: u64,

    /// Child element tags never folded into a synthesized block.
    pub synthetic_exclude_tags: Vec<String>,
    pub inject_style: bool,
    pub diagnostics: DiagnosticsCfg,
}

/// Pause lengths inserted after punctuation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseCfg {
    /// After `.`, `!` and `?`.
    pub sentence: u32,
    pub comma: u32,
    /// After `;` and `:`.
    pub clause: u32,
}

impl Default for PauseCfg {
    fn default() -> Self {
        Self {
            sentence: 400,
            comma: 200,
            clause: 150,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container_class: "typewriter".to_string(),
            block_tag: "p".to_string(),
            section_tag: "section".to_string(),
            speed_attribute: "data-tw-speed".to_string(),
            default_speed: 40,
            speed_override: None,
            pauses: PauseCfg::default(),
            max_start_jitter: 100.0,
            visibility_threshold: 0.25,
            suppression_timeout: 500,
            rescan_debounce: 100,
            ready_grace: 100,
            capability_retry: 100,
            synthetic_exclude_tags: ["a", "section", "script", "style", "template", "iframe"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            inject_style: true,
            diagnostics: DiagnosticsCfg::default(),
        }
    }
}

impl Config {
    /// Parse a JSON config; missing fields fall back to defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let cfg: Config =
            serde_json::from_str(raw).map_err(|e| TypewriterError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container_class.trim().is_empty() {
            return Err(TypewriterError::Config(
                "container_class must not be empty".into(),
            ));
        }
        if self.block_tag.trim().is_empty() || self.section_tag.trim().is_empty() {
            return Err(TypewriterError::Config(
                "block_tag and section_tag must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(TypewriterError::Config(format!(
                "visibility_threshold {} outside [0, 1]",
                self.visibility_threshold
            )));
        }
        if self.capability_retry == 0 {
            return Err(TypewriterError::Config(
                "capability_retry must be positive".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_synthetic_excluded(&self, tag: &str) -> bool {
        self.synthetic_exclude_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Runtime context injected by the host. Read by the scheduler on every
/// visibility event, so hosts may flip it between updates.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    /// When set, section starts wait for an inflection-ready signal (or the timeout).
    pub suppressed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = Config::from_json(r#"{ "default_speed": 60, "pauses": { "comma": 90 } }"#)
            .expect("config parses");
        assert_eq!(cfg.default_speed, 60);
        assert_eq!(cfg.pauses.comma, 90);
        assert_eq!(cfg.pauses.sentence, 400);
        assert_eq!(cfg.suppression_timeout, 500);
        assert_eq!(cfg.container_class, "typewriter");
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = Config::from_json(r#"{ "visibility_threshold": 1.5 }"#).unwrap_err();
        assert!(matches!(err, TypewriterError::Config(_)));
    }

    #[test]
    fn exclusion_is_case_insensitive() {
        let cfg = Config::default();
        assert!(cfg.is_synthetic_excluded("A"));
        assert!(cfg.is_synthetic_excluded("section"));
        assert!(!cfg.is_synthetic_excluded("em"));
    }
}
