use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::outputs::Outputs;

/// Diagnostics toggle. Log records are always emitted through the `log`
/// facade; this only controls whether they are also attached to [`Outputs`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsCfg {
    pub enabled: bool,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        DiagnosticsCfg { enabled: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Link count of a container before and after preparation.
    LinkAudit { before: usize, after: usize },
    SetupFailed { block: Option<NodeId>, reason: String },
    AnimationFailed { index: usize, reason: String },
    AnimatorUnavailable { retry_in: u64 },
    TeardownFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub section: Option<NodeId>,
    pub kind: DiagnosticKind,
}

/// Log the record and, when enabled, keep it on the outputs.
pub(crate) fn report(
    cfg: &DiagnosticsCfg,
    outputs: &mut Outputs,
    severity: Severity,
    section: Option<NodeId>,
    kind: DiagnosticKind,
) {
    match severity {
        Severity::Debug => log::debug!("[typewriter] section={section:?} {kind:?}"),
        Severity::Warn => log::warn!("[typewriter] section={section:?} {kind:?}"),
        Severity::Error => log::error!("[typewriter] section={section:?} {kind:?}"),
    }
    if cfg.enabled {
        outputs.push_diagnostic(Diagnostic {
            severity,
            section,
            kind,
        });
    }
}
