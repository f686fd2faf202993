//! Sequential typing driver.
//!
//! Each container runs `Idle → Typing(0) → … → Typing(n-1) → Done`. Only one
//! job per container is in flight; the next starts when the previous one
//! reports completion or fails to start. Containers advance independently.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::animator::{AnimationRequest, CharacterAnimator, Host};
use crate::config::Config;
use crate::diagnostics::{report, DiagnosticKind, Severity};
use crate::dom::Document;
use crate::ids::{AnimationHandle, NodeId};
use crate::outputs::{Outputs, TypewriterEvent};
use crate::prepare::TypingJob;
use crate::registry::InstanceRegistry;
use crate::timers::{TimerKind, TimerQueue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Typing(usize),
    Done,
}

#[derive(Debug)]
struct SectionRun {
    jobs: Vec<TypingJob>,
    next: usize,
    state: RunState,
}

/// Borrowed engine state the driver needs while advancing.
pub struct Runtime<'a> {
    pub doc: &'a mut Document,
    pub animator: &'a mut dyn CharacterAnimator,
    pub host: &'a mut dyn Host,
    pub cfg: &'a Config,
    pub timers: &'a mut TimerQueue,
    pub outputs: &'a mut Outputs,
}

#[derive(Debug, Default)]
pub struct Driver {
    runs: HashMap<NodeId, SectionRun>,
    owners: HashMap<AnimationHandle, NodeId>,
    registry: InstanceRegistry,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, section: NodeId) -> Option<RunState> {
        self.runs.get(&section).map(|r| r.state)
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Take ownership of a container's jobs and start the first one.
    /// A container already being driven is left alone.
    pub fn begin(&mut self, section: NodeId, jobs: Vec<TypingJob>, rt: &mut Runtime<'_>) {
        if self.runs.contains_key(&section) {
            log::debug!("[typewriter] {section:?} already driven");
            return;
        }
        self.runs.insert(
            section,
            SectionRun {
                jobs,
                next: 0,
                state: RunState::Idle,
            },
        );
        self.advance(section, rt);
    }

    /// Completion callback for one animation. Unknown or repeated handles
    /// are ignored so a job can finish only once.
    pub fn on_job_finished(&mut self, handle: AnimationHandle, rt: &mut Runtime<'_>) -> bool {
        let Some(section) = self.owners.remove(&handle) else {
            log::debug!("[typewriter] ignoring completion of unknown {handle:?}");
            return false;
        };
        self.registry.remove(section, handle);
        if let Some(RunState::Typing(index)) = self.state(section) {
            rt.outputs.push_event(TypewriterEvent::JobFinished {
                section,
                index,
                handle,
            });
        }
        self.advance(section, rt);
        true
    }

    fn advance(&mut self, section: NodeId, rt: &mut Runtime<'_>) {
        let Some(run) = self.runs.get_mut(&section) else {
            return;
        };
        loop {
            let index = run.next;
            let Some(job) = run.jobs.get(index) else {
                run.state = RunState::Done;
                rt.timers
                    .schedule(rt.cfg.ready_grace, TimerKind::ReadyGrace(section));
                log::debug!("[typewriter] {section:?} finished {} blocks", run.jobs.len());
                return;
            };
            run.next += 1;

            let delay = rt.host.jitter() * rt.cfg.max_start_jitter;
            let request = AnimationRequest::for_job(job, delay);
            match rt.animator.start(rt.doc, &request) {
                Ok(handle) => {
                    run.state = RunState::Typing(index);
                    self.owners.insert(handle, section);
                    self.registry.insert(section, handle);
                    rt.outputs.push_event(TypewriterEvent::JobStarted {
                        section,
                        block: job.block,
                        index,
                        handle,
                    });
                    return;
                }
                Err(err) => {
                    report(
                        &rt.cfg.diagnostics,
                        rt.outputs,
                        Severity::Error,
                        Some(section),
                        DiagnosticKind::AnimationFailed {
                            index,
                            reason: err.to_string(),
                        },
                    );
                    if let Err(err) = rt.doc.set_text_content(job.target, &job.plain_text) {
                        log::error!("[typewriter] fallback render failed for {section:?}: {err}");
                    }
                    rt.outputs.push_event(TypewriterEvent::FallbackRendered {
                        section,
                        block: job.block,
                        index,
                    });
                }
            }
        }
    }

    /// Destroy every in-flight animation. Later completions are ignored.
    pub fn teardown(&mut self, rt: &mut Runtime<'_>) {
        for (section, handle) in self.registry.drain() {
            if let Err(err) = rt.animator.destroy(handle) {
                report(
                    &rt.cfg.diagnostics,
                    rt.outputs,
                    Severity::Warn,
                    Some(section),
                    DiagnosticKind::TeardownFailed {
                        reason: err.to_string(),
                    },
                );
            }
        }
        self.owners.clear();
    }
}
