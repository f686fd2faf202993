use crate::animator::{CharacterAnimator, Host};
use crate::config::{Config, Context};
use crate::diagnostics::{report, DiagnosticKind, Severity};
use crate::dom::Document;
use crate::driver::{Driver, Runtime};
use crate::error::Result;
use crate::ids::{NodeId, TimerId};
use crate::inputs::{Inputs, Signal};
use crate::outputs::{Outputs, TypewriterEvent};
use crate::prepare::prepare_section;
use crate::rescan::{scan, Rescanner, ScanReport};
use crate::scheduler::VisibilityScheduler;
use crate::status::Markers;
use crate::style::inject_style;
use crate::timers::{TimerKind, TimerQueue};
use crate::video::{VideoEmbedder, VideoPlayer};

/// Typewriter engine over an owned document.
///
/// The host feeds observer entries, signals, completions and elapsed time
/// through [`Engine::update`] and applies the returned events.
pub struct Engine<A: CharacterAnimator, H: Host> {
    cfg: Config,
    ctx: Context,
    doc: Document,
    animator: A,
    host: H,
    timers: TimerQueue,
    markers: Markers,
    scheduler: VisibilityScheduler,
    rescanner: Rescanner,
    driver: Driver,
    video: VideoEmbedder,
    outputs: Outputs,
    booted: bool,
    /// Pending animator poll; at most one is ever scheduled.
    boot_retry: Option<TimerId>,
}

impl<A: CharacterAnimator, H: Host> Engine<A, H> {
    /// Create an engine over an empty document.
    pub fn new(cfg: Config, ctx: Context, animator: A, host: H) -> Self {
        Self::with_document(cfg, ctx, Document::new(), animator, host)
    }

    pub fn with_document(cfg: Config, ctx: Context, doc: Document, animator: A, host: H) -> Self {
        let scheduler = VisibilityScheduler::new(&cfg);
        let rescanner = Rescanner::new(&cfg);
        Self {
            cfg,
            ctx,
            doc,
            animator,
            host,
            timers: TimerQueue::new(),
            markers: Markers::new(),
            scheduler,
            rescanner,
            driver: Driver::new(),
            video: VideoEmbedder::default(),
            outputs: Outputs::default(),
            booted: false,
            boot_retry: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutations made through this handle are picked up by the next update.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn animator(&self) -> &A {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut A {
        &mut self.animator
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn scheduler(&self) -> &VisibilityScheduler {
        &self.scheduler
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Inject the stylesheet and boot, or begin polling for the animator.
    pub fn start(&mut self) -> &Outputs {
        self.outputs.clear();
        if self.cfg.inject_style {
            match inject_style(&mut self.doc, &self.cfg.container_class) {
                Ok(Some(node)) => self.outputs.push_event(TypewriterEvent::StyleInjected { node }),
                Ok(None) => {}
                Err(err) => log::error!("[typewriter] stylesheet injection failed: {err}"),
            }
        }
        // Setup's own edits are not content changes.
        self.doc.take_mutations();
        self.boot();
        &self.outputs
    }

    fn boot(&mut self) {
        if self.booted {
            return;
        }
        if self.boot_retry.is_some_and(|id| self.timers.is_pending(id)) {
            return;
        }
        if !self.animator.is_available() {
            let retry_in = self.cfg.capability_retry;
            report(
                &self.cfg.diagnostics,
                &mut self.outputs,
                Severity::Debug,
                None,
                DiagnosticKind::AnimatorUnavailable { retry_in },
            );
            self.boot_retry = Some(self.timers.schedule(retry_in, TimerKind::AnimatorRetry));
            return;
        }
        self.boot_retry = None;
        self.booted = true;
        let report = self.rescan();
        log::info!(
            "[typewriter] watching {} sections, {} standalone containers",
            report.sections.len(),
            report.standalone.len()
        );
    }

    fn rescan(&mut self) -> ScanReport {
        scan(
            &self.doc,
            &self.cfg,
            &mut self.markers,
            &mut self.scheduler,
            &mut self.outputs,
        )
    }

    /// Step the engine: apply inputs at the current time, then advance the
    /// clock by `dt` milliseconds firing due timers.
    pub fn update(&mut self, dt: u64, inputs: Inputs) -> &Outputs {
        self.outputs.clear();
        // Edits made through `document_mut` since the previous step.
        let host_mutations = self.doc.take_mutations();
        if self.booted && (inputs.mutated || host_mutations > 0) {
            self.rescanner.on_mutation(&mut self.timers);
        }

        for entry in &inputs.intersections {
            let ready = self.scheduler.on_intersection(
                &self.doc,
                &self.cfg,
                &self.ctx,
                entry,
                &mut self.timers,
                &mut self.outputs,
            );
            for container in ready {
                self.begin_section(container);
            }
        }

        for input in &inputs.signals {
            match input.signal {
                Signal::InflectionReady => {
                    if let Some(section) =
                        self.scheduler
                            .on_ready_signal(&self.doc, input.target, &mut self.timers)
                    {
                        self.begin_containers_of(section);
                    }
                }
            }
        }

        for handle in &inputs.completed {
            let mut rt = Runtime {
                doc: &mut self.doc,
                animator: &mut self.animator,
                host: &mut self.host,
                cfg: &self.cfg,
                timers: &mut self.timers,
                outputs: &mut self.outputs,
            };
            self.driver.on_job_finished(*handle, &mut rt);
        }

        let until = self.timers.now().saturating_add(dt);
        while let Some(kind) = self.timers.pop_due(until) {
            self.fire(kind);
        }
        self.timers.advance_to(until);
        // Preparation and fallback edits are not new content.
        self.doc.take_mutations();

        &self.outputs
    }

    fn fire(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Rescan => {
                self.rescanner.on_fired();
                self.rescan();
            }
            TimerKind::AnimatorRetry => self.boot(),
            TimerKind::SuppressionTimeout(section) => {
                if self.scheduler.on_timeout(section) {
                    log::debug!("[typewriter] {section:?} started without readiness signal");
                    self.begin_containers_of(section);
                }
            }
            TimerKind::ReadyGrace(section) => {
                self.outputs.push_event(TypewriterEvent::TypewriterReady {
                    section,
                    bubbles: true,
                });
            }
        }
    }

    fn begin_containers_of(&mut self, section: NodeId) {
        for container in self.doc.elements_by_class(section, &self.cfg.container_class) {
            self.begin_section(container);
        }
    }

    /// Run the start procedure on `node` immediately, outside of visibility.
    pub fn start_section(&mut self, node: NodeId) -> &Outputs {
        self.outputs.clear();
        self.begin_section(node);
        self.doc.take_mutations();
        &self.outputs
    }

    fn begin_section(&mut self, section: NodeId) {
        if !self.markers.mark_started(section) {
            return;
        }
        let prepared = match prepare_section(
            &mut self.doc,
            section,
            &self.cfg,
            &self.host,
            &mut self.markers,
        ) {
            Ok(prepared) => prepared,
            Err(err) => {
                report(
                    &self.cfg.diagnostics,
                    &mut self.outputs,
                    Severity::Error,
                    Some(section),
                    DiagnosticKind::SetupFailed {
                        block: None,
                        reason: err.to_string(),
                    },
                );
                return;
            }
        };

        for (block, err) in &prepared.failures {
            report(
                &self.cfg.diagnostics,
                &mut self.outputs,
                Severity::Error,
                Some(section),
                DiagnosticKind::SetupFailed {
                    block: Some(*block),
                    reason: err.to_string(),
                },
            );
        }
        report(
            &self.cfg.diagnostics,
            &mut self.outputs,
            Severity::Debug,
            Some(section),
            DiagnosticKind::LinkAudit {
                before: prepared.links_before,
                after: prepared.links_after,
            },
        );

        if prepared.jobs.is_empty() {
            return;
        }
        self.outputs.push_event(TypewriterEvent::SectionStarted {
            section,
            blocks: prepared.jobs.len(),
        });
        let mut rt = Runtime {
            doc: &mut self.doc,
            animator: &mut self.animator,
            host: &mut self.host,
            cfg: &self.cfg,
            timers: &mut self.timers,
            outputs: &mut self.outputs,
        };
        self.driver.begin(section, prepared.jobs, &mut rt);
    }

    /// Replace marked video iframes and mount them when the player is loaded.
    pub fn upgrade_video_embeds(&mut self, player: &mut dyn VideoPlayer) -> Result<Vec<NodeId>> {
        let created = self.video.upgrade(&mut self.doc, player)?;
        self.doc.take_mutations();
        Ok(created)
    }

    /// Mount embeds left pending by an earlier upgrade.
    pub fn retry_video_embeds(&mut self, player: &mut dyn VideoPlayer) -> usize {
        self.video.retry_pending(&self.doc, player)
    }

    pub fn pending_video_embeds(&self) -> &[NodeId] {
        self.video.pending()
    }

    /// Destroy every in-flight animation and empty the registry.
    pub fn teardown(&mut self) -> &Outputs {
        self.outputs.clear();
        let mut rt = Runtime {
            doc: &mut self.doc,
            animator: &mut self.animator,
            host: &mut self.host,
            cfg: &self.cfg,
            timers: &mut self.timers,
            outputs: &mut self.outputs,
        };
        self.driver.teardown(&mut rt);
        &self.outputs
    }
}
