//! Content rescanning: registers sections and containers that appear after
//! the initial scan. Mutations are debounced into a single rescan.

use crate::config::Config;
use crate::dom::Document;
use crate::ids::{NodeId, TimerId};
use crate::outputs::Outputs;
use crate::scheduler::{containers_in, VisibilityScheduler, WatchStrategy};
use crate::status::{Markers, Status};
use crate::timers::{TimerKind, TimerQueue};

#[derive(Debug, Default)]
pub struct Rescanner {
    debounce: u64,
    pending: Option<TimerId>,
}

impl Rescanner {
    pub fn new(cfg: &Config) -> Self {
        Self {
            debounce: cfg.rescan_debounce,
            pending: None,
        }
    }

    /// Push the rescan back to `debounce` after this mutation.
    pub fn on_mutation(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
        self.pending = Some(timers.schedule(self.debounce, TimerKind::Rescan));
    }

    pub fn on_fired(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub sections: Vec<NodeId>,
    pub standalone: Vec<NodeId>,
}

/// Register every section holding a container. Only when the page has no
/// such section at all are containers watched one by one.
pub fn scan(
    doc: &Document,
    cfg: &Config,
    markers: &mut Markers,
    scheduler: &mut VisibilityScheduler,
    outputs: &mut Outputs,
) -> ScanReport {
    let mut report = ScanReport::default();
    let mut found = false;

    for section in doc.elements_by_tag(doc.root(), &cfg.section_tag) {
        if containers_in(doc, section, cfg).is_empty() {
            continue;
        }
        found = true;
        if markers.mark_registered(section) {
            scheduler.observe(section, WatchStrategy::Section, outputs);
            report.sections.push(section);
        }
    }

    if !found {
        for container in doc.elements_by_class(doc.root(), &cfg.container_class) {
            if markers.status(container) == Status::Started || scheduler.is_observed(container) {
                continue;
            }
            markers.mark_registered(container);
            scheduler.observe(container, WatchStrategy::Standalone, outputs);
            report.standalone.push(container);
        }
    }

    report
}
