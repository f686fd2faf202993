#![allow(dead_code)]

use std::cell::Cell;

use typewriter_core::{
    AnimationHandle, AnimationRequest, AnimatorError, CharacterAnimator, Config, Context, Document,
    Engine, Host, Inputs, Intersection, NodeId, TypewriterEvent,
};

/// Records every request; fails the starts listed in `fail_on` (by call
/// index) and reports itself unavailable for the first `unavailable_checks`
/// probes.
#[derive(Default)]
pub struct ScriptedAnimator {
    pub requests: Vec<AnimationRequest>,
    pub handles: Vec<AnimationHandle>,
    pub destroyed: Vec<AnimationHandle>,
    pub fail_on: Vec<usize>,
    pub unavailable_checks: u32,
    checks: Cell<u32>,
    calls: usize,
    next: u32,
}

impl ScriptedAnimator {
    pub fn failing_on(fail_on: &[usize]) -> Self {
        Self {
            fail_on: fail_on.to_vec(),
            ..Self::default()
        }
    }

    pub fn unavailable_for(checks: u32) -> Self {
        Self {
            unavailable_checks: checks,
            ..Self::default()
        }
    }

    pub fn last_handle(&self) -> AnimationHandle {
        *self.handles.last().expect("an animation was started")
    }
}

impl CharacterAnimator for ScriptedAnimator {
    fn is_available(&self) -> bool {
        let n = self.checks.get();
        self.checks.set(n + 1);
        n >= self.unavailable_checks
    }

    fn start(
        &mut self,
        _doc: &mut Document,
        request: &AnimationRequest,
    ) -> Result<AnimationHandle, AnimatorError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(AnimatorError::Rejected(format!("scripted failure #{call}")));
        }
        self.next += 1;
        let handle = AnimationHandle(self.next);
        self.requests.push(request.clone());
        self.handles.push(handle);
        Ok(handle)
    }

    fn destroy(&mut self, handle: AnimationHandle) -> Result<(), AnimatorError> {
        self.destroyed.push(handle);
        Ok(())
    }
}

/// Every node measures `height`, except `unmeasurable`, which reports NaN.
#[derive(Clone, Copy, Default)]
pub struct FixedHost {
    pub height: f32,
    pub jitter: f64,
    pub unmeasurable: Option<NodeId>,
}

impl Host for FixedHost {
    fn rendered_height(&self, _doc: &Document, node: NodeId) -> f32 {
        if self.unmeasurable == Some(node) {
            return f32::NAN;
        }
        self.height
    }

    fn jitter(&mut self) -> f64 {
        self.jitter
    }
}

pub type TestEngine = Engine<ScriptedAnimator, FixedHost>;

pub fn engine_with(
    fixture: &str,
    cfg: Config,
    ctx: Context,
    animator: ScriptedAnimator,
) -> TestEngine {
    let markup = typewriter_test_fixtures::markup::html(fixture).expect("fixture exists");
    let mut doc = Document::new();
    let body = doc.body();
    doc.parse_fragment(body, &markup).expect("fixture parses");
    Engine::with_document(cfg, ctx, doc, animator, FixedHost::default())
}

/// Engine over `fixture` with defaults, already started.
pub fn started(fixture: &str) -> TestEngine {
    let mut engine = engine_with(
        fixture,
        Config::default(),
        Context::default(),
        ScriptedAnimator::default(),
    );
    engine.start();
    engine
}

pub fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.descendants(doc.root())
        .into_iter()
        .find(|n| doc.attr(*n, "id") == Some(id))
        .unwrap_or_else(|| panic!("no element #{id}"))
}

pub fn container_of(doc: &Document, section: NodeId) -> NodeId {
    doc.elements_by_class(section, "typewriter")[0]
}

pub fn visible(targets: &[NodeId]) -> Inputs {
    Inputs {
        intersections: targets
            .iter()
            .map(|t| Intersection::visible(*t, 1.0))
            .collect(),
        ..Inputs::default()
    }
}

pub fn completed(handle: AnimationHandle) -> Inputs {
    Inputs {
        completed: vec![handle],
        ..Inputs::default()
    }
}

pub fn hrefs(doc: &Document, node: NodeId) -> Vec<String> {
    doc.elements_by_tag(node, "a")
        .into_iter()
        .filter_map(|a| doc.attr(a, "href").map(str::to_string))
        .collect()
}

pub fn started_blocks(events: &[TypewriterEvent]) -> Vec<NodeId> {
    events
        .iter()
        .filter_map(|e| match e {
            TypewriterEvent::JobStarted { block, .. } => Some(*block),
            _ => None,
        })
        .collect()
}
