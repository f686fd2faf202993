mod common;

use common::{
    by_id, completed, container_of, engine_with, started, started_blocks, visible, ScriptedAnimator,
};
use typewriter_core::{
    AnimationHandle, Config, Context, DiagnosticKind, Inputs, NodeId, RunState, TypewriterEvent,
};

#[test]
fn blocks_type_one_after_another() {
    let mut engine = started("three-blocks");
    let section = by_id(engine.document(), "steps");
    let container = container_of(engine.document(), section);
    let blocks = engine.document().elements_by_tag(section, "p");

    let out = engine.update(0, visible(&[section])).clone();
    assert_eq!(started_blocks(&out.events), vec![blocks[0]]);
    assert_eq!(engine.driver().state(container), Some(RunState::Typing(0)));

    // Time alone never advances the sequence.
    let out = engine.update(10_000, Inputs::default()).clone();
    assert!(started_blocks(&out.events).is_empty());

    let h0 = engine.animator().last_handle();
    let out = engine.update(0, completed(h0)).clone();
    assert_eq!(started_blocks(&out.events), vec![blocks[1]]);
    assert!(out.events.contains(&TypewriterEvent::JobFinished {
        section: container,
        index: 0,
        handle: h0,
    }));

    let h1 = engine.animator().last_handle();
    let out = engine.update(0, completed(h1)).clone();
    assert_eq!(started_blocks(&out.events), vec![blocks[2]]);

    let requests = &engine.animator().requests;
    assert_eq!(requests[0].text, "One.");
    assert_eq!(requests[1].text, "Two,^200 slower.");
    assert_eq!(requests[1].type_speed, 30);
    assert_eq!(requests[2].text, "Three;^150 done:^150 yes!");
    assert_eq!(requests[2].type_speed, 20);
    assert!(requests.iter().all(|r| !r.options.looping && !r.options.show_cursor));
}

#[test]
fn ready_fires_once_after_grace_delay() {
    let mut engine = started("three-blocks");
    let section = by_id(engine.document(), "steps");
    let container = container_of(engine.document(), section);
    engine.update(0, visible(&[section]));
    for _ in 0..2 {
        let h = engine.animator().last_handle();
        engine.update(0, completed(h));
    }
    let last = engine.animator().last_handle();
    let out = engine.update(0, completed(last)).clone();
    assert!(out.ready_sections().is_empty());
    assert_eq!(engine.driver().state(container), Some(RunState::Done));

    assert!(engine.update(99, Inputs::default()).ready_sections().is_empty());
    let out = engine.update(1, Inputs::default()).clone();
    assert_eq!(out.ready_sections(), vec![container]);
    assert!(out.events.contains(&TypewriterEvent::TypewriterReady {
        section: container,
        bubbles: true,
    }));
    assert!(engine.update(1_000, Inputs::default()).ready_sections().is_empty());
}

#[test]
fn failed_start_renders_text_and_moves_on() {
    let mut engine = engine_with(
        "three-blocks",
        Config::default(),
        Context::default(),
        ScriptedAnimator::failing_on(&[1]),
    );
    engine.start();
    let section = by_id(engine.document(), "steps");
    let blocks = engine.document().elements_by_tag(section, "p");
    engine.update(0, visible(&[section]));

    let h0 = engine.animator().last_handle();
    let out = engine.update(0, completed(h0)).clone();

    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, TypewriterEvent::FallbackRendered { index: 1, .. })));
    assert!(out
        .diagnostics
        .iter()
        .any(|d| matches!(d.kind, DiagnosticKind::AnimationFailed { index: 1, .. })));
    assert_eq!(started_blocks(&out.events), vec![blocks[2]]);
    assert_eq!(engine.document().text_content(blocks[1]), "Two, slower.");
}

#[test]
fn duplicate_starts_create_one_job() {
    let mut engine = started("inline-link");
    let section = by_id(engine.document(), "hello");
    let container = container_of(engine.document(), section);

    engine.start_section(container);
    let out = engine.start_section(container).clone();
    assert!(out.is_empty());

    let out = engine.update(0, visible(&[section, section])).clone();
    assert!(started_blocks(&out.events).is_empty());
    assert_eq!(engine.animator().requests.len(), 1);
}

#[test]
fn stray_and_repeated_completions_are_ignored() {
    let mut engine = started("three-blocks");
    let section = by_id(engine.document(), "steps");
    engine.update(0, visible(&[section]));

    let out = engine.update(0, completed(AnimationHandle(999))).clone();
    assert!(out.events.is_empty());

    let h0 = engine.animator().last_handle();
    engine.update(0, completed(h0));
    let out = engine.update(0, completed(h0)).clone();
    assert!(started_blocks(&out.events).is_empty());
    assert_eq!(engine.animator().requests.len(), 2);
}

#[test]
fn teardown_destroys_in_flight_animations() {
    let mut engine = started("two-sections");
    let first = by_id(engine.document(), "first");
    let second = by_id(engine.document(), "second");
    engine.update(0, visible(&[first, second]));
    assert_eq!(engine.driver().registry().len(), 2);

    let handles = engine.animator().handles.clone();
    engine.teardown();
    assert!(engine.driver().registry().is_empty());
    let mut destroyed = engine.animator().destroyed.clone();
    destroyed.sort();
    assert_eq!(destroyed, handles);

    let out = engine.update(0, completed(handles[0])).clone();
    assert!(out.events.is_empty());
}

#[test]
fn sections_advance_independently() {
    let mut engine = started("two-sections");
    let first = by_id(engine.document(), "first");
    let second = by_id(engine.document(), "second");
    let out = engine.update(0, visible(&[first, second])).clone();
    let sections: Vec<_> = out
        .events
        .iter()
        .filter_map(|e| match e {
            TypewriterEvent::SectionStarted { section, .. } => Some(*section),
            _ => None,
        })
        .collect();
    assert_eq!(
        sections,
        vec![
            container_of(engine.document(), first),
            container_of(engine.document(), second)
        ]
    );
}

#[test]
fn speed_override_and_height_lock_from_config() {
    let cfg: Config = typewriter_test_fixtures::configs::load("slow-override").unwrap();
    let mut engine = engine_with("inline-link", cfg, Context::default(), ScriptedAnimator::default());
    engine.host_mut().height = 40.5;
    engine.host_mut().jitter = 0.5;
    engine.start();
    let section = by_id(engine.document(), "hello");
    let container = container_of(engine.document(), section);

    let out = engine.start_section(container).clone();
    assert!(out.diagnostics.is_empty());
    let request = &engine.animator().requests[0];
    assert_eq!(request.type_speed, 60);
    assert_eq!(request.start_delay, 50.0);
    assert_eq!(engine.document().style(container, "height"), Some("41px"));
    assert_eq!(engine.document().style(container, "min-height"), Some("41px"));
}

#[test]
fn unknown_section_fails_setup_and_others_still_type() {
    let mut engine = started("two-sections");
    let out = engine.start_section(NodeId(9999)).clone();
    assert!(started_blocks(&out.events).is_empty());
    assert!(out.diagnostics.iter().any(|d| d.section == Some(NodeId(9999))
        && matches!(d.kind, DiagnosticKind::SetupFailed { block: None, .. })));

    let second = by_id(engine.document(), "second");
    let block = engine.document().elements_by_tag(second, "p")[0];
    let out = engine.update(0, visible(&[second])).clone();
    assert_eq!(started_blocks(&out.events), vec![block]);
}

#[test]
fn unmeasurable_block_is_skipped_and_siblings_type() {
    let mut engine = started("three-blocks");
    let section = by_id(engine.document(), "steps");
    let container = container_of(engine.document(), section);
    let blocks = engine.document().elements_by_tag(section, "p");
    engine.host_mut().unmeasurable = Some(blocks[0]);

    let out = engine.update(0, visible(&[section])).clone();
    assert!(out.diagnostics.iter().any(|d| d.section == Some(container)
        && matches!(d.kind, DiagnosticKind::SetupFailed { block: Some(b), .. } if b == blocks[0])));
    assert!(out.events.iter().any(|e| matches!(
        e,
        TypewriterEvent::SectionStarted { blocks: 2, .. }
    )));
    assert_eq!(started_blocks(&out.events), vec![blocks[1]]);
    assert_eq!(engine.document().text_content(blocks[0]), "One.");

    let h = engine.animator().last_handle();
    let out = engine.update(0, completed(h)).clone();
    assert_eq!(started_blocks(&out.events), vec![blocks[2]]);
}
