//! Paragraph preparation: turn every qualifying block of a container into a
//! [`TypingJob`] while keeping layout stable and links intact.

use serde::{Deserialize, Serialize};

use crate::animator::Host;
use crate::config::Config;
use crate::dom::{Document, NodeData};
use crate::error::{Result, TypewriterError};
use crate::ids::NodeId;
use crate::links::{links_in, LinkLedger, LINK_TAG};
use crate::pauses::{effective_interval, process_text};
use crate::status::Markers;

/// One block's worth of typing, owned by the driver until it finishes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypingJob {
    pub block: NodeId,
    /// Empty inline node the animator types into.
    pub target: NodeId,
    pub processed_text: String,
    /// The same text without pause markers, used when animation fails.
    pub plain_text: String,
    /// Milliseconds per character.
    pub interval: u32,
}

#[derive(Debug, Default)]
pub struct PreparedSection {
    pub jobs: Vec<TypingJob>,
    pub links_before: usize,
    pub links_after: usize,
    /// Blocks that could not be prepared; their siblings still were.
    pub failures: Vec<(NodeId, TypewriterError)>,
}

fn lock_px(h: f32) -> String {
    format!("{}px", h.ceil() as u32)
}

/// Blocks of `container` with visible text, in document order.
pub fn candidate_blocks(doc: &Document, container: NodeId, cfg: &Config) -> Vec<NodeId> {
    doc.elements_by_tag(container, &cfg.block_tag)
        .into_iter()
        .filter(|b| !doc.text_content(*b).trim().is_empty())
        .collect()
}

/// Resolve a block's nominal speed: engine override, then attribute, then default.
pub fn block_speed(doc: &Document, block: NodeId, cfg: &Config) -> u32 {
    cfg.speed_override
        .or_else(|| {
            doc.attr(block, &cfg.speed_attribute)
                .and_then(|v| v.trim().parse::<u32>().ok())
        })
        .unwrap_or(cfg.default_speed)
}

/// Prepare every block of `container`. Errors concerning the container
/// itself abort; errors on a single block are collected and skipped.
pub fn prepare_section<H: Host + ?Sized>(
    doc: &mut Document,
    container: NodeId,
    cfg: &Config,
    host: &H,
    markers: &mut Markers,
) -> Result<PreparedSection> {
    doc.element(container)?;
    let mut prepared = PreparedSection {
        links_before: links_in(doc, container).len(),
        ..PreparedSection::default()
    };

    let height = host.rendered_height(doc, container);
    if height.is_finite() && height > 0.0 {
        doc.set_style(container, "height", &lock_px(height))?;
        doc.set_style(container, "min-height", &lock_px(height))?;
    }

    let mut blocks = candidate_blocks(doc, container, cfg);
    if blocks.is_empty() {
        if let Some(block) = synthesize_block(doc, container, cfg)? {
            log::debug!("[typewriter] wrapped loose content of {container:?} into {block:?}");
            blocks.push(block);
        }
    }
    blocks.retain(|b| !markers.block_started(*b));
    if blocks.is_empty() {
        prepared.links_after = prepared.links_before;
        return Ok(prepared);
    }

    // Blocks typed earlier, e.g. by a nested container, keep their links.
    let settled: Vec<NodeId> = doc
        .elements_by_tag(container, &cfg.block_tag)
        .into_iter()
        .filter(|b| markers.block_started(*b))
        .collect();
    let mut ledger = LinkLedger::build_with_settled(doc, container, &blocks, &settled);
    for block in blocks {
        markers.mark_block_started(block);
        match prepare_block(doc, block, cfg, host, &mut ledger) {
            Ok(job) => prepared.jobs.push(job),
            Err(err) => prepared.failures.push((block, err)),
        }
    }

    for dup in ledger.duplicates() {
        if doc.contains(container, *dup) {
            doc.remove(*dup)?;
        }
    }

    prepared.links_after = links_in(doc, container).len();
    Ok(prepared)
}

fn prepare_block<H: Host + ?Sized>(
    doc: &mut Document,
    block: NodeId,
    cfg: &Config,
    host: &H,
    ledger: &mut LinkLedger,
) -> Result<TypingJob> {
    doc.element(block)?;
    let height = host.rendered_height(doc, block);
    if !height.is_finite() {
        return Err(TypewriterError::Layout { node: block, height });
    }
    let policy = ledger.resolve(doc, block);
    // Text inside anchors travels with the anchors themselves.
    let anchors = links_in(doc, block);
    let plain_text = doc.text_content_excluding(block, &anchors);

    if height > 0.0 {
        doc.set_style(block, "height", &lock_px(height))?;
    }
    doc.set_text_content(block, "")?;
    for link in policy.links() {
        doc.append_child(block, *link)?;
    }
    let target = doc.create_element("span");
    doc.append_child(block, target)?;

    Ok(TypingJob {
        block,
        target,
        processed_text: process_text(&plain_text, &cfg.pauses),
        plain_text,
        interval: effective_interval(block_speed(doc, block, cfg)),
    })
}

fn is_loose(doc: &Document, node: NodeId, cfg: &Config) -> bool {
    match doc.data(node) {
        Some(NodeData::Text(t)) => !t.trim().is_empty(),
        Some(NodeData::Element(el)) => !cfg.is_synthetic_excluded(&el.tag),
        None => false,
    }
}

/// Wrap the container's loose direct content into one new block, placed
/// after the last anchor that stays behind. Returns `None` when there is no
/// loose text.
pub fn synthesize_block(
    doc: &mut Document,
    container: NodeId,
    cfg: &Config,
) -> Result<Option<NodeId>> {
    let children = doc.children(container).to_vec();
    let has_loose_text = children
        .iter()
        .any(|c| is_loose(doc, *c, cfg) && !doc.text_content(*c).trim().is_empty());
    if !has_loose_text {
        return Ok(None);
    }

    let moved: Vec<NodeId> = children
        .into_iter()
        .filter(|c| is_loose(doc, *c, cfg))
        .collect();
    let anchor = doc
        .elements_by_tag(container, LINK_TAG)
        .into_iter()
        .rev()
        .find(|a| !moved.iter().any(|m| doc.contains(*m, *a)));

    let block = doc.create_element(&cfg.block_tag);
    for node in &moved {
        doc.append_child(block, *node)?;
    }
    match anchor.and_then(|a| doc.parent(a).map(|p| (p, doc.next_sibling(a)))) {
        Some((parent, next)) => doc.insert_before(parent, block, next)?,
        None => doc.append_child(container, block)?,
    }
    Ok(Some(block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::HeadlessHost;

    struct TallHost;

    impl Host for TallHost {
        fn rendered_height(&self, _doc: &Document, _node: NodeId) -> f32 {
            31.2
        }
        fn jitter(&mut self) -> f64 {
            0.0
        }
    }

    fn container(markup: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let top = doc
            .parse_fragment(body, &format!("<div class=\"typewriter\">{markup}</div>"))
            .unwrap();
        (doc, top[0])
    }

    #[test]
    fn locks_heights_before_clearing() {
        let (mut doc, c) = container("<p>Some text.</p>");
        let mut markers = Markers::new();
        let prepared =
            prepare_section(&mut doc, c, &Config::default(), &TallHost, &mut markers).unwrap();
        assert_eq!(doc.style(c, "height"), Some("32px"));
        assert_eq!(doc.style(c, "min-height"), Some("32px"));
        assert_eq!(doc.style(prepared.jobs[0].block, "height"), Some("32px"));
    }

    #[test]
    fn block_is_cleared_and_gets_a_fresh_target() {
        let (mut doc, c) = container("<p>Hi, you. <em>Yes</em></p>");
        let mut markers = Markers::new();
        let prepared =
            prepare_section(&mut doc, c, &Config::default(), &HeadlessHost, &mut markers).unwrap();
        let job = &prepared.jobs[0];
        assert_eq!(doc.children(job.block), &[job.target]);
        assert_eq!(doc.tag(job.target), Some("span"));
        assert_eq!(job.plain_text, "Hi, you. Yes");
        assert_eq!(job.processed_text, "Hi,^200 you.^400 Yes");
        assert_eq!(job.interval, 20);
        assert!(doc.style(c, "height").is_none());
    }

    #[test]
    fn speed_prefers_override_then_attribute() {
        let (doc, c) = container(r#"<p data-tw-speed="90">a</p><p data-tw-speed="fast">b</p>"#);
        let blocks = candidate_blocks(&doc, c, &Config::default());
        let mut cfg = Config::default();
        assert_eq!(block_speed(&doc, blocks[0], &cfg), 90);
        assert_eq!(block_speed(&doc, blocks[1], &cfg), 40);
        cfg.speed_override = Some(10);
        assert_eq!(block_speed(&doc, blocks[0], &cfg), 10);
    }

    #[test]
    fn synthesizes_block_after_last_anchor() {
        let (mut doc, c) =
            container(r#"<a href="/x">x</a>Loose <strong>text</strong><script>s</script>"#);
        let block = synthesize_block(&mut doc, c, &Config::default())
            .unwrap()
            .expect("loose text wrapped");
        assert_eq!(
            doc.inner_html(c),
            r#"<a href="/x">x</a><p>Loose <strong>text</strong></p><script>s</script>"#
        );
        assert_eq!(doc.text_content(block), "Loose text");
    }

    #[test]
    fn no_synthesis_without_loose_text() {
        let (mut doc, c) = container(r#"<a href="/x">x</a>   <section>inner</section>"#);
        assert_eq!(synthesize_block(&mut doc, c, &Config::default()).unwrap(), None);
    }

    #[test]
    fn already_started_blocks_are_skipped() {
        let (mut doc, c) = container("<p>one</p><p>two</p>");
        let mut markers = Markers::new();
        let first = candidate_blocks(&doc, c, &Config::default())[0];
        markers.mark_block_started(first);
        let prepared =
            prepare_section(&mut doc, c, &Config::default(), &HeadlessHost, &mut markers).unwrap();
        assert_eq!(prepared.jobs.len(), 1);
        assert_eq!(doc.text_content(first), "one");
    }

    struct UnmeasurableFirst;

    impl Host for UnmeasurableFirst {
        fn rendered_height(&self, doc: &Document, node: NodeId) -> f32 {
            if doc.text_content(node) == "one" {
                f32::NAN
            } else {
                12.0
            }
        }
        fn jitter(&mut self) -> f64 {
            0.0
        }
    }

    #[test]
    fn unmeasurable_block_fails_alone() {
        let (mut doc, c) = container(r#"<p>one</p><p>two</p><a href="/x">x</a>"#);
        let mut markers = Markers::new();
        let prepared =
            prepare_section(&mut doc, c, &Config::default(), &UnmeasurableFirst, &mut markers)
                .unwrap();
        let blocks = doc.elements_by_tag(c, "p");
        assert_eq!(prepared.failures.len(), 1);
        assert_eq!(prepared.failures[0].0, blocks[0]);
        assert!(matches!(prepared.failures[0].1, TypewriterError::Layout { .. }));
        assert_eq!(doc.inner_html(blocks[0]), "one");
        assert_eq!(prepared.jobs.len(), 1);
        assert_eq!(prepared.jobs[0].block, blocks[1]);
        assert_eq!(doc.inner_html(blocks[1]), r#"<a href="/x">x</a><span></span>"#);
        assert!(markers.block_started(blocks[0]));
    }

    #[test]
    fn unknown_container_is_a_setup_error() {
        let mut doc = Document::new();
        let mut markers = Markers::new();
        let err = prepare_section(
            &mut doc,
            NodeId(999),
            &Config::default(),
            &HeadlessHost,
            &mut markers,
        )
        .unwrap_err();
        assert_eq!(err, TypewriterError::UnknownNode(NodeId(999)));
    }
}
