use crate::dom::Document;
use crate::error::Result;
use crate::ids::NodeId;

pub const STYLE_ID: &str = "typewriter-typed-style";

/// Stylesheet for containers of class `container_class`: hide the animator's
/// own cursor and fade typed characters in.
pub fn animation_style(container_class: &str) -> String {
    format!(
        "\
.typed-cursor {{ display: none !important; }}
.{container_class} span {{ display: inline; opacity: 0; animation: tw-char-fadein 50ms linear forwards; }}
@keyframes tw-char-fadein {{ to {{ opacity: 1; }} }}
"
    )
}

/// Append the stylesheet to `head` unless it is already there.
pub fn inject_style(doc: &mut Document, container_class: &str) -> Result<Option<NodeId>> {
    let head = doc.head();
    let exists = doc
        .elements_by_tag(head, "style")
        .into_iter()
        .any(|s| doc.attr(s, "id") == Some(STYLE_ID));
    if exists {
        return Ok(None);
    }
    let style = doc.create_element("style");
    doc.set_attr(style, "id", STYLE_ID)?;
    let text = doc.create_text(animation_style(container_class));
    doc.append_child(style, text)?;
    doc.append_child(head, style)?;
    Ok(Some(style))
}
