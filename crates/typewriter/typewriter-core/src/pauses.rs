//! Natural typing rhythm: pause markers after punctuation, and speed math.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PauseCfg;
use crate::dom::escape_text;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])\s+").expect("valid regex"));
static COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s+").expect("valid regex"));
static CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([;:])\s+").expect("valid regex"));

/// Insert `^N` pause markers after punctuation followed by whitespace. The
/// whitespace run collapses to a single space after the marker.
pub fn insert_pauses(text: &str, pauses: &PauseCfg) -> String {
    let text = SENTENCE_END.replace_all(text, format!("${{1}}^{} ", pauses.sentence).as_str());
    let text = COMMA.replace_all(&text, format!(",^{} ", pauses.comma).as_str());
    let text = CLAUSE.replace_all(&text, format!("${{1}}^{} ", pauses.clause).as_str());
    text.into_owned()
}

/// Markup handed to the animator: pauses first, then escaping, so literal
/// `&`/`<` never produce spurious markers or tags.
pub fn process_text(text: &str, pauses: &PauseCfg) -> String {
    escape_text(&insert_pauses(text, pauses)).into_owned()
}

/// Per-character interval for a nominal speed. Typing runs at twice the
/// nominal rate to offset the time spent in pauses.
pub fn effective_interval(speed: u32) -> u32 {
    (f64::from(speed) / 2.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_each_pause_kind() {
        let p = PauseCfg::default();
        assert_eq!(
            insert_pauses("Wait. Then, maybe: go; now!  Done", &p),
            "Wait.^400 Then,^200 maybe:^150 go;^150 now!^400 Done"
        );
    }

    #[test]
    fn trailing_and_unspaced_punctuation_untouched() {
        let p = PauseCfg::default();
        assert_eq!(insert_pauses("3.14,2 ok.", &p), "3.14,2 ok.");
        assert_eq!(insert_pauses("Hello ", &p), "Hello ");
    }

    #[test]
    fn custom_pause_lengths() {
        let p = PauseCfg {
            sentence: 10,
            comma: 5,
            clause: 1,
        };
        assert_eq!(insert_pauses("a, b. c: d", &p), "a,^5 b.^10 c:^1 d");
    }

    #[test]
    fn escapes_after_pausing() {
        let p = PauseCfg::default();
        assert_eq!(process_text("a < b; c & d", &p), "a &lt; b;^150 c &amp; d");
    }

    #[test]
    fn interval_is_half_speed_rounded() {
        assert_eq!(effective_interval(40), 20);
        assert_eq!(effective_interval(45), 23);
        assert_eq!(effective_interval(1), 1);
        assert_eq!(effective_interval(0), 0);
    }
}
