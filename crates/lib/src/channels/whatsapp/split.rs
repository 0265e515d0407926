//! Split long replies into provider-sized text messages.
//!
//! A triple newline is a hard break between messages. Inside a paragraph, literal `\n`
//! escapes become real newlines and the lines are grouped `threshold` at a time.

/// Lines per outbound text message used by the formatter.
pub const DEFAULT_LINE_THRESHOLD: usize = 75;

const PARAGRAPH_BREAK: &str = "\n\n\n";

/// Split `text` into ordered message chunks of at most `threshold` lines each.
/// A threshold of 0 is treated as 1.
pub fn split_text_message(text: &str, threshold: usize) -> Vec<String> {
    let threshold = threshold.max(1);
    let mut messages = Vec::new();
    for paragraph in text.trim().split(PARAGRAPH_BREAK) {
        let paragraph = paragraph.replace("\\n", "\n");
        let lines: Vec<&str> = paragraph.split('\n').collect();
        for chunk in lines.chunks(threshold) {
            messages.push(chunk.join("\n"));
        }
    }
    messages
}

/// Split off a leading preamble at the last triple newline: `(Some(preamble), rest)`.
pub fn split_preamble(text: &str) -> (Option<&str>, &str) {
    match text.rsplit_once(PARAGRAPH_BREAK) {
        Some((head, tail)) => (Some(head), tail),
        None => (None, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_newline_separates_messages() {
        assert_eq!(
            split_text_message("para1\n\n\npara2", DEFAULT_LINE_THRESHOLD),
            vec!["para1", "para2"]
        );
    }

    #[test]
    fn double_newline_stays_in_one_message() {
        assert_eq!(split_text_message("a\n\nb", 75), vec!["a\n\nb"]);
    }

    #[test]
    fn escaped_newlines_are_unescaped() {
        assert_eq!(split_text_message("one\\ntwo\\nthree", 2), vec!["one\ntwo", "three"]);
    }

    #[test]
    fn every_chunk_respects_threshold_and_order() {
        let text: Vec<String> = (0..10).map(|i| format!("line{}", i)).collect();
        let text = text.join("\n");
        let chunks = split_text_message(&text, 3);
        assert_eq!(chunks.len(), 4);
        for c in &chunks {
            assert!(c.split('\n').count() <= 3);
        }
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn non_empty_input_yields_output() {
        assert_eq!(split_text_message("x", 75), vec!["x"]);
        assert_eq!(split_text_message("  padded  ", 75), vec!["padded"]);
        assert_eq!(split_text_message("x", 0), vec!["x"]);
    }

    #[test]
    fn preamble_split_uses_last_break() {
        assert_eq!(split_preamble("a\n\n\nb\n\n\nc"), (Some("a\n\n\nb"), "c"));
        assert_eq!(split_preamble("just body"), (None, "just body"));
    }
}
