//! Field-length limits for outbound interactive payloads and trimming against them.
//!
//! Paths are dotted `"<payload kind>.<field path>"`, e.g. `"interactive_list.sections.rows.title"`.
//! Lengths are counted in characters, not bytes.

const ELLIPSIS: &str = "...";

/// Max characters per payload field, as enforced by the Cloud API.
const PAYLOAD_SCHEMA: &[(&str, usize)] = &[
    ("interactive_list.header_text", 60),
    ("interactive_list.body_text", 1024),
    ("interactive_list.footer_text", 60),
    ("interactive_list.button_cta", 20),
    ("interactive_list.sections.title", 24),
    ("interactive_list.sections.rows.title", 24),
    ("interactive_list.sections.rows.description", 72),
    ("quick_reply.header_text", 60),
    ("quick_reply.body_text", 1024),
    ("quick_reply.footer_text", 60),
    ("quick_reply.buttons.title", 20),
];

/// Look up the limit for a schema path.
pub fn max_chars(path: &str) -> Option<usize> {
    PAYLOAD_SCHEMA
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, max)| *max)
}

/// Trim `value` to the limit at `path`: over-long values keep `limit - 3` characters plus "...".
/// Unknown paths leave the value untouched.
pub fn safely_trim(value: &str, path: &str) -> String {
    let Some(max) = max_chars(path) else {
        log::debug!("no length limit for schema path {}, keeping value as is", path);
        return value.to_string();
    };
    if value.chars().count() <= max {
        return value.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = value.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// [`safely_trim`] for optional fields; `None` stays `None`.
pub fn safely_trim_opt(value: Option<&str>, path: &str) -> Option<String> {
    value.map(|v| safely_trim(v, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_limits() {
        assert_eq!(max_chars("interactive_list.header_text"), Some(60));
        assert_eq!(max_chars("interactive_list.sections.rows.description"), Some(72));
        assert_eq!(max_chars("quick_reply.buttons.title"), Some(20));
        assert_eq!(max_chars("interactive_list.sections.rows.id"), None);
    }

    #[test]
    fn short_values_unchanged() {
        assert_eq!(safely_trim("Pick one", "interactive_list.button_cta"), "Pick one");
        let exact = "x".repeat(20);
        assert_eq!(safely_trim(&exact, "interactive_list.button_cta"), exact);
    }

    #[test]
    fn long_row_description_is_cut_to_limit_with_ellipsis() {
        let desc = "d".repeat(80);
        let trimmed = safely_trim(&desc, "interactive_list.sections.rows.description");
        assert_eq!(trimmed.chars().count(), 72);
        assert!(trimmed.ends_with("..."));
        assert_eq!(&trimmed[..69], &desc[..69]);
    }

    #[test]
    fn trimming_is_idempotent_and_bounded() {
        let inputs = vec![
            String::new(),
            "short".to_string(),
            "y".repeat(25),
            "z".repeat(2000),
        ];
        for path in ["quick_reply.buttons.title", "quick_reply.body_text", "interactive_list.sections.title"] {
            let limit = max_chars(path).unwrap();
            for v in &inputs {
                let once = safely_trim(v, path);
                assert!(once.chars().count() <= limit);
                assert_eq!(safely_trim(&once, path), once);
            }
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        let title = "ñ".repeat(30);
        let trimmed = safely_trim(&title, "quick_reply.buttons.title");
        assert_eq!(trimmed.chars().count(), 20);
        assert!(trimmed.starts_with(&"ñ".repeat(17)));
    }

    #[test]
    fn unknown_path_keeps_value() {
        let v = "q".repeat(500);
        assert_eq!(safely_trim(&v, "template.name"), v);
        assert_eq!(safely_trim_opt(None, "quick_reply.header_text"), None);
    }
}
