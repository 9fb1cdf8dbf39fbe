// User input sanitization
//
// Free text from clients is stored and echoed back to other users, so all
// markup is stripped. Script and style blocks lose their content as well.

use regex::Regex;
use std::sync::OnceLock;

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>")
            .expect("valid block regex")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"))
}

/// Strip every HTML tag from `input` and trim surrounding whitespace.
pub fn sanitize_input(input: &str) -> String {
    let without_blocks = block_pattern().replace_all(input, "");
    let without_tags = tag_pattern().replace_all(&without_blocks, "");
    without_tags.trim().to_string()
}

/// Sanitize an optional field, mapping absent values to an empty string.
pub fn sanitize_optional(input: Option<&str>) -> String {
    input.map(sanitize_input).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(sanitize_input("  hello there \n"), "hello there");
    }

    #[test]
    fn test_tags_are_removed() {
        assert_eq!(
            sanitize_input(r#"<a href="x" onclick="evil()">click</a> me"#),
            "click me"
        );
    }

    #[test]
    fn test_script_content_is_removed() {
        assert_eq!(
            sanitize_input("hi<script>alert('x')</script> there"),
            "hi there"
        );
        assert_eq!(sanitize_input("<STYLE>p{}</STYLE>ok"), "ok");
    }

    #[test]
    fn test_optional() {
        assert_eq!(sanitize_optional(None), "");
        assert_eq!(sanitize_optional(Some("<i>x</i>")), "x");
    }
}
