//! Find-next / replace-span helpers shared by every rewriting pass.
//!
//! Passes walk the text with a byte pointer. After a replacement the pointer
//! either goes back to the start of the replacement (so its content gets
//! rescanned) or moves to the end of the replacement. It must never move by
//! the length of the original match, which is stale once the text changed.

use regex::{Captures, Match, Regex};

/// First match of `pattern` at or after `offset`.
pub fn find_next<'t>(text: &'t str, offset: usize, pattern: &Regex) -> Option<Match<'t>> {
    if offset > text.len() {
        return None;
    }
    pattern.find_at(text, offset)
}

/// Like [`find_next`], keeping the capture groups.
pub fn captures_next<'t>(text: &'t str, offset: usize, pattern: &Regex) -> Option<Captures<'t>> {
    if offset > text.len() {
        return None;
    }
    pattern.captures_at(text, offset)
}

/// Splice `replacement` over `text[start..end]`.
///
/// Returns the new text together with the end offset of the replacement in
/// it.
pub fn replace_span(text: &str, start: usize, end: usize, replacement: &str) -> (String, usize) {
    let mut result = String::with_capacity(text.len() - (end - start) + replacement.len());
    result.push_str(&text[..start]);
    result.push_str(replacement);
    result.push_str(&text[end..]);
    (result, start + replacement.len())
}

/// `[text](<path#section>)`, the canonical link form. The section part is
/// omitted when empty.
pub fn format_markdown_link(text: &str, path: &str, section: &str) -> String {
    if section.is_empty() {
        format!("[{}](<{}>)", text, path)
    } else {
        format!("[{}](<{}#{}>)", text, path, section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_next_respects_offset() {
        let re = Regex::new(r"\$\{\w+\}").unwrap();
        let text = "${a} and ${b}";
        let first = find_next(text, 0, &re).unwrap();
        assert_eq!((first.start(), first.end()), (0, 4));
        let second = find_next(text, first.end(), &re).unwrap();
        assert_eq!(second.as_str(), "${b}");
        assert!(find_next(text, second.end(), &re).is_none());
        assert!(find_next(text, text.len() + 1, &re).is_none());
    }

    #[test]
    fn test_captures_next_keeps_groups() {
        let re = Regex::new(r"\$\{(\w+)\}").unwrap();
        let caps = captures_next("x ${name} y", 1, &re).unwrap();
        assert_eq!(&caps[1], "name");
        assert_eq!(caps.get(0).unwrap().start(), 2);
    }

    #[test]
    fn test_replace_span_shorter() {
        let (text, end) = replace_span("abc${long}def", 3, 10, "x");
        assert_eq!(text, "abcxdef");
        assert_eq!(end, 4);
        assert_eq!(&text[end..], "def");
    }

    #[test]
    fn test_replace_span_longer() {
        let (text, end) = replace_span("a${b}c", 1, 5, "<replacement>");
        assert_eq!(text, "a<replacement>c");
        assert_eq!(&text[end..], "c");
    }

    #[test]
    fn test_format_markdown_link() {
        assert_eq!(format_markdown_link("x", "a/b.md", ""), "[x](<a/b.md>)");
        assert_eq!(
            format_markdown_link("x", "a/b.md", "Sub Section"),
            "[x](<a/b.md#Sub Section>)"
        );
        assert_eq!(
            format_markdown_link("Section 1", "", "Section 1"),
            "[Section 1](<#Section 1>)"
        );
    }
}
