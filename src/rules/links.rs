//! Rewrites links between documents of the set into the canonical
//! `[text](<relative/path#Section>)` form.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use log::debug;
use regex::{Captures, Regex};

use crate::diagnostics::Diagnostic;
use crate::document::{headings, Document};
use crate::matching::normalize_path;
use crate::processing::ProcessingContext;
use crate::rules::DocumentTransform;
use crate::scanner::{captures_next, format_markdown_link, replace_span};

lazy_static::lazy_static! {
    static ref LINK_WITH_SUBSECTION: Regex =
        Regex::new(r"\[([^\]]*)\]\(<?([^()<>#]*)#([^()<>]*)>?\)").unwrap();
    static ref LINK: Regex = Regex::new(r"\[([^\]]*)\]\(<?([^()<>#]*)>?\)").unwrap();
}

/// Folds `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn percent_decode(text: &str) -> Cow<'_, str> {
    urlencoding::decode(text).unwrap_or(Cow::Borrowed(text))
}

/// Lower-cased, decoded, with `-` read as a space.
fn normalize_section(section: &str) -> String {
    percent_decode(section.trim())
        .to_lowercase()
        .replace('-', " ")
}

/// The exact heading of `contents` that `section` refers to.
pub fn find_heading<'a>(contents: &'a str, section: &str) -> Option<&'a str> {
    let wanted = normalize_section(section);
    headings(contents)
        .map(|(_, heading)| heading)
        .find(|heading| normalize_section(heading) == wanted)
}

/// Whether an unresolved link target was meant to point into the set.
fn looks_internal(target: &str) -> bool {
    !target.trim().is_empty() && !target.contains("://") && !target.starts_with("mailto:")
}

struct LinkMatch<'t> {
    caps: Captures<'t>,
    has_subsection: bool,
}

/// The earliest link at or after `pos`; the subsection form wins a tie.
fn next_link(text: &str, pos: usize) -> Option<LinkMatch<'_>> {
    let with_subsection = captures_next(text, pos, &LINK_WITH_SUBSECTION);
    let plain = captures_next(text, pos, &LINK);

    match (with_subsection, plain) {
        (Some(a), Some(b)) => {
            let a_start = a.get(0).map_or(usize::MAX, |m| m.start());
            let b_start = b.get(0).map_or(usize::MAX, |m| m.start());
            if a_start <= b_start {
                Some(LinkMatch { caps: a, has_subsection: true })
            } else {
                Some(LinkMatch { caps: b, has_subsection: false })
            }
        }
        (Some(a), None) => Some(LinkMatch { caps: a, has_subsection: true }),
        (None, Some(b)) => Some(LinkMatch { caps: b, has_subsection: false }),
        (None, None) => None,
    }
}

/// Finds the document a link target refers to: first relative to the
/// linking document, then relative to the root.
fn resolve_target(context: &ProcessingContext, document: &Document, target: &str) -> Option<PathBuf> {
    let source_dir = document.input_path.parent().unwrap_or_else(|| Path::new(""));
    let candidates = [
        source_dir.join(target),
        context.settings().root_dir.join(target.trim_start_matches('/')),
    ];
    candidates
        .iter()
        .map(|candidate| normalize_lexically(candidate))
        .find(|candidate| *candidate == document.input_path || context.contains(candidate))
}

/// Canonical replacement for one link, or `None` when it cannot be resolved.
fn canonical_link(
    context: &ProcessingContext,
    document: &Document,
    text: &str,
    target: &str,
    section: Option<&str>,
) -> Option<String> {
    let target = percent_decode(target.trim());
    if target.is_empty() {
        return None;
    }
    let linked_path = resolve_target(context, document, &target)?;

    let source_dir = document.target_path.parent().unwrap_or_else(|| Path::new(""));
    let (relative, heading) = if linked_path == document.input_path {
        let relative = pathdiff::diff_paths(&document.target_path, source_dir)?;
        let heading = section.and_then(|s| find_heading(&document.contents, s).map(str::to_string));
        (relative, heading)
    } else {
        let linked = context.get_document(&linked_path)?;
        let relative = pathdiff::diff_paths(&linked.target_path, source_dir)?;
        let heading = section.and_then(|s| find_heading(&linked.contents, s).map(str::to_string));
        (relative, heading)
    };

    let section = match (heading, section) {
        (Some(heading), _) => heading,
        (None, Some(given)) => percent_decode(given).into_owned(),
        (None, None) => String::new(),
    };
    Some(format_markdown_link(text, &normalize_path(&relative), &section))
}

/// Rewrites `contents` of `document`, returning the new text.
pub fn sanitize_links(context: &ProcessingContext, document: &Document) -> String {
    let mut text = document.contents.clone();
    let mut pos = 0;

    while let Some(found) = next_link(&text, pos) {
        let Some(whole) = found.caps.get(0) else { break };
        let (start, end) = (whole.start(), whole.end());
        let token = whole.as_str().to_string();
        let link_text = found.caps[1].to_string();
        let target = found.caps[2].to_string();
        let section = found.has_subsection.then(|| found.caps[3].to_string());
        let is_image = text[..start].ends_with('!');

        match canonical_link(context, document, &link_text, &target, section.as_deref()) {
            Some(replacement) => {
                let (replaced, replacement_end) = replace_span(&text, start, end, &replacement);
                text = replaced;
                pos = replacement_end;
            }
            None => {
                if looks_internal(&target) && !is_image {
                    context
                        .diagnostics()
                        .report(Diagnostic::broken_link(&document.input_path, &token));
                }
                pos = end;
            }
        }
    }
    text
}

/// Canonicalises markdown links to other documents of the set.
pub struct SanitizeLinks;

impl DocumentTransform for SanitizeLinks {
    fn name(&self) -> &str {
        "sanitize_links"
    }

    fn apply(&self, context: &ProcessingContext, document: &mut Document) {
        if !document.is_markdown() {
            return;
        }
        debug!("Sanitizing links in {}", document.input_path.display());
        document.contents = sanitize_links(context, document);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::processing::ProcessingSettings;

    const ROOT: &str = "/docs";

    fn context(docs: &[(&str, &str)]) -> ProcessingContext {
        let settings = ProcessingSettings::new(ROOT, ROOT);
        let mut context = ProcessingContext::new(settings);
        for (path, contents) in docs {
            context
                .add_document(Document::new(Path::new(ROOT).join(path), *contents))
                .unwrap();
        }
        context
    }

    fn sanitize(context: &ProcessingContext, path: &str) -> String {
        let doc = context.get_document(&Path::new(ROOT).join(path)).unwrap().clone();
        sanitize_links(context, &doc)
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/docs/a/../b/./c.md")),
            PathBuf::from("/docs/b/c.md")
        );
    }

    #[test]
    fn test_link_forms_are_canonicalised_identically() {
        let ctx = context(&[
            ("a b.md", "# Title"),
            ("one.md", "[x](<a b.md>)"),
            ("two.md", "[x](a%20b.md)"),
            ("three.md", "[x](<a%20b.md>)"),
        ]);
        let expected = "[x](<a b.md>)";
        assert_eq!(sanitize(&ctx, "one.md"), expected);
        assert_eq!(sanitize(&ctx, "two.md"), expected);
        assert_eq!(sanitize(&ctx, "three.md"), expected);
    }

    #[test]
    fn test_subsection_uses_exact_heading() {
        let ctx = context(&[
            ("guide/setup.md", "# Setup\n## Sub Section\ntext"),
            ("index.md", "See [setup](guide/setup.md#sub-section)."),
        ]);
        assert_eq!(
            sanitize(&ctx, "index.md"),
            "See [setup](<guide/setup.md#Sub Section>)."
        );
    }

    #[test]
    fn test_unknown_subsection_kept() {
        let ctx = context(&[
            ("setup.md", "# Setup"),
            ("index.md", "[setup](setup.md#Nowhere)"),
        ]);
        assert_eq!(sanitize(&ctx, "index.md"), "[setup](<setup.md#Nowhere>)");
    }

    #[test]
    fn test_root_relative_link() {
        let ctx = context(&[
            ("guide/setup.md", "# Setup"),
            ("api/index.md", "[setup](guide/setup.md)"),
        ]);
        assert_eq!(sanitize(&ctx, "api/index.md"), "[setup](<../guide/setup.md>)");
    }

    #[test]
    fn test_back_to_back_links() {
        let ctx = context(&[
            ("a.md", "# A"),
            ("b.md", "# B"),
            ("index.md", "[a](a%2Emd)[b](<b.md>) [a](./a.md#a)"),
        ]);
        assert_eq!(
            sanitize(&ctx, "index.md"),
            "[a](<a.md>)[b](<b.md>) [a](<a.md#A>)"
        );
    }

    #[test]
    fn test_plain_link_before_subsection_link() {
        let ctx = context(&[
            ("a.md", "## Part"),
            ("index.md", "[first](a.md) then [second](a.md#part)"),
        ]);
        assert_eq!(
            sanitize(&ctx, "index.md"),
            "[first](<a.md>) then [second](<a.md#Part>)"
        );
    }

    #[test]
    fn test_self_link() {
        let ctx = context(&[("index.md", "# Top Part\n[up](index.md#top-part)")]);
        assert_eq!(
            sanitize(&ctx, "index.md"),
            "# Top Part\n[up](<index.md#Top Part>)"
        );
    }

    #[test]
    fn test_broken_and_external_links() {
        let ctx = context(&[(
            "index.md",
            "[gone](missing.md) [web](https://example.com) [mail](mailto:a@b.c) ![img](pic.png)",
        )]);
        let out = sanitize(&ctx, "index.md");
        assert_eq!(
            out,
            "[gone](missing.md) [web](https://example.com) [mail](mailto:a@b.c) ![img](pic.png)"
        );
        let broken = ctx.diagnostics().of_kind(DiagnosticKind::BrokenLink);
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].token, "[gone](missing.md)");
    }

    #[test]
    fn test_link_follows_renamed_target() {
        let mut ctx = context(&[("index.md", "[a](sub/a.md)")]);
        let mut target = Document::new("/docs/sub/a.md", "# A");
        target.target_path = PathBuf::from("/docs/v1/sub/v1 - sub - a.md");
        ctx.add_document(target).unwrap();
        assert_eq!(sanitize(&ctx, "index.md"), "[a](<v1/sub/v1 - sub - a.md>)");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let ctx = context(&[
            ("a b.md", "## Some Part"),
            ("index.md", "[x](a%20b.md#some-part) [y](<a b.md>)"),
        ]);
        let once = sanitize(&ctx, "index.md");
        let ctx = context(&[("a b.md", "## Some Part"), ("index.md", once.as_str())]);
        assert_eq!(sanitize(&ctx, "index.md"), once);
    }
}
