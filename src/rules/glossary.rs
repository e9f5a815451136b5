//! Links the first mention of each glossary term to its glossary entry.

use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;

use crate::diagnostics::Diagnostic;
use crate::document::{parse_heading, Document};
use crate::matching::normalize_path;
use crate::processing::{matches_short_name, ProcessingContext};
use crate::rules::DocumentTransform;
use crate::scanner::{find_next, format_markdown_link, replace_span};

/// Short name the glossary document is looked up by.
pub const GLOSSARY_NAME: &str = "glossary.md";

lazy_static::lazy_static! {
    static ref SYNONYMS: Regex = Regex::new(r"(?i)^[*_]*synonyms:\s*(.+?)[*_]*$").unwrap();
    static ref EXISTING_LINK: Regex = Regex::new(r"\[[^\]]*\]\([^)]*\)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    /// Lower-cased term or synonym.
    pub term: String,
    /// Heading of the glossary section defining the term.
    pub section: String,
}

/// Builds the glossary table: `##` headings are terms, and a
/// `Synonyms: a, b` line right after a heading adds synonyms for it.
///
/// The result is ordered longest term first, so longer terms get linked
/// before the shorter terms they contain.
pub fn process_glossary(text: &str) -> Vec<GlossaryEntry> {
    let lines: Vec<&str> = text.lines().collect();
    let mut terms: IndexMap<String, String> = IndexMap::new();

    for (i, line) in lines.iter().enumerate() {
        let Some((level, heading)) = parse_heading(line) else {
            continue;
        };
        if level < 2 || heading.is_empty() {
            continue;
        }
        terms
            .entry(heading.to_lowercase())
            .or_insert_with(|| heading.to_string());

        let next = lines[i + 1..]
            .iter()
            .map(|line| line.trim())
            .find(|line| !line.is_empty());
        let Some(next) = next.filter(|line| !line.starts_with('#')) else {
            continue;
        };
        if let Some(caps) = SYNONYMS.captures(next) {
            for synonym in caps[1].split(',') {
                let synonym = synonym.trim().trim_matches(|c| c == '*' || c == '_').trim();
                if !synonym.is_empty() {
                    terms
                        .entry(synonym.to_lowercase())
                        .or_insert_with(|| heading.to_string());
                }
            }
        }
    }

    let mut entries: Vec<GlossaryEntry> = terms
        .into_iter()
        .map(|(term, section)| GlossaryEntry { term, section })
        .collect();
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.term.chars().count()));
    entries
}

fn term_pattern(term: &str) -> Option<Regex> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::from("(?i)");
    if term.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(term));
    if term.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    Regex::new(&pattern).ok()
}

/// Links the first free occurrence of every entry in `contents`.
///
/// An occurrence inside an existing markdown link is not free. A term whose
/// link is already present is left alone.
pub fn link_glossary_terms(contents: &str, entries: &[GlossaryEntry], glossary_path: &str) -> String {
    let mut text = contents.to_string();

    for entry in entries {
        let existing = format_markdown_link(&entry.term, glossary_path, &entry.section).to_lowercase();
        if text.to_lowercase().contains(&existing) {
            continue;
        }
        let Some(pattern) = term_pattern(&entry.term) else {
            continue;
        };
        let links: Vec<(usize, usize)> = EXISTING_LINK
            .find_iter(&text)
            .map(|m| (m.start(), m.end()))
            .collect();

        let mut pos = 0;
        while let Some(found) = find_next(&text, pos, &pattern) {
            let (start, end) = (found.start(), found.end());
            if let Some(&(_, link_end)) = links.iter().find(|(s, e)| start < *e && end > *s) {
                pos = link_end;
                continue;
            }
            let link = format_markdown_link(found.as_str(), glossary_path, &entry.section);
            let (replaced, _) = replace_span(&text, start, end, &link);
            text = replaced;
            break;
        }
    }
    text
}

/// Links glossary terms to the document named [`GLOSSARY_NAME`].
pub struct GlossaryLink;

impl DocumentTransform for GlossaryLink {
    fn name(&self) -> &str {
        "glossary_link"
    }

    fn apply(&self, context: &ProcessingContext, document: &mut Document) {
        if !document.is_markdown()
            || matches_short_name(&document.input_path, GLOSSARY_NAME)
            || matches_short_name(&document.target_path, GLOSSARY_NAME)
        {
            return;
        }

        let (entries, glossary_path) = {
            let Some(glossary) = context.get_document_by_name(GLOSSARY_NAME) else {
                context
                    .diagnostics()
                    .report(Diagnostic::missing_glossary(&document.input_path, GLOSSARY_NAME));
                return;
            };
            let source_dir = document.target_path.parent().unwrap_or_else(|| Path::new(""));
            let Some(relative) = pathdiff::diff_paths(&glossary.target_path, source_dir) else {
                return;
            };
            (process_glossary(glossary.original_contents()), normalize_path(&relative))
        };

        debug!(
            "Linking {} glossary terms in {}",
            entries.len(),
            document.input_path.display()
        );
        document.contents = link_glossary_terms(&document.contents, &entries, &glossary_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOSSARY_TEXT: &str = "# Glossary

## Test Term
Synonyms: Example Term, Trial Word

A term used in tests.

## Example

*Synonyms: Demonstration, Demo*

## Synonyms: something, something else
";

    fn entry(term: &str, section: &str) -> GlossaryEntry {
        GlossaryEntry {
            term: term.to_string(),
            section: section.to_string(),
        }
    }

    #[test]
    fn test_process_glossary() {
        assert_eq!(
            process_glossary(GLOSSARY_TEXT),
            vec![
                entry(
                    "synonyms: something, something else",
                    "Synonyms: something, something else"
                ),
                entry("demonstration", "Example"),
                entry("example term", "Test Term"),
                entry("trial word", "Test Term"),
                entry("test term", "Test Term"),
                entry("example", "Example"),
                entry("demo", "Example"),
            ]
        );
    }

    #[test]
    fn test_duplicate_terms_first_wins() {
        let entries = process_glossary("## Alpha\nSynonyms: beta\n\n## Beta\n");
        assert_eq!(entries, vec![entry("alpha", "Alpha"), entry("beta", "Alpha")]);
    }

    #[test]
    fn test_links_first_occurrence_keeping_case() {
        let entries = process_glossary(GLOSSARY_TEXT);
        let out = link_glossary_terms(
            "Here is an Example Term as an Example.",
            &entries,
            "../glossary data/glossary.md",
        );
        assert_eq!(
            out,
            "Here is an [Example Term](<../glossary data/glossary.md#Test Term>) \
             as an [Example](<../glossary data/glossary.md#Example>)."
        );
    }

    #[test]
    fn test_only_first_free_occurrence_is_linked() {
        let entries = vec![entry("example", "Example")];
        let out = link_glossary_terms(
            "[An example](other.md) example and example.",
            &entries,
            "glossary.md",
        );
        assert_eq!(
            out,
            "[An example](other.md) [example](<glossary.md#Example>) and example."
        );
    }

    #[test]
    fn test_whole_words_only() {
        let entries = vec![entry("demo", "Example")];
        let out = link_glossary_terms("A demolition demo.", &entries, "glossary.md");
        assert_eq!(out, "A demolition [demo](<glossary.md#Example>).");
    }

    #[test]
    fn test_linking_is_idempotent() {
        let entries = process_glossary(GLOSSARY_TEXT);
        let once = link_glossary_terms("An example and a demo.", &entries, "glossary.md");
        let twice = link_glossary_terms(&once, &entries, "glossary.md");
        assert_eq!(once, twice);
        assert_eq!(
            once,
            "An [example](<glossary.md#Example>) and a [demo](<glossary.md#Example>)."
        );
    }

    #[test]
    fn test_page_ending_in_glossary_is_still_linked() {
        use crate::processing::ProcessingSettings;
        use crate::rules::{DocumentRule, Pass, ALL_FILES};

        let settings = ProcessingSettings::new("/docs", "/docs").with_rules(vec![DocumentRule::new(
            GlossaryLink,
            ALL_FILES,
            Pass::LinkUpdating,
        )]);
        let mut context = ProcessingContext::new(settings);
        context.add_document(Document::new("/docs/glossary.md", "## Example\n")).unwrap();
        context
            .add_document(Document::new("/docs/Project - Glossary.md", "An example."))
            .unwrap();
        context.run().unwrap();

        let page = context.get_document(Path::new("/docs/Project - Glossary.md")).unwrap();
        assert_eq!(page.contents, "An [example](<glossary.md#Example>).");
        assert!(context.diagnostics().is_empty());
    }
}
