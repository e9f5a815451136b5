//! Generates a table of contents in place of `${create_table_of_contents}`.

use log::debug;

use crate::document::{parse_heading, Document};
use crate::processing::ProcessingContext;
use crate::rules::DocumentTransform;
use crate::scanner::format_markdown_link;

pub const TOC_PLACEHOLDER: &str = "${create_table_of_contents}";

/// Bullet list of the headings in `lines`, indented by depth.
fn table_of_contents(lines: &[&str]) -> String {
    let entries: Vec<(usize, &str)> = lines
        .iter()
        .filter_map(|line| parse_heading(line))
        .filter(|(_, text)| !text.is_empty())
        .map(|(level, text)| (2 * (level - 1), text))
        .collect();
    let min_indent = entries.iter().map(|(indent, _)| *indent).min().unwrap_or(0);

    entries
        .iter()
        .map(|(indent, text)| {
            format!(
                "{} - {}",
                " ".repeat(indent - min_indent),
                format_markdown_link(text, "", text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces each placeholder with the table of contents of the headings
/// following it.
pub fn create_table_of_contents(contents: &str) -> String {
    if !contents.contains(TOC_PLACEHOLDER) {
        return contents.to_string();
    }
    let lines: Vec<&str> = contents.split('\n').collect();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if line.contains(TOC_PLACEHOLDER) {
                line.replace(TOC_PLACEHOLDER, &table_of_contents(&lines[i + 1..]))
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct CreateTableOfContents;

impl DocumentTransform for CreateTableOfContents {
    fn name(&self) -> &str {
        "create_table_of_contents"
    }

    fn apply(&self, _context: &ProcessingContext, document: &mut Document) {
        if !document.is_markdown() || !document.contents.contains(TOC_PLACEHOLDER) {
            return;
        }
        debug!("Creating table of contents for {}", document.input_path.display());
        document.contents = create_table_of_contents(&document.contents);
    }
}
