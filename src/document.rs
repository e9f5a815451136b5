//! In-memory representation of one documentation file.

use std::path::{Path, PathBuf};

use similar::{ChangeTag, TextDiff};

/// Number of unchanged lines shown around each change by [`Document::changes`].
pub const N_CONTEXT_LINES_IN_DIFF: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Where the document was loaded from. This is its key in the document set.
    pub input_path: PathBuf,
    /// Where the document will be saved. Only renaming rules change this.
    pub target_path: PathBuf,
    /// The working text that rules rewrite.
    pub contents: String,
    original_contents: String,
}

impl Document {
    pub fn new(input_path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let input_path = input_path.into();
        let contents = contents.into();
        Self {
            target_path: input_path.clone(),
            input_path,
            original_contents: contents.clone(),
            contents,
        }
    }

    /// The text as it was when the document was loaded.
    pub fn original_contents(&self) -> &str {
        &self.original_contents
    }

    pub fn unchanged(&self) -> bool {
        self.original_contents == self.contents
    }

    pub fn is_markdown(&self) -> bool {
        is_markdown_path(&self.input_path)
    }

    /// Name of the directory the document lives in.
    pub fn parent_dir_name(&self) -> Option<&str> {
        self.input_path
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
    }

    /// Describe how the current contents differ from the original ones.
    ///
    /// Lines are prefixed with `-`, `+` or a space, the way a unified diff
    /// shows them, but without file or hunk headers. Returns an empty string
    /// when the document is unchanged.
    pub fn changes(&self, n_context_lines: usize) -> String {
        if self.unchanged() {
            return String::new();
        }

        let old: Vec<&str> = self.original_contents.split('\n').collect();
        let new: Vec<&str> = self.contents.split('\n').collect();
        let diff = TextDiff::from_slices(&old, &new);

        let mut result = String::new();
        for group in diff.grouped_ops(n_context_lines) {
            for op in group {
                for change in diff.iter_changes(&op) {
                    let sign = match change.tag() {
                        ChangeTag::Delete => '-',
                        ChangeTag::Insert => '+',
                        ChangeTag::Equal => ' ',
                    };
                    result.push(sign);
                    result.push_str(change.value());
                    result.push('\n');
                }
            }
        }
        result
    }
}

/// Level and text of a markdown heading line, `## Text` giving `(2, "Text")`.
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    if !line.starts_with('#') {
        return None;
    }
    let text = line.trim_start_matches('#');
    let level = line.len() - text.len();
    Some((level, text.trim()))
}

pub fn headings(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents.lines().filter_map(parse_heading)
}

pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}
