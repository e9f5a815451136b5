//! Glob-style pattern matching for rule file filters and input discovery.
//!
//! Patterns are translated to anchored regexes:
//! - `**` matches any files and zero or more directories and subdirectories
//! - `*` matches everything except a directory separator
//! - `?` matches any single character except a directory separator
//! - `[seq]` matches any character in seq, `[!seq]` any character not in seq

use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use walkdir::WalkDir;

use crate::error::{DocError, Result};

lazy_static::lazy_static! {
    /// Cache for compiled regex patterns
    static ref PATTERN_CACHE: Mutex<HashMap<String, Regex>> = Mutex::new(HashMap::new());
}

/// Patterns skipped when discovering the documents of an input tree.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[".*", ".*/**", "**/.*", "**/.*/**"];

/// Translates shell-style glob pattern to regex pattern.
pub fn translate_pattern(pattern: &str) -> String {
    let mut regex_pattern = String::new();
    let mut i = 0;
    let chars: Vec<char> = pattern.chars().collect();
    let n = chars.len();

    while i < n {
        let c = chars[i];
        match c {
            '*' => {
                if i + 1 < n && chars[i + 1] == '*' {
                    if i + 2 < n && chars[i + 2] == '/' {
                        // **/
                        regex_pattern.push_str("(?:[^/]+/)*");
                        i += 3;
                    } else {
                        regex_pattern.push_str(".*");
                        i += 2;
                    }
                } else {
                    regex_pattern.push_str("[^/]*");
                    i += 1;
                }
            }
            '?' => {
                regex_pattern.push_str("[^/]");
                i += 1;
            }
            '[' => {
                let mut j = i + 1;
                if j < n && (chars[j] == '!' || chars[j] == '^') {
                    j += 1;
                }
                if j < n && chars[j] == ']' {
                    j += 1;
                }
                while j < n && chars[j] != ']' {
                    j += 1;
                }
                if j >= n {
                    // No closing ], treat [ as literal
                    regex_pattern.push_str("\\[");
                    i += 1;
                } else {
                    let mut class_content = String::new();
                    let mut k = i + 1;

                    if k < n && (chars[k] == '!' || chars[k] == '^') {
                        class_content.push('^');
                        k += 1;
                    }

                    while k < j {
                        let ch = chars[k];
                        if ch == '\\' && k + 1 < j {
                            class_content.push('\\');
                            class_content.push(chars[k + 1]);
                            k += 2;
                        } else {
                            class_content.push(ch);
                            k += 1;
                        }
                    }

                    regex_pattern.push('[');
                    regex_pattern.push_str(&class_content);
                    regex_pattern.push(']');
                    i = j + 1;
                }
            }
            _ => {
                match c {
                    '\\' | '.' | '^' | '$' | '+' | '{' | '}' | '|' | '(' | ')' => {
                        regex_pattern.push('\\');
                        regex_pattern.push(c);
                    }
                    _ => {
                        regex_pattern.push(c);
                    }
                }
                i += 1;
            }
        }
    }

    format!("^{}$", regex_pattern)
}

/// Compiles a pattern into a regex, using cache for performance.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    let mut cache = PATTERN_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }

    let regex = Regex::new(&translate_pattern(pattern)).map_err(|source| {
        DocError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    })?;
    cache.insert(pattern.to_string(), regex.clone());

    Ok(regex)
}

/// Tests if a name matches a glob pattern.
pub fn pattern_match(name: &str, pattern: &str) -> Result<bool> {
    let regex = compile_pattern(pattern)?;
    Ok(regex.is_match(name))
}

/// Normalizes a path to use forward slashes for pattern matching.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Tests a rule file filter against a document.
///
/// A filter without a `/` only looks at the file name, so `*.md` selects
/// markdown files at any depth. A filter with a `/` is matched against the
/// path relative to `root`.
pub fn filter_matches(filter: &str, root: &Path, path: &Path) -> Result<bool> {
    if filter.contains('/') {
        let relative = path.strip_prefix(root).unwrap_or(path);
        pattern_match(&normalize_path(relative), filter)
    } else {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        pattern_match(&name, filter)
    }
}

/// Gets matching files from a directory using include and exclude patterns.
///
/// - Only files matching some pattern in include_patterns are included
/// - Exclusions from exclude_patterns take priority over inclusions
/// - The default include pattern is "**" (all files)
pub fn get_matching_files<P: AsRef<Path>>(
    dirname: P,
    include_patterns: &[String],
    exclude_patterns: &[String],
) -> Result<Vec<PathBuf>> {
    let dirname = dirname.as_ref();
    let include_patterns = if include_patterns.is_empty() {
        vec!["**".to_string()]
    } else {
        include_patterns.to_vec()
    };

    let include_regexes = include_patterns
        .iter()
        .map(|pattern| compile_pattern(pattern))
        .collect::<Result<Vec<_>>>()?;
    let exclude_regexes = exclude_patterns
        .iter()
        .map(|pattern| compile_pattern(pattern))
        .collect::<Result<Vec<_>>>()?;

    let mut matched_files = Vec::new();
    for entry in WalkDir::new(dirname).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dirname).to_path_buf();
            DocError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative_path = path.strip_prefix(dirname).unwrap_or(path);
        let normalized_path = normalize_path(relative_path);

        let included = include_regexes
            .iter()
            .any(|regex| regex.is_match(&normalized_path));
        let excluded = exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&normalized_path));

        if included && !excluded {
            matched_files.push(path.to_path_buf());
        }
    }

    // Sort for consistent results
    matched_files.sort();

    Ok(matched_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern("*.md"), "^[^/]*\\.md$");
        assert_eq!(translate_pattern("**"), "^.*$");
        assert_eq!(translate_pattern("**/index.md"), "^(?:[^/]+/)*index\\.md$");
        assert_eq!(translate_pattern("docs/*.md"), "^docs/[^/]*\\.md$");
        assert_eq!(translate_pattern("[abc].md"), "^[abc]\\.md$");
        assert_eq!(translate_pattern("[!abc].md"), "^[^abc]\\.md$");
    }

    #[test]
    fn test_pattern_match() {
        assert!(pattern_match("index.md", "*.md").unwrap());
        assert!(pattern_match("docs/index.md", "**/*.md").unwrap());
        assert!(!pattern_match("image.png", "*.md").unwrap());
        assert!(pattern_match("image.png", "*.*").unwrap());
        assert!(pattern_match("a.md", "[abc].md").unwrap());
        assert!(!pattern_match("d.md", "[abc].md").unwrap());
    }

    #[test]
    fn test_filter_matches_file_name_at_any_depth() {
        let root = Path::new("/docs");
        assert!(filter_matches("*.md", root, Path::new("/docs/a/b/c.md")).unwrap());
        assert!(!filter_matches("*.md", root, Path::new("/docs/a/image.png")).unwrap());
        assert!(filter_matches("*.*", root, Path::new("/docs/a/image.png")).unwrap());
    }

    #[test]
    fn test_filter_with_directory_uses_relative_path() {
        let root = Path::new("/docs");
        assert!(filter_matches("guides/*.md", root, Path::new("/docs/guides/a.md")).unwrap());
        assert!(!filter_matches("guides/*.md", root, Path::new("/docs/api/a.md")).unwrap());
        assert!(filter_matches("**/api/*.md", root, Path::new("/docs/x/api/a.md")).unwrap());
    }

    #[test]
    fn test_get_matching_files_skips_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();

        fs::create_dir_all(base_path.join("docs")).unwrap();
        fs::create_dir_all(base_path.join(".git")).unwrap();
        fs::write(base_path.join("index.md"), "content").unwrap();
        fs::write(base_path.join("docs/api.md"), "content").unwrap();
        fs::write(base_path.join(".git/config"), "content").unwrap();
        fs::write(base_path.join("docs/.hidden.md"), "content").unwrap();

        let excludes: Vec<String> = DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect();
        let files = get_matching_files(base_path, &[], &excludes).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.file_name().unwrap() == "index.md"));
        assert!(files.iter().any(|p| p.file_name().unwrap() == "api.md"));
    }
}
