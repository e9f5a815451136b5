//! Reading and writing documents and definitions files.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;

use crate::config::{MacroDefinitions, RuleDefinitions};
use crate::document::{is_markdown_path, Document};
use crate::error::{DocError, Result};
use crate::matching::{get_matching_files, DEFAULT_EXCLUDE_PATTERNS};
use crate::rules::{DocumentRule, MacroTable};

pub fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(DocError::NotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return Err(DocError::IsADirectory(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path).map_err(|e| DocError::io(path, e))?;
    Ok(Document::new(path, contents))
}

/// Writes the document to its target path, creating parent directories.
pub fn save_document(document: &Document) -> Result<()> {
    let path = &document.target_path;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DocError::io(parent, e))?;
    }
    debug!("Saving {}", path.display());
    fs::write(path, &document.contents).map_err(|e| DocError::io(path, e))
}

/// Copies a file that is not loaded as a document.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| DocError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| DocError::io(from, e))?;
    Ok(())
}

/// All files under `root`, hidden files and directories excluded.
pub fn discover_documents(root: &Path) -> Result<Vec<PathBuf>> {
    let excludes: Vec<String> = DEFAULT_EXCLUDE_PATTERNS
        .iter()
        .map(|pattern| pattern.to_string())
        .collect();
    get_matching_files(root, &["**".to_string()], &excludes)
}

pub fn load_glossary(path: &Path) -> Result<Document> {
    if !is_markdown_path(path) {
        return Err(DocError::InvalidExtension {
            path: path.to_path_buf(),
            expected: ".md",
        });
    }
    load_document(path)
}

/// Parses a YAML or JSON definitions file.
fn load_definitions<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let document = load_document(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => serde_json::from_str(&document.contents)
            .map_err(|e| DocError::Config(format!("{}: {}", path.display(), e))),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&document.contents)
            .map_err(|e| DocError::Config(format!("{}: {}", path.display(), e))),
        _ => Err(DocError::InvalidExtension {
            path: path.to_path_buf(),
            expected: ".yaml, .yml or .json",
        }),
    }
}

/// Reads constant and template macros from a definitions file.
pub fn load_macros_from_file(path: &Path) -> Result<MacroTable> {
    let definitions: MacroDefinitions = load_definitions(path)?;
    let table = definitions.into_table();
    debug!(
        "Loaded {} constant and {} function macros from {}",
        table.constants.len(),
        table.functions.len(),
        path.display()
    );
    Ok(table)
}

/// Reads regex rules from a definitions file.
pub fn load_custom_rules_from_file(path: &Path) -> Result<Vec<DocumentRule>> {
    let definitions: RuleDefinitions = load_definitions(path)?;
    definitions.into_rules()
}
