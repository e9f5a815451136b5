//! Output locations for the deployment styles.

use std::path::{Path, PathBuf};

use log::debug;

use crate::document::{is_markdown_path, Document};
use crate::processing::ProcessingContext;
use crate::rules::DocumentTransform;

/// Separator between the parts of a hierarchical label.
pub const LABEL_SEPARATOR: &str = " - ";

/// Names of the directories between `root` and `path`.
fn ancestor_names(root: &Path, path: &Path) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `target/[version/]relative`, unless the relative path already starts
/// with the version directory.
pub fn relative_target(root: &Path, target: &Path, path: &Path, version: &str) -> PathBuf {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let already_versioned = ancestor_names(root, path).first().map(String::as_str) == Some(version);

    if version.is_empty() || already_versioned {
        target.join(relative)
    } else {
        target.join(version).join(relative)
    }
}

/// Whether `path` already has its hierarchically unique name.
///
/// The first directory must be the version, when there is one, and the
/// file must be named after the label of its directories: either
/// `<label>.md` or `<label> - <name>`. Files directly under the root are
/// canonical when there is no version.
pub fn path_is_hierarchically_unique(root: &Path, path: &Path, version: &str) -> bool {
    let ancestors = ancestor_names(root, path);
    if !version.is_empty() && ancestors.first().map(String::as_str) != Some(version) {
        return false;
    }
    if ancestors.is_empty() {
        return true;
    }
    let label = ancestors.join(LABEL_SEPARATOR);
    let name = file_name(path);
    name == format!("{}.md", label) || name.starts_with(&format!("{}{}", label, LABEL_SEPARATOR))
}

/// The hierarchically unique output path of `path`.
///
/// Directories are kept, prefixed by the version. The file name becomes
/// `<label> - <name>` where the label joins the version and directory names
/// with ` - `. A `README` or a file named after its directory becomes
/// `<label>.md`, the page for that directory.
pub fn hierarchical_target(root: &Path, target: &Path, path: &Path, version: &str) -> PathBuf {
    let relative = path.strip_prefix(root).unwrap_or(path);
    if path_is_hierarchically_unique(root, path, version) {
        return target.join(relative);
    }

    let directories = ancestor_names(root, path);
    let mut chain: Vec<&str> = Vec::with_capacity(directories.len() + 1);
    if !version.is_empty() {
        chain.push(version);
    }
    chain.extend(directories.iter().map(String::as_str));

    let mut output = target.to_path_buf();
    for part in &chain {
        output.push(part);
    }

    let name = file_name(path);
    if chain.is_empty() {
        return output.join(name);
    }

    let label = chain.join(LABEL_SEPARATOR);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let is_index = stem.eq_ignore_ascii_case("readme")
        || directories
            .last()
            .is_some_and(|dir| dir.eq_ignore_ascii_case(&stem));

    if is_index {
        output.join(format!("{}.md", label))
    } else {
        output.join(format!("{}{}{}", label, LABEL_SEPARATOR, name))
    }
}

/// Places every document at the same relative location under the target
/// directory.
pub struct MoveToTargetDirRelative;

impl DocumentTransform for MoveToTargetDirRelative {
    fn name(&self) -> &str {
        "move_to_target_dir_relative"
    }

    fn apply(&self, context: &ProcessingContext, document: &mut Document) {
        let settings = context.settings();
        document.target_path = relative_target(
            &settings.root_dir,
            &settings.target_dir,
            &document.input_path,
            &settings.version_name,
        );
    }
}

/// Gives markdown documents hierarchically unique names. Other files are
/// placed as [`MoveToTargetDirRelative`] would.
pub struct RenameHierarchicallyUnique;

impl DocumentTransform for RenameHierarchicallyUnique {
    fn name(&self) -> &str {
        "rename_hierarchically_unique"
    }

    fn apply(&self, context: &ProcessingContext, document: &mut Document) {
        let settings = context.settings();
        let (root, target, version) = (&settings.root_dir, &settings.target_dir, &settings.version_name);

        document.target_path = if is_markdown_path(&document.input_path) {
            hierarchical_target(root, target, &document.input_path, version)
        } else {
            relative_target(root, target, &document.input_path, version)
        };
        if document.target_path != document.input_path {
            debug!(
                "{} -> {}",
                document.input_path.display(),
                document.target_path.display()
            );
        }
    }
}
