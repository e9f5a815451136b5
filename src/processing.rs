//! The document set and the pass scheduler.
//!
//! Documents live in a [`ProcessingContext`]. [`ProcessingContext::run`]
//! applies the rules pass by pass. Afterwards the documents are either saved
//! ([`process_docs`]) or compared with what was loaded ([`validate_docs`]).

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::document::{Document, N_CONTEXT_LINES_IN_DIFF};
use crate::error::{DocError, Result};
use crate::loading::{copy_file, discover_documents, load_document, save_document};
use crate::matching::filter_matches;
use crate::rules::rename::relative_target;
use crate::rules::{schedule, DocumentRule, MacroTable, Pass};

/// Whether the last segment of `path` is `name`, ignoring case and with or
/// without the `.md` extension.
///
/// A renamed page such as `v1 - docs - Glossary.md` inside `docs/` is still
/// found as `glossary.md`: the part after the last ` - ` counts when the
/// label before it ends with the parent directory's name.
pub fn matches_short_name(path: &Path, name: &str) -> bool {
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return false;
    };
    let name = name.to_lowercase();
    let bare = name.strip_suffix(".md").unwrap_or(&name);
    let is_name = |candidate: &str| {
        let stem = candidate.strip_suffix(".md").unwrap_or(candidate);
        candidate == name || stem == bare
    };

    if is_name(file_name.as_str()) {
        return true;
    }
    let Some((label, short)) = file_name.rsplit_once(" - ") else {
        return false;
    };
    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_lowercase());
    let labelled_by_parent = parent.is_some_and(|parent| {
        label == parent || label.ends_with(&format!(" - {}", parent))
    });
    labelled_by_parent && is_name(short)
}

/// Everything a run needs besides the documents.
#[derive(Debug, Clone, Default)]
pub struct ProcessingSettings {
    /// Every document must live under this directory.
    pub root_dir: PathBuf,
    /// Output tree. Equal to `root_dir` for in-place and validation runs.
    pub target_dir: PathBuf,
    pub version_name: String,
    pub macros: MacroTable,
    pub rules: Vec<DocumentRule>,
}

impl ProcessingSettings {
    pub fn new(root_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            target_dir: target_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version_name: impl Into<String>) -> Self {
        self.version_name = version_name.into();
        self
    }

    pub fn with_macros(mut self, macros: MacroTable) -> Self {
        self.macros = macros;
        self
    }

    pub fn with_rules(mut self, rules: Vec<DocumentRule>) -> Self {
        self.rules = rules;
        self
    }
}

/// Owns the document set for one run.
///
/// Rules get `&ProcessingContext` to read other documents and `&mut
/// Document` for the one they rewrite. The document being rewritten is
/// borrowed out of its cell meanwhile, so lookups of it return `None`.
pub struct ProcessingContext {
    settings: ProcessingSettings,
    documents: BTreeMap<PathBuf, RefCell<Document>>,
    diagnostics: Diagnostics,
}

impl ProcessingContext {
    pub fn new(settings: ProcessingSettings) -> Self {
        Self {
            settings,
            documents: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn add_document(&mut self, document: Document) -> Result<()> {
        if !document.input_path.starts_with(&self.settings.root_dir) {
            return Err(DocError::OutsideRoot {
                path: document.input_path,
                root: self.settings.root_dir.clone(),
            });
        }
        self.documents
            .insert(document.input_path.clone(), RefCell::new(document));
        Ok(())
    }

    /// Loads the file at `path` and adds it.
    pub fn add_path(&mut self, path: &Path) -> Result<()> {
        let document = load_document(path)?;
        self.add_document(document)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    pub fn get_document(&self, path: &Path) -> Option<Ref<'_, Document>> {
        self.documents.get(path)?.try_borrow().ok()
    }

    /// First document whose target file name matches `name`, see
    /// [`matches_short_name`].
    pub fn get_document_by_name(&self, name: &str) -> Option<Ref<'_, Document>> {
        self.documents.values().find_map(|cell| {
            let document = cell.try_borrow().ok()?;
            matches_short_name(&document.target_path, name).then_some(document)
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterates the documents in path order, skipping the one being
    /// rewritten.
    pub fn documents(&self) -> impl Iterator<Item = Ref<'_, Document>> {
        self.documents.values().filter_map(|cell| cell.try_borrow().ok())
    }

    /// Consumes the context, returning its documents and diagnostics.
    pub fn into_parts(self) -> (Vec<Document>, Vec<Diagnostic>) {
        let documents = self
            .documents
            .into_values()
            .map(RefCell::into_inner)
            .collect();
        (documents, self.diagnostics.take())
    }

    /// Applies every rule to every document, one pass at a time.
    pub fn run(&self) -> Result<()> {
        let rules = schedule(self.settings.rules.clone());
        for pass in Pass::ALL {
            let pass_rules: Vec<&DocumentRule> = rules.iter().filter(|rule| rule.pass == pass).collect();
            if pass_rules.is_empty() {
                continue;
            }
            debug!("Running pass {:?} with {} rules", pass, pass_rules.len());

            for (path, cell) in &self.documents {
                for rule in &pass_rules {
                    if !filter_matches(&rule.file_filter, &self.settings.root_dir, path)? {
                        continue;
                    }
                    let mut document = cell.borrow_mut();
                    rule.transform.apply(self, &mut document);
                }
            }
        }
        Ok(())
    }

    /// Writes every document to its target path.
    pub fn save(&self) -> Result<()> {
        for document in self.documents() {
            save_document(&document)?;
        }
        Ok(())
    }
}

/// Outcome of [`process_docs`] or [`validate_docs`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub documents: usize,
    /// Documents whose contents changed.
    pub changed: Vec<PathBuf>,
    /// Documents whose target path differs from their input path.
    pub moved: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// False only for a validation run that found work to do.
    pub passed: bool,
}

impl RunSummary {
    pub fn errors(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warnings(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// Loads the tree under `input` into a context. Files that are not text
/// are returned separately.
fn load_context(settings: ProcessingSettings) -> Result<(ProcessingContext, Vec<PathBuf>)> {
    let root = settings.root_dir.clone();
    if !root.exists() {
        return Err(DocError::NotFound(root));
    }
    if !root.is_dir() {
        return Err(DocError::Config(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut context = ProcessingContext::new(settings);
    let mut binary_files = Vec::new();
    for path in discover_documents(&root)? {
        match load_document(&path) {
            Ok(document) => context.add_document(document)?,
            Err(DocError::Io { source, .. }) if source.kind() == std::io::ErrorKind::InvalidData => {
                debug!("{} is not UTF-8 text, copying it unchanged", path.display());
                binary_files.push(path);
            }
            Err(err) => return Err(err),
        }
    }
    info!("Loaded {} documents from {}", context.len(), root.display());
    Ok((context, binary_files))
}

fn summarize(context: ProcessingContext, validating: bool) -> RunSummary {
    let (documents, diagnostics) = context.into_parts();
    let changed: Vec<PathBuf> = documents
        .iter()
        .filter(|d| !d.unchanged())
        .map(|d| d.input_path.clone())
        .collect();
    let moved: Vec<PathBuf> = documents
        .iter()
        .filter(|d| d.target_path != d.input_path)
        .map(|d| d.input_path.clone())
        .collect();

    if validating {
        for document in documents.iter().filter(|d| !d.unchanged()) {
            warn!(
                "{} is not ready for deployment:\n{}",
                document.input_path.display(),
                document.changes(N_CONTEXT_LINES_IN_DIFF)
            );
        }
        for document in documents.iter().filter(|d| d.target_path != d.input_path) {
            warn!(
                "{} should be named {}",
                document.input_path.display(),
                document.target_path.display()
            );
        }
    }

    let passed = !validating || (changed.is_empty() && moved.is_empty());
    RunSummary {
        documents: documents.len(),
        changed,
        moved,
        diagnostics,
        passed,
    }
}

/// Runs `rules` over the tree under `input` and writes the result under
/// `output`.
///
/// Every document is loaded before any rule runs, so a missing or
/// unreadable input aborts the run before anything is written.
pub fn process_docs(
    input: &Path,
    output: &Path,
    rules: Vec<DocumentRule>,
    macros: MacroTable,
    version_name: &str,
) -> Result<RunSummary> {
    let settings = ProcessingSettings::new(input, output)
        .with_version(version_name)
        .with_rules(rules)
        .with_macros(macros);
    let (context, binary_files) = load_context(settings)?;

    context.run()?;
    context.save()?;

    if input != output {
        for path in &binary_files {
            copy_file(path, &relative_target(input, output, path, version_name))?;
        }
    }

    let summary = summarize(context, false);
    info!(
        "Processed {} documents into {} ({} changed, {} moved)",
        summary.documents,
        output.display(),
        summary.changed.len(),
        summary.moved.len()
    );
    Ok(summary)
}

/// Runs `rules` over the tree under `input` without writing anything.
///
/// The tree passes when no document would change or move.
pub fn validate_docs(
    input: &Path,
    rules: Vec<DocumentRule>,
    macros: MacroTable,
    version_name: &str,
) -> Result<RunSummary> {
    let settings = ProcessingSettings::new(input, input)
        .with_version(version_name)
        .with_rules(rules)
        .with_macros(macros);
    let (context, _) = load_context(settings)?;

    context.run()?;

    let summary = summarize(context, true);
    if summary.passed {
        info!("All {} documents are ready for deployment", summary.documents);
    } else {
        warn!(
            "Validation failed: {} documents would change, {} would move",
            summary.changed.len(),
            summary.moved.len()
        );
    }
    Ok(summary)
}
