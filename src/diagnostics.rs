//! Diagnostics collected while rules run.
//!
//! Rules never fail. When they meet something they cannot resolve they report
//! it here, leave the offending text alone, and keep going. Every report is
//! also forwarded to the `log` facade.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `${name}` or `${name()}` with no macro of that name.
    UnknownMacro,
    /// `${name}` where `name` is a function macro.
    FunctionUsedAsConstant,
    /// `${name(..)}` where `name` is a constant macro.
    ConstantUsedAsFunction,
    ArityMismatch,
    /// A function macro returned an error.
    MacroFailed,
    /// A macro kept expanding into itself.
    RecursiveMacro,
    BrokenLink,
    MissingGlossary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub document: PathBuf,
    /// The text that triggered the report, exactly as found in the document.
    pub token: String,
    pub message: String,
}

impl Diagnostic {
    pub fn unknown_macro(document: &Path, token: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnknownMacro,
            severity: Severity::Warning,
            document: document.to_path_buf(),
            token: token.to_string(),
            message: format!(
                "Invalid macro: found {} in {}, but no matching macro is defined.",
                token,
                document.display()
            ),
        }
    }

    pub fn function_used_as_constant(document: &Path, token: &str, name: &str) -> Self {
        Self {
            kind: DiagnosticKind::FunctionUsedAsConstant,
            severity: Severity::Error,
            document: document.to_path_buf(),
            token: token.to_string(),
            message: format!(
                "Cannot resolve {} as {} is a function, not a constant.",
                token, name
            ),
        }
    }

    pub fn constant_used_as_function(document: &Path, token: &str, name: &str) -> Self {
        Self {
            kind: DiagnosticKind::ConstantUsedAsFunction,
            severity: Severity::Error,
            document: document.to_path_buf(),
            token: token.to_string(),
            message: format!("Cannot resolve {} as {} is not a function.", token, name),
        }
    }

    pub fn arity_mismatch(document: &Path, token: &str, expected: usize, actual: usize) -> Self {
        Self {
            kind: DiagnosticKind::ArityMismatch,
            severity: Severity::Error,
            document: document.to_path_buf(),
            token: token.to_string(),
            message: format!(
                "Cannot resolve {}. Expected {} args, got {}.",
                token, expected, actual
            ),
        }
    }

    pub fn macro_failed(document: &Path, token: &str, arg_count: usize, reason: &str) -> Self {
        Self {
            kind: DiagnosticKind::MacroFailed,
            severity: Severity::Error,
            document: document.to_path_buf(),
            token: token.to_string(),
            message: format!(
                "Error while resolving {} with {} args: {}",
                token, arg_count, reason
            ),
        }
    }

    pub fn recursive_macro(document: &Path, token: &str, depth: usize) -> Self {
        Self {
            kind: DiagnosticKind::RecursiveMacro,
            severity: Severity::Error,
            document: document.to_path_buf(),
            token: token.to_string(),
            message: format!(
                "Macro {} was still expanding after {} substitutions, leaving it unresolved.",
                token, depth
            ),
        }
    }

    pub fn broken_link(document: &Path, token: &str) -> Self {
        Self {
            kind: DiagnosticKind::BrokenLink,
            severity: Severity::Warning,
            document: document.to_path_buf(),
            token: token.to_string(),
            message: format!(
                "Link {} in {} does not point at a document in the set.",
                token,
                document.display()
            ),
        }
    }

    pub fn missing_glossary(document: &Path, name: &str) -> Self {
        Self {
            kind: DiagnosticKind::MissingGlossary,
            severity: Severity::Warning,
            document: document.to_path_buf(),
            token: name.to_string(),
            message: format!("Cannot find a {} file, skipping glossary links.", name),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Sink for diagnostics, owned by the processing context.
///
/// Rules only get a shared reference to the context, so the list sits behind
/// a `RefCell`. Processing is single threaded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: RefCell<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => error!("{}", diagnostic.message),
            Severity::Warning => warn!("{}", diagnostic.message),
            Severity::Info => info!("{}", diagnostic.message),
        }
        self.entries.borrow_mut().push(diagnostic);
    }

    pub fn entries(&self) -> Ref<'_, Vec<Diagnostic>> {
        self.entries.borrow()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}
