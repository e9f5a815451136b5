//! mdprep
//!
//! Prepares a tree of markdown documentation for deployment: substitutes
//! macros, canonicalises links between documents, links glossary terms and
//! gives pages the names the target platform needs.

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod loading;
pub mod matching;
pub mod processing;
pub mod rules;
pub mod scanner;

pub use config::{MacroDefinitions, ProjectConfig, RuleDefinitions};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use document::Document;
pub use error::DocError;
pub use loading::{
    discover_documents, load_custom_rules_from_file, load_document, load_glossary,
    load_macros_from_file, save_document,
};
pub use processing::{process_docs, validate_docs, ProcessingContext, ProcessingSettings, RunSummary};
pub use rules::{
    DeploymentStyle, DocumentRule, DocumentTransform, FunctionMacro, MacroError, MacroTable, Pass,
};
