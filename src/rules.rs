//! Document rules and the built-in rule lists for each deployment style.
//!
//! A rule pairs a [`DocumentTransform`] with a file filter and the pass it
//! runs in. The scheduler in [`crate::processing`] sorts rules by pass,
//! keeping declaration order inside a pass, and applies every rule whose
//! filter matches to every document.

pub mod custom;
pub mod glossary;
pub mod links;
pub mod macros;
pub mod rename;
pub mod toc;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::processing::ProcessingContext;

pub use custom::RegexReplace;
pub use glossary::{process_glossary, GlossaryEntry, GlossaryLink, GLOSSARY_NAME};
pub use links::SanitizeLinks;
pub use macros::{ApplyMacros, FunctionMacro, MacroError, MacroTable};
pub use rename::{path_is_hierarchically_unique, MoveToTargetDirRelative, RenameHierarchicallyUnique};
pub use toc::CreateTableOfContents;

/// Filter used by every built-in rule.
pub const ALL_FILES: &str = "*";

/// Scheduler stage a rule runs in.
///
/// Every document goes through all rules of one pass before any rule of the
/// next pass runs, so a rule in a later pass sees what earlier passes did to
/// the whole document set.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    #[default]
    First = 0,
    /// Rules reading other documents' target paths.
    LinkUpdating = 1,
    Finalize = 2,
}

impl Pass {
    pub const ALL: [Pass; 3] = [Pass::First, Pass::LinkUpdating, Pass::Finalize];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A transformation applied to one document at a time.
///
/// Implementations may read any document through the context but only write
/// to the document they are given.
pub trait DocumentTransform: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn apply(&self, context: &ProcessingContext, document: &mut Document);
}

#[derive(Clone)]
pub struct DocumentRule {
    pub transform: Arc<dyn DocumentTransform>,
    /// Glob selecting the documents the rule applies to.
    pub file_filter: String,
    pub pass: Pass,
}

impl DocumentRule {
    pub fn new<T>(transform: T, file_filter: impl Into<String>, pass: Pass) -> Self
    where
        T: DocumentTransform + 'static,
    {
        Self {
            transform: Arc::new(transform),
            file_filter: file_filter.into(),
            pass,
        }
    }

    /// Wraps a closure as a rule, for rules defined in code.
    pub fn from_fn<F>(name: impl Into<String>, file_filter: impl Into<String>, pass: Pass, f: F) -> Self
    where
        F: Fn(&ProcessingContext, &mut Document) + Send + Sync + 'static,
    {
        Self::new(
            FnTransform {
                name: name.into(),
                f: Box::new(f),
            },
            file_filter,
            pass,
        )
    }

    pub fn name(&self) -> &str {
        self.transform.name()
    }
}

impl fmt::Debug for DocumentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRule")
            .field("name", &self.name())
            .field("file_filter", &self.file_filter)
            .field("pass", &self.pass)
            .finish()
    }
}

type RuleFn = Box<dyn Fn(&ProcessingContext, &mut Document) + Send + Sync>;

struct FnTransform {
    name: String,
    f: RuleFn,
}

impl DocumentTransform for FnTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, context: &ProcessingContext, document: &mut Document) {
        (self.f)(context, document)
    }
}

/// Target platform presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStyle {
    /// Plain file hosting: paths are kept, links are canonicalised.
    #[serde(alias = "github")]
    Relative,
    /// Wikis needing globally unique page names.
    #[default]
    #[serde(alias = "confluence")]
    HierarchicalUnique,
    /// Only user-supplied rules.
    Custom,
}

impl fmt::Display for DeploymentStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentStyle::Relative => write!(f, "relative"),
            DeploymentStyle::HierarchicalUnique => write!(f, "hierarchical-unique"),
            DeploymentStyle::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for DeploymentStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relative" | "github" => Ok(DeploymentStyle::Relative),
            "hierarchical-unique" | "hierarchical_unique" | "confluence" => {
                Ok(DeploymentStyle::HierarchicalUnique)
            }
            "custom" => Ok(DeploymentStyle::Custom),
            other => Err(format!("unknown deployment style '{}'", other)),
        }
    }
}

impl DeploymentStyle {
    /// The built-in rules of this style, in declaration order.
    pub fn rules(self) -> Vec<DocumentRule> {
        match self {
            DeploymentStyle::Relative => vec![
                DocumentRule::new(SanitizeLinks, ALL_FILES, Pass::LinkUpdating),
                DocumentRule::new(MoveToTargetDirRelative, ALL_FILES, Pass::First),
            ],
            DeploymentStyle::HierarchicalUnique => vec![
                DocumentRule::new(CreateTableOfContents, ALL_FILES, Pass::First),
                DocumentRule::new(ApplyMacros, ALL_FILES, Pass::First),
                DocumentRule::new(SanitizeLinks, ALL_FILES, Pass::LinkUpdating),
                DocumentRule::new(RenameHierarchicallyUnique, ALL_FILES, Pass::First),
                DocumentRule::new(GlossaryLink, ALL_FILES, Pass::LinkUpdating),
            ],
            DeploymentStyle::Custom => Vec::new(),
        }
    }

    pub fn requires_custom_rules(self) -> bool {
        matches!(self, DeploymentStyle::Custom)
    }
}

/// Stable sort by pass; rules of the same pass keep their declared order.
pub fn schedule(mut rules: Vec<DocumentRule>) -> Vec<DocumentRule> {
    rules.sort_by_key(|rule| rule.pass);
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(rules: &[DocumentRule]) -> Vec<&str> {
        rules.iter().map(|rule| rule.name()).collect()
    }

    #[test]
    fn test_style_parsing_accepts_aliases() {
        assert_eq!("github".parse::<DeploymentStyle>().unwrap(), DeploymentStyle::Relative);
        assert_eq!(
            "Confluence".parse::<DeploymentStyle>().unwrap(),
            DeploymentStyle::HierarchicalUnique
        );
        assert_eq!(
            "hierarchical-unique".parse::<DeploymentStyle>().unwrap(),
            DeploymentStyle::HierarchicalUnique
        );
        assert!("wiki".parse::<DeploymentStyle>().is_err());
    }

    #[test]
    fn test_style_deserializes_aliases() {
        let style: DeploymentStyle = serde_json::from_str("\"confluence\"").unwrap();
        assert_eq!(style, DeploymentStyle::HierarchicalUnique);
        let style: DeploymentStyle = serde_json::from_str("\"relative\"").unwrap();
        assert_eq!(style, DeploymentStyle::Relative);
    }

    #[test]
    fn test_schedule_is_stable_within_a_pass() {
        let rules = schedule(DeploymentStyle::HierarchicalUnique.rules());
        assert_eq!(
            names(&rules),
            vec![
                "create_table_of_contents",
                "apply_macros",
                "rename_hierarchically_unique",
                "sanitize_links",
                "glossary_link",
            ]
        );
    }

    #[test]
    fn test_custom_style_has_no_builtin_rules() {
        assert!(DeploymentStyle::Custom.rules().is_empty());
        assert!(DeploymentStyle::Custom.requires_custom_rules());
        assert!(!DeploymentStyle::Relative.requires_custom_rules());
    }

    #[test]
    fn test_from_fn_rule() {
        let rule = DocumentRule::from_fn("upper", "*.md", Pass::Finalize, |_, doc| {
            doc.contents = doc.contents.to_uppercase();
        });
        assert_eq!(rule.name(), "upper");
        assert_eq!(rule.pass, Pass::Finalize);
        assert_eq!(rule.file_filter, "*.md");
    }

    #[test]
    fn test_pass_order() {
        assert!(Pass::First < Pass::LinkUpdating);
        assert!(Pass::LinkUpdating < Pass::Finalize);
        assert_eq!(Pass::Finalize.index(), 2);
    }
}
