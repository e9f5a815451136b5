//! Rules supplied by the user in a definitions file.

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{DocError, Result};
use crate::processing::ProcessingContext;
use crate::rules::{DocumentRule, DocumentTransform, Pass};

fn default_filter() -> String {
    "*.md".to_string()
}

/// One entry of a rule definitions file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    pub name: String,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub pass: Pass,
    /// Regular expression to search for.
    pub pattern: String,
    /// Replacement text; `$1` and `${name}` refer to capture groups.
    #[serde(default)]
    pub replacement: String,
}

impl CustomRuleConfig {
    pub fn into_rule(self) -> Result<DocumentRule> {
        let transform = RegexReplace::new(self.name, &self.pattern, self.replacement)?;
        Ok(DocumentRule::new(transform, self.filter, self.pass))
    }
}

/// Replaces every match of a regex in the document.
pub struct RegexReplace {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl RegexReplace {
    pub fn new(name: impl Into<String>, pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| DocError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.into(),
            pattern: regex,
            replacement: replacement.into(),
        })
    }
}

impl DocumentTransform for RegexReplace {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, _context: &ProcessingContext, document: &mut Document) {
        let replaced = self
            .pattern
            .replace_all(&document.contents, self.replacement.as_str());
        if replaced != document.contents {
            debug!("Rule {} rewrote {}", self.name, document.input_path.display());
            document.contents = replaced.into_owned();
        }
    }
}
