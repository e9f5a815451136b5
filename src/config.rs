//! Project configuration and the definitions file formats.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::Result as DocResult;
use crate::rules::custom::CustomRuleConfig;
use crate::rules::{DeploymentStyle, DocumentRule, FunctionMacro, MacroTable};

/// Prefix of environment variables overriding the configuration file,
/// e.g. `MDPREP_VERSION=beta`.
pub const ENV_PREFIX: &str = "MDPREP";

/// A function macro rendered from a minijinja template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMacroConfig {
    #[serde(default)]
    pub params: Vec<String>,
    pub template: String,
}

/// Contents of a macro definitions file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroDefinitions {
    #[serde(default)]
    pub constants: BTreeMap<String, String>,
    #[serde(default)]
    pub functions: BTreeMap<String, TemplateMacroConfig>,
}

impl MacroDefinitions {
    pub fn into_table(self) -> MacroTable {
        let mut table = MacroTable::new();
        table.constants = self.constants;
        table.functions = self
            .functions
            .into_iter()
            .map(|(name, function)| {
                (name, FunctionMacro::template(function.params, function.template))
            })
            .collect();
        table
    }
}

/// Contents of a rule definitions file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinitions {
    #[serde(default)]
    pub rules: Vec<CustomRuleConfig>,
}

impl RuleDefinitions {
    pub fn into_rules(self) -> DocResult<Vec<DocumentRule>> {
        self.rules.into_iter().map(CustomRuleConfig::into_rule).collect()
    }
}

/// Settings read from `mdprep.yaml` (or `.toml`/`.json`) and the
/// environment. Command line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub style: Option<DeploymentStyle>,
    pub version: Option<String>,
    pub output: Option<PathBuf>,
    /// Macro definitions file, relative to the configuration file.
    pub macros: Option<PathBuf>,
    /// Rule definitions file, relative to the configuration file.
    pub rules: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl ProjectConfig {
    /// Reads `path`, if given, then applies `MDPREP_*` environment
    /// variables on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));

        let mut project: ProjectConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .with_context(|| match path {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load configuration from the environment".to_string(),
            })?;

        if let Some(base) = path.and_then(Path::parent) {
            project.resolve_paths(base);
        }
        Ok(project)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.output, &mut self.macros, &mut self.rules, &mut self.report]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_macro_definitions_into_table() {
        let definitions: MacroDefinitions = serde_yaml::from_str(
            "constants:\n  name: value\nfunctions:\n  wrap:\n    params: [a, b]\n    template: \"{{ a }}-{{ b }}\"\n",
        )
        .unwrap();
        let table = definitions.into_table();
        assert_eq!(table.constants["name"], "value");
        let wrap = &table.functions["wrap"];
        assert_eq!(wrap.arity, Some(2));
        assert_eq!(wrap.call(&["x".to_string(), "y".to_string()]).unwrap(), "x-y");
    }

    #[test]
    fn test_project_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mdprep.yaml");
        fs::write(
            &path,
            "style: confluence\nversion: beta\nmacros: macros.yaml\nreport: /tmp/report.json\n",
        )
        .unwrap();

        let config = ProjectConfig::load(Some(&path)).unwrap();
        assert_eq!(config.style, Some(DeploymentStyle::HierarchicalUnique));
        assert_eq!(config.version.as_deref(), Some("beta"));
        assert_eq!(config.macros, Some(dir.path().join("macros.yaml")));
        assert_eq!(config.report, Some(PathBuf::from("/tmp/report.json")));
        assert_eq!(config.rules, None);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ProjectConfig::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }
}
