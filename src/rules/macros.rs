//! `${name}` and `${name(args)}` substitution.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use minijinja::Environment;
use regex::Regex;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::document::Document;
use crate::processing::ProcessingContext;
use crate::rules::DocumentTransform;
use crate::scanner::{captures_next, replace_span};

/// Expansions allowed inside the text produced by one top-level token.
pub const MAX_EXPANSION_DEPTH: usize = 32;

lazy_static::lazy_static! {
    static ref CONSTANT_MACRO: Regex = Regex::new(r"\$\{(\w+)\}").unwrap();
    static ref FUNCTION_MACRO: Regex = Regex::new(r"\$\{(\w+)\(([^()]*)\)\}").unwrap();
}

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("{0}")]
    Failed(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

type MacroFn = dyn Fn(&[String]) -> Result<String, MacroError> + Send + Sync;

/// A callable macro: `${name(a, b)}`.
#[derive(Clone)]
pub struct FunctionMacro {
    /// Number of arguments the macro takes; `None` accepts any number.
    pub arity: Option<usize>,
    f: Arc<MacroFn>,
}

impl FunctionMacro {
    pub fn new<F>(arity: usize, f: F) -> Self
    where
        F: Fn(&[String]) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        Self {
            arity: Some(arity),
            f: Arc::new(f),
        }
    }

    pub fn variadic<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        Self {
            arity: None,
            f: Arc::new(f),
        }
    }

    /// A macro rendering a minijinja template, with the arguments bound to
    /// `params` in order.
    pub fn template(params: Vec<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        let arity = params.len();
        Self::new(arity, move |args| {
            let env = Environment::new();
            let bindings: BTreeMap<&str, &str> = params
                .iter()
                .map(String::as_str)
                .zip(args.iter().map(String::as_str))
                .collect();
            Ok(env.render_str(&template, bindings)?)
        })
    }

    pub fn call(&self, args: &[String]) -> Result<String, MacroError> {
        (self.f)(args)
    }
}

impl fmt::Debug for FunctionMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionMacro")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    pub constants: BTreeMap<String, String>,
    pub functions: BTreeMap<String, FunctionMacro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, function: FunctionMacro) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty() && self.functions.is_empty()
    }

    /// Adds every macro of `other`, replacing macros with the same name.
    pub fn extend(&mut self, other: MacroTable) {
        self.constants.extend(other.constants);
        self.functions.extend(other.functions);
    }
}

/// Tracks how deeply the text at the scan position is nested inside
/// expansions, so a macro expanding into itself terminates.
///
/// Each region is the end offset of the text one expansion produced and the
/// nesting depth of that expansion. Tokens inside the same region are
/// siblings and share its depth.
struct ExpansionBudget {
    regions: Vec<(usize, usize)>,
}

impl ExpansionBudget {
    fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Returns the depth an expansion of the token at `start` would have, or
    /// `None` when that exceeds [`MAX_EXPANSION_DEPTH`].
    fn enter(&mut self, start: usize) -> Option<usize> {
        while self.regions.last().is_some_and(|&(end, _)| start >= end) {
            self.regions.pop();
        }
        let depth = self.regions.last().map_or(1, |&(_, depth)| depth + 1);
        (depth <= MAX_EXPANSION_DEPTH).then_some(depth)
    }

    /// Records that `text[start..end]` was replaced by `replacement_len`
    /// bytes at `depth`.
    fn replaced(&mut self, start: usize, end: usize, replacement_len: usize, depth: usize) {
        let new_end = start + replacement_len;
        for region in &mut self.regions {
            region.0 = if region.0 >= end {
                region.0 - (end - start) + replacement_len
            } else {
                new_end
            };
        }
        self.regions.push((new_end, depth));
    }
}

/// Expands `${name}` tokens from `table.constants`.
pub fn expand_constants(
    text: &str,
    table: &MacroTable,
    document: &Path,
    diagnostics: &Diagnostics,
) -> String {
    let mut text = text.to_string();
    let mut pos = 0;
    let mut budget = ExpansionBudget::new();

    while let Some(caps) = captures_next(&text, pos, &CONSTANT_MACRO) {
        let Some(whole) = caps.get(0) else { break };
        let (start, end) = (whole.start(), whole.end());
        let token = whole.as_str().to_string();
        let name = caps[1].to_string();

        if let Some(value) = table.constants.get(&name) {
            let Some(depth) = budget.enter(start) else {
                diagnostics.report(Diagnostic::recursive_macro(document, &token, MAX_EXPANSION_DEPTH));
                pos = end;
                continue;
            };
            let (replaced, _) = replace_span(&text, start, end, value);
            budget.replaced(start, end, value.len(), depth);
            text = replaced;
            pos = start;
        } else if table.functions.contains_key(&name) {
            diagnostics.report(Diagnostic::function_used_as_constant(document, &token, &name));
            pos = end;
        } else {
            diagnostics.report(Diagnostic::unknown_macro(document, &token));
            pos = end;
        }
    }
    text
}

fn parse_arguments(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|arg| arg.trim().to_string()).collect()
}

/// Expands `${name(args)}` tokens from `table.functions`.
pub fn expand_functions(
    text: &str,
    table: &MacroTable,
    document: &Path,
    diagnostics: &Diagnostics,
) -> String {
    let mut text = text.to_string();
    let mut pos = 0;
    let mut budget = ExpansionBudget::new();

    while let Some(caps) = captures_next(&text, pos, &FUNCTION_MACRO) {
        let Some(whole) = caps.get(0) else { break };
        let (start, end) = (whole.start(), whole.end());
        let token = whole.as_str().to_string();
        let name = caps[1].to_string();
        let args = parse_arguments(&caps[2]);

        let Some(function) = table.functions.get(&name) else {
            if table.constants.contains_key(&name) {
                diagnostics.report(Diagnostic::constant_used_as_function(document, &token, &name));
            } else {
                diagnostics.report(Diagnostic::unknown_macro(document, &token));
            }
            pos = end;
            continue;
        };

        if let Some(arity) = function.arity {
            if arity != args.len() {
                diagnostics.report(Diagnostic::arity_mismatch(document, &token, arity, args.len()));
                pos = end;
                continue;
            }
        }

        match function.call(&args) {
            Ok(value) => {
                let Some(depth) = budget.enter(start) else {
                    diagnostics.report(Diagnostic::recursive_macro(document, &token, MAX_EXPANSION_DEPTH));
                    pos = end;
                    continue;
                };
                let (replaced, _) = replace_span(&text, start, end, &value);
                budget.replaced(start, end, value.len(), depth);
                text = replaced;
                pos = start;
            }
            Err(err) => {
                diagnostics.report(Diagnostic::macro_failed(document, &token, args.len(), &err.to_string()));
                pos = end;
            }
        }
    }
    text
}

/// Constants first, so their values can feed function arguments.
pub fn expand_macros(
    text: &str,
    table: &MacroTable,
    document: &Path,
    diagnostics: &Diagnostics,
) -> String {
    let text = expand_constants(text, table, document, diagnostics);
    expand_functions(&text, table, document, diagnostics)
}

/// Substitutes the context's macros into the document.
pub struct ApplyMacros;

impl DocumentTransform for ApplyMacros {
    fn name(&self) -> &str {
        "apply_macros"
    }

    fn apply(&self, context: &ProcessingContext, document: &mut Document) {
        let table = &context.settings().macros;
        if !document.contents.contains("${") {
            return;
        }
        debug!("Applying macros to {}", document.input_path.display());
        document.contents = expand_macros(
            &document.contents,
            table,
            &document.input_path,
            context.diagnostics(),
        );
    }
}
