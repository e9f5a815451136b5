use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};

use mdprep::{
    load_custom_rules_from_file, load_macros_from_file, process_docs, validate_docs,
    DeploymentStyle, MacroTable, ProjectConfig, RunSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StyleArg {
    #[value(alias = "github")]
    Relative,
    #[value(alias = "confluence")]
    HierarchicalUnique,
    Custom,
}

impl From<StyleArg> for DeploymentStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Relative => DeploymentStyle::Relative,
            StyleArg::HierarchicalUnique => DeploymentStyle::HierarchicalUnique,
            StyleArg::Custom => DeploymentStyle::Custom,
        }
    }
}

/// Prepare a markdown documentation tree for deployment.
#[derive(Debug, Parser)]
#[command(name = "mdprep", about, long_about = None)]
struct Cli {
    /// Root directory of the documentation to process
    #[arg(short, long)]
    input: PathBuf,

    /// Directory to write the result to (defaults to the input directory)
    #[arg(short, long, conflicts_with = "validate")]
    output: Option<PathBuf>,

    /// Deployment style
    #[arg(short, long, value_enum)]
    style: Option<StyleArg>,

    /// Macro definitions file (YAML or JSON)
    #[arg(short, long)]
    macros: Option<PathBuf>,

    /// Rule definitions file (YAML or JSON), appended to the style's rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Project configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Version name used in output paths and page names
    #[arg(long = "version-name", visible_alias = "version")]
    version_name: Option<String>,

    /// Check that the input is already deployment-ready, without writing
    #[arg(long)]
    validate: bool,

    /// Write the diagnostics of the run to this file as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize the report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))
}

fn run(cli: Cli) -> Result<bool> {
    let project = ProjectConfig::load(cli.config.as_deref())?;

    if !cli.input.is_dir() {
        bail!("Input {} is not a directory", cli.input.display());
    }

    let style: DeploymentStyle = cli
        .style
        .map(DeploymentStyle::from)
        .or(project.style)
        .unwrap_or_default();
    let version = cli.version_name.or(project.version).unwrap_or_default();

    let macros = match cli.macros.or(project.macros) {
        Some(path) => load_macros_from_file(&path)
            .with_context(|| format!("Failed to load macros from {}", path.display()))?,
        None => MacroTable::new(),
    };

    let mut rules = style.rules();
    match cli.rules.or(project.rules) {
        Some(path) => {
            let custom = load_custom_rules_from_file(&path)
                .with_context(|| format!("Failed to load rules from {}", path.display()))?;
            info!("Loaded {} custom rules from {}", custom.len(), path.display());
            rules.extend(custom);
        }
        None if style.requires_custom_rules() => {
            bail!("The custom style needs a rule definitions file (--rules)");
        }
        None => {}
    }

    info!("Deployment style: {}", style);

    let summary = if cli.validate {
        validate_docs(&cli.input, rules, macros, &version)
            .with_context(|| format!("Failed to validate {}", cli.input.display()))?
    } else {
        let output = cli.output.or(project.output).unwrap_or_else(|| cli.input.clone());
        process_docs(&cli.input, &output, rules, macros, &version)
            .with_context(|| format!("Failed to process {}", cli.input.display()))?
    };

    info!(
        "{} documents, {} errors, {} warnings",
        summary.documents,
        summary.errors(),
        summary.warnings()
    );

    if let Some(path) = cli.report.or(project.report) {
        write_report(&path, &summary)?;
    }

    Ok(summary.passed)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::from(2)
        }
    }
}
