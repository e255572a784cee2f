//! Audience CLI: browse the field catalog, validate and edit audience filter
//! trees, and evaluate membership for JSON records.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use audience_core::config::AppConfig;
use audience_segmentation::{
    render_rows, AuthoringSession, ConditionTree, EditOutcome, Evaluator, EvaluatorOptions,
    FieldCategory, FieldRegistry, FilterField, Record, TreeEdit, TreeRow,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "audience-cli")]
#[command(about = "Audience segmentation filter tools")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still apply on top)
    #[arg(long, env = "AUDIENCE_STUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Field catalog JSON file (overrides config)
    #[arg(long)]
    catalog: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List segmentable fields
    Fields {
        /// Only fields in this category, e.g. demographics or digital
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Check a saved tree and print its rows
    Validate {
        /// Tree JSON file
        tree: PathBuf,
    },

    /// Apply a JSON list of edits to a tree and print the result
    Edit {
        /// Tree JSON file to resume (default: a fresh tree)
        #[arg(short, long)]
        tree: Option<PathBuf>,

        /// JSON array of edit commands
        #[arg(short, long)]
        edits: PathBuf,
    },

    /// Evaluate a tree against a JSON array of records
    Evaluate {
        /// Tree JSON file
        #[arg(short, long)]
        tree: PathBuf,

        /// Records JSON file
        #[arg(short, long)]
        records: PathBuf,

        /// Count a missing attribute as satisfying its condition (overrides config)
        #[arg(long)]
        missing_field_matches: Option<bool>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateReport {
    summary: String,
    rows: Vec<TreeRow>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditReport {
    applied: usize,
    skipped: usize,
    tree: ConditionTree,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateReport {
    total: usize,
    matched: usize,
    /// Positions of matching records in the input array.
    matches: Vec<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    if cli.json_logs {
        config.log.json = true;
    }
    if let Some(path) = cli.catalog {
        config.registry.catalog_path = Some(path);
    }
    init_tracing(&config);
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    let registry = load_registry(&config)?;
    info!(fields = registry.len(), "Field registry loaded");

    match cli.command {
        Commands::Fields { category } => {
            let fields: Vec<&FilterField> = match category {
                Some(name) => {
                    let category: FieldCategory =
                        serde_json::from_value(serde_json::Value::String(name.clone()))
                            .with_context(|| format!("unknown category '{name}'"))?;
                    registry.by_category(category).collect()
                }
                None => registry.fields().iter().collect(),
            };
            print_json(&fields)?;
        }
        Commands::Validate { tree } => {
            let tree = read_tree(&tree)?;
            let report = ValidateReport {
                summary: tree.to_string(),
                rows: render_rows(&tree),
                warnings: lint(&tree, &registry),
            };
            for warning in &report.warnings {
                warn!(%warning, "Tree check");
            }
            print_json(&report)?;
        }
        Commands::Edit { tree, edits } => {
            let mut session = match tree {
                Some(path) => AuthoringSession::resume(read_tree(&path)?),
                None => AuthoringSession::new(),
            };
            let edits: Vec<TreeEdit> = read_json(&edits)?;
            let (mut applied, mut skipped) = (0, 0);
            for edit in edits {
                match session.apply(edit) {
                    EditOutcome::Applied => applied += 1,
                    EditOutcome::NoOp => skipped += 1,
                }
            }
            info!(applied, skipped, revision = session.revision(), "Edits processed");
            print_json(&EditReport {
                applied,
                skipped,
                tree: session.into_tree(),
            })?;
        }
        Commands::Evaluate {
            tree,
            records,
            missing_field_matches,
        } => {
            if let Some(flag) = missing_field_matches {
                config.evaluator.missing_field_matches = flag;
            }
            let tree = read_tree(&tree)?;
            let records: Vec<Record> = read_json(&records)?;
            let evaluator = Evaluator::new(&registry)
                .with_options(EvaluatorOptions::from(&config.evaluator));
            let matches: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| evaluator.evaluate(&tree, r))
                .map(|(i, _)| i)
                .collect();
            info!(total = records.len(), matched = matches.len(), "Evaluation complete");
            print_json(&EvaluateReport {
                total: records.len(),
                matched: matches.len(),
                matches,
            })?;
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log.filter.clone().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_registry(config: &AppConfig) -> Result<FieldRegistry> {
    match &config.registry.catalog_path {
        Some(path) => FieldRegistry::from_path(path)
            .with_context(|| format!("loading field catalog {path}")),
        None => Ok(FieldRegistry::builtin()),
    }
}

/// Conditions that will not constrain anything, and operators the field type
/// does not support.
fn lint(tree: &ConditionTree, registry: &FieldRegistry) -> Vec<String> {
    let mut warnings = Vec::new();
    tree.root().walk(&mut |node, _, _| {
        let Some(condition) = node.as_condition() else {
            return;
        };
        match (&condition.field_id, condition.operator) {
            (None, _) => warnings.push(format!("{}: no field selected", condition.id)),
            (Some(field_id), operator) => match registry.lookup(field_id) {
                None => warnings.push(format!("{}: unknown field '{field_id}'", condition.id)),
                Some(_) if operator.is_none() => {
                    warnings.push(format!("{}: no operator selected", condition.id))
                }
                Some(field) => {
                    if let Some(op) = operator.filter(|op| !field.value_type.supports(*op)) {
                        warnings.push(format!(
                            "{}: operator '{op}' does not apply to {}",
                            condition.id, field.label
                        ));
                    }
                }
            },
        }
    });
    warnings
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_tree(path: &Path) -> Result<ConditionTree> {
    read_json(path)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
