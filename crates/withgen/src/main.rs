//! withgen: check and plan `with` mutators for value types
//!
//! Each input is a declaration snapshot (JSON or TOML) describing one value
//! type: its hierarchy, properties and abstract members.
//!
//! ```bash
//! # Report which mutators are valid and why the others are not
//! withgen check thing.toml other.json
//!
//! # Print reconstruction plans
//! withgen plan thing.toml --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use withgen_core::{
    generate_batch, DeclarationSnapshot, Diagnostic, DiagnosticCollector, FilterPolicy, GeneratorConfig, MutatorPipeline,
    MutatorPlan, Severity, TypeName, ValueTypeModel,
};

#[derive(Parser)]
#[command(
    name = "withgen",
    author,
    version,
    about = "Discover and validate `with` mutators on immutable value types"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Generator config (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured candidate policy
    #[arg(long, global = true, value_enum)]
    policy: Option<PolicyArg>,

    /// Override the configured mutator prefix
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate mutator declarations and report diagnostics
    Check {
        /// Declaration snapshots
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
    },

    /// Print the reconstruction plan of every valid mutator
    Plan {
        /// Declaration snapshots
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Prefixed,
    Generalized,
}

impl From<PolicyArg> for FilterPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Prefixed => FilterPolicy::Prefixed,
            PolicyArg::Generalized => FilterPolicy::Generalized,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    value_types: Vec<ValueTypePlans<'a>>,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct ValueTypePlans<'a> {
    value_type: &'a TypeName,
    plans: &'a [MutatorPlan],
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let pipeline = MutatorPipeline::new(config);

    match &cli.command {
        Commands::Check { snapshots } => check(&pipeline, snapshots),
        Commands::Plan { snapshots, format } => plan(&pipeline, snapshots, *format),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<GeneratorConfig> {
    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(policy) = cli.policy {
        config = config.with_policy(policy.into());
    }
    if let Some(prefix) = &cli.prefix {
        config = config.with_prefix(prefix.clone());
    }
    config.validate().context("invalid generator settings")?;
    debug!(?config, "generator config");
    Ok(config)
}

fn load_models(paths: &[PathBuf]) -> Result<Vec<ValueTypeModel>> {
    paths.iter().map(|path| load_model(path)).collect()
}

fn load_model(path: &Path) -> Result<ValueTypeModel> {
    let model = DeclarationSnapshot::load(path)
        .and_then(DeclarationSnapshot::into_model)
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;
    info!(path = %path.display(), value_type = %model.leaf, members = model.members.len(), "loaded snapshot");
    Ok(model)
}

type BatchOutput = (Vec<(TypeName, Vec<MutatorPlan>)>, Vec<Diagnostic>);

/// Run every model and return plans plus diagnostics grouped by input
/// position. Within one value type diagnostics stay in candidate order.
fn run_batch(pipeline: &MutatorPipeline, models: &[ValueTypeModel]) -> BatchOutput {
    let collector = DiagnosticCollector::new();
    let results = generate_batch(pipeline, models, &collector);

    let mut diagnostics = collector.into_diagnostics();
    diagnostics.sort_by_key(|d| models.iter().position(|m| m.leaf == d.location.value_type));
    (results, diagnostics)
}

fn check(pipeline: &MutatorPipeline, paths: &[PathBuf]) -> Result<ExitCode> {
    let models = load_models(paths)?;
    let (results, diagnostics) = run_batch(pipeline, &models);

    for (leaf, plans) in &results {
        if plans.is_empty() {
            println!("{}: {}", leaf.to_string().bold(), "no mutators".dimmed());
        } else {
            let names: Vec<&str> = plans.iter().map(|p| p.method_name.as_str()).collect();
            println!("{}: {}", leaf.to_string().bold(), names.join(", "));
        }
    }
    report_diagnostics(&diagnostics);

    let mutators: usize = results.iter().map(|(_, plans)| plans.len()).sum();
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    println!(
        "checked {} value type(s): {} mutator(s), {} error(s)",
        results.len(),
        mutators,
        errors
    );
    Ok(exit_code(errors))
}

fn plan(pipeline: &MutatorPipeline, paths: &[PathBuf], format: OutputFormat) -> Result<ExitCode> {
    let models = load_models(paths)?;
    let (results, diagnostics) = run_batch(pipeline, &models);
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();

    match format {
        OutputFormat::Json => {
            let output = PlanOutput {
                value_types: results
                    .iter()
                    .map(|(value_type, plans)| ValueTypePlans {
                        value_type,
                        plans: plans.as_slice(),
                    })
                    .collect(),
                diagnostics: &diagnostics,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            for (model, (leaf, plans)) in models.iter().zip(&results) {
                println!("{}", format!("// {leaf}").dimmed());
                let constructed = model.leaf_type();
                for plan in plans {
                    println!("{plan} {{");
                    println!("    return new {}({});", constructed, plan.constructor_arguments());
                    println!("}}");
                }
            }
            report_diagnostics(&diagnostics);
        }
    }
    Ok(exit_code(errors))
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let label = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Note => "note".cyan().bold(),
        };
        eprintln!("{}[{}]: {}", label, diagnostic.kind, diagnostic.message);
        eprintln!("  {} {}", "-->".blue(), diagnostic.location);
    }
}

fn exit_code(errors: usize) -> ExitCode {
    if errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
