mod git;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use docgate_core::{Config, Decision, SourceParser};
use docgate_java::JavaParser;
use docgate_llm::AnthropicGenerator;
use docgate_pipeline::{
    CheckReport, OutputFormat, Pipeline, RetryPolicy, Retrying, RunOptions, RunReport,
    check_files, format_check, format_report, record_detail, run_files,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit status of `check` when any unit fails the heuristic gate.
const CHECK_FINDINGS_EXIT: i32 = 2;
/// Exit status of `run` when any unit or file failed.
const RUN_FAILED_EXIT: i32 = 3;

#[derive(Debug, Parser)]
#[command(name = "docgate")]
#[command(about = "Gate and regenerate Javadoc with cheap checks first and model calls last")]
#[command(version)]
struct Cli {
    /// Log debug events from every pipeline stage.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full pipeline and write regenerated documentation; exits 3 when
    /// any unit or file failed.
    Run(RunArgs),
    /// Audit documentation with the heuristic gate only; exits 2 on findings.
    Check(CheckArgs),
    /// Print the documentable units of one Java file as JSON.
    Units(UnitsArgs),
    /// Write the default configuration as YAML.
    InitConfig(InitConfigArgs),
}

/// Options shared by `run` and `check`.
#[derive(Debug, Args)]
struct ConfigArgs {
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Minimum declaration length in lines for methods and constructors.
    #[arg(long)]
    min_method_lines: Option<usize>,
    /// Minimum file length in lines for class-level documentation.
    #[arg(long)]
    min_file_lines: Option<usize>,
    /// Consult the classifier even when every heuristic passes.
    #[arg(long)]
    force: bool,
    /// Let a GOOD verdict keep only docs that passed the heuristics.
    #[arg(long)]
    classifier_advisory: bool,
    /// Files processed in parallel (default: from config).
    #[arg(long)]
    jobs: Option<usize>,
}

/// Which files to process.
#[derive(Debug, Args)]
struct FileArgs {
    /// Java files and/or directories searched recursively.
    files: Vec<PathBuf>,
    /// Process Java files changed since this git ref.
    #[arg(long, conflicts_with = "changed")]
    changed_since: Option<String>,
    /// Process Java files changed since origin/$GITHUB_BASE_REF (default origin/main).
    #[arg(long)]
    changed: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    files: FileArgs,
    #[command(flatten)]
    config: ConfigArgs,
    /// Candidate documents generated per regenerated unit (1-5).
    #[arg(long, env = "DOCGATE_VARIANTS")]
    variants: Option<usize>,
    /// Anthropic API key.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Attempts per unit for timeouts, transport errors and rate limits.
    #[arg(long, default_value_t = 3)]
    attempts: u32,
    /// Report what would change without writing files.
    #[arg(long)]
    dry_run: bool,
    /// Write the run report to this file instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Report format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    files: FileArgs,
    #[command(flatten)]
    config: ConfigArgs,
    /// Write the check report to this file instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Report format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct UnitsArgs {
    /// Java source file.
    file: PathBuf,
}

#[derive(Debug, Args)]
struct InitConfigArgs {
    /// Destination path.
    #[arg(default_value = "docgate.yaml")]
    path: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run_run(args),
        Command::Check(args) => run_check(args),
        Command::Units(args) => run_units(args),
        Command::InitConfig(args) => run_init_config(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,docgate=debug"
    } else {
        "warn,docgate=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_run(args: RunArgs) -> Result<i32, String> {
    let mut config = resolve_config(&args.config)?;
    if let Some(variants) = args.variants {
        config.variant_count = variants;
    }
    config.validate().map_err(|e| e.to_string())?;

    let files = resolve_files(&args.files)?;
    if files.is_empty() {
        println!("No Java files to process.");
        return Ok(0);
    }

    let api_key = args.api_key.unwrap_or_default();
    let models = &config.models;
    let classifier =
        AnthropicGenerator::new(&models.api_base, api_key.clone(), models.classifier.clone())
            .map_err(|e| e.to_string())?;
    let synthesizer =
        AnthropicGenerator::new(&models.api_base, api_key, models.synthesizer.clone())
            .map_err(|e| e.to_string())?;

    let policy = RetryPolicy {
        max_attempts: args.attempts.max(1),
        ..RetryPolicy::default()
    };
    let pipeline = Pipeline::new(&config, classifier, synthesizer);
    let processor = Retrying::new(pipeline, policy, |wait: Duration| std::thread::sleep(wait));

    let options = RunOptions {
        jobs: args.config.jobs.unwrap_or(config.jobs),
        write: !args.dry_run,
        ..RunOptions::default()
    };
    info!(files = files.len(), dry_run = args.dry_run, "starting run");
    let report = run_files(&files, &JavaParser::new(), &processor, &options)
        .map_err(|e| e.to_string())?;

    if github_actions() {
        print_run_annotations(&report);
    }

    let rendered = format_report(&report, args.format)?;
    emit(&rendered, args.report.as_deref())?;

    eprintln!(
        "{} file(s) changed; kept {}, applied {}, skipped {}, failed {}; estimated cost ${:.4}",
        report.changed_files().count(),
        report.totals.kept,
        report.totals.applied,
        report.totals.skipped,
        report.totals.failed,
        report.usage.cost_usd
    );
    Ok(if report.has_failures() { RUN_FAILED_EXIT } else { 0 })
}

fn run_check(args: CheckArgs) -> Result<i32, String> {
    let config = resolve_config(&args.config)?;
    config.validate().map_err(|e| e.to_string())?;

    let files = resolve_files(&args.files)?;
    if files.is_empty() {
        println!("No Java files to check.");
        return Ok(0);
    }

    let jobs = args.config.jobs.unwrap_or(config.jobs);
    let report = check_files(&files, &JavaParser::new(), &config, jobs).map_err(|e| e.to_string())?;

    if github_actions() {
        print_check_annotations(&report);
    }

    let rendered = format_check(&report, args.format)?;
    emit(&rendered, args.report.as_deref())?;

    if report.has_errors() {
        return Err("one or more files could not be checked".to_string());
    }
    Ok(if report.finding_count() > 0 { CHECK_FINDINGS_EXIT } else { 0 })
}

fn run_units(args: UnitsArgs) -> Result<i32, String> {
    let source = fs::read_to_string(&args.file)
        .map_err(|err| format!("Failed to read '{}': {err}", args.file.display()))?;
    let units = JavaParser::new().parse(&source).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&units)
        .map_err(|e| format!("Failed to serialize units: {e}"))?;
    println!("{json}");
    Ok(0)
}

fn run_init_config(args: InitConfigArgs) -> Result<i32, String> {
    if args.path.exists() && !args.force {
        return Err(format!(
            "'{}' already exists (use --force to overwrite)",
            args.path.display()
        ));
    }
    Config::default()
        .save(&args.path)
        .map_err(|err| format!("Failed to write '{}': {err}", args.path.display()))?;
    println!("Wrote default configuration to '{}'.", args.path.display());
    Ok(0)
}

/// Loads the config file (or defaults) and applies flag overrides.
fn resolve_config(args: &ConfigArgs) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => Config::default(),
    };

    if let Some(lines) = args.min_method_lines {
        config.thresholds.min_method_lines = lines;
    }
    if let Some(lines) = args.min_file_lines {
        config.thresholds.min_file_lines = lines;
    }
    if args.force {
        config.force_override = true;
    }
    if args.classifier_advisory {
        config.classifier_authoritative = false;
    }
    Ok(config)
}

fn resolve_files(args: &FileArgs) -> Result<Vec<PathBuf>, String> {
    let base_ref = match (&args.changed_since, args.changed) {
        (Some(reference), _) => Some(reference.clone()),
        (None, true) => Some(git::default_base_ref()),
        (None, false) => None,
    };

    let mut files = match base_ref {
        Some(reference) => {
            info!(base = %reference, "collecting changed files");
            git::changed_java_files(&reference)?
        }
        None if args.files.is_empty() => {
            return Err(
                "Specify Java files or directories, --changed or --changed-since".to_string(),
            );
        }
        None => Vec::new(),
    };
    files.extend(collect_java_files(&args.files)?);
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_java_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk_dir(input, &mut out)?;
        } else if input.is_file() {
            out.push(input.clone());
        } else {
            return Err(format!("'{}' does not exist", input.display()));
        }
    }
    Ok(out)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), String> {
    let entries = fs::read_dir(dir)
        .map_err(|err| format!("Failed to read directory '{}': {err}", dir.display()))?;
    for entry in entries {
        let path = entry
            .map_err(|err| format!("Failed to read directory '{}': {err}", dir.display()))?
            .path();
        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "java") {
            out.push(path);
        }
    }
    Ok(())
}

fn emit(rendered: &str, path: Option<&Path>) -> Result<(), String> {
    match path {
        Some(path) => fs::write(path, rendered)
            .map_err(|err| format!("Failed to write '{}': {err}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

/// Escapes a workflow command message.
fn escape_annotation(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn print_run_annotations(report: &RunReport) {
    for file in &report.files {
        if let Some(ref error) = file.error {
            println!("::error file={}::{}", file.path, escape_annotation(error));
            continue;
        }
        for record in &file.records {
            let level = match record.decision {
                Decision::Failed => "warning",
                Decision::Applied => "notice",
                Decision::Kept | Decision::Skipped => continue,
            };
            println!(
                "::{level} file={},line={}::{} {}: {}",
                file.path,
                record.unit.edit_line(),
                record.unit.id(),
                record.decision,
                escape_annotation(&record_detail(record))
            );
        }
    }
}

fn print_check_annotations(report: &CheckReport) {
    for file in &report.files {
        if let Some(ref error) = file.error {
            println!("::error file={}::{}", file.path, escape_annotation(error));
            continue;
        }
        for finding in &file.findings {
            let rules = finding
                .violations
                .iter()
                .map(|v| v.detail.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            println!(
                "::warning file={},line={}::{}: {}",
                file.path,
                finding.line,
                finding.unit,
                escape_annotation(&rules)
            );
        }
    }
}
