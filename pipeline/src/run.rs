//! Multi-file runs over a bounded worker pool.

use std::path::{Path, PathBuf};

use chrono::Utc;
use docgate_core::{Config, SourceParser};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::filter::UnitFilter;
use crate::heuristics::HeuristicGate;
use crate::orchestrator::{CancelToken, UnitProcessor, process_file};
use crate::report::{CheckReport, DecisionCounts, FileCheck, FileReport, RunReport, UnitFinding};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: docgate_core::ParseError,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Settings for [`run_files`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Files processed in parallel.
    pub jobs: usize,
    /// Write changed files back; `false` is a dry run.
    pub write: bool,
    pub cancel: CancelToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            write: true,
            cancel: CancelToken::new(),
        }
    }
}

/// Runs the pipeline over one file on disk.
pub fn run_file<P>(
    path: &Path,
    parser: &dyn SourceParser,
    processor: &P,
    options: &RunOptions,
) -> Result<FileReport, RunError>
where
    P: UnitProcessor + ?Sized,
{
    let source = std::fs::read_to_string(path).map_err(|source| RunError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let outcome =
        process_file(processor, parser, &source, &options.cancel).map_err(|source| RunError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let changed = outcome.changed();
    let written = changed && options.write;
    if written {
        std::fs::write(path, outcome.new_text()).map_err(|source| RunError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let counts = DecisionCounts::from_records(&outcome.records);
    info!(
        path = %path.display(),
        kept = counts.kept,
        applied = counts.applied,
        skipped = counts.skipped,
        failed = counts.failed,
        written,
        "file complete"
    );

    Ok(FileReport {
        path: path.display().to_string(),
        changed,
        written,
        error: None,
        counts,
        usage: outcome.usage(),
        alternatives: outcome.merge.alternatives,
        records: outcome.records,
    })
}

/// Runs the pipeline over `paths` on a pool of `options.jobs` threads.
///
/// A file that cannot be read, parsed or written is reported with its error
/// and does not stop the others. Files are reported sorted by path.
pub fn run_files<P>(
    paths: &[PathBuf],
    parser: &dyn SourceParser,
    processor: &P,
    options: &RunOptions,
) -> Result<RunReport, RunError>
where
    P: UnitProcessor + ?Sized,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()?;

    let mut files: Vec<FileReport> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                run_file(path, parser, processor, options).unwrap_or_else(|err| {
                    warn!(path = %path.display(), error = %err, "file failed");
                    FileReport::failed(path.display().to_string(), err.to_string())
                })
            })
            .collect()
    });

    // Sort by path for deterministic output.
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(RunReport::new(Utc::now().to_rfc3339(), !options.write, files))
}

/// Runs only the filter and heuristic gate over `source`.
pub fn check_source(
    path: &str,
    source: &str,
    parser: &dyn SourceParser,
    config: &Config,
) -> Result<FileCheck, docgate_core::ParseError> {
    let units = parser.parse(source)?;
    let filter = UnitFilter::new(config);
    let gate = HeuristicGate::new(config);
    let file_lines = source.lines().count();

    let mut check = FileCheck {
        path: path.to_string(),
        error: None,
        checked: 0,
        skipped: 0,
        findings: Vec::new(),
    };
    for unit in &units {
        if filter.exclusion(unit, file_lines).is_some() {
            check.skipped += 1;
            continue;
        }
        check.checked += 1;
        let verdict = gate.evaluate(unit);
        if !verdict.is_pass() {
            check.findings.push(UnitFinding {
                unit: unit.id(),
                kind: unit.kind,
                line: unit.edit_line(),
                violations: verdict.violations().to_vec(),
            });
        }
    }
    Ok(check)
}

/// Heuristic-only audit of `paths`; no generator is ever called.
pub fn check_files(
    paths: &[PathBuf],
    parser: &dyn SourceParser,
    config: &Config,
    jobs: usize,
) -> Result<CheckReport, RunError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()?;

    let mut files: Vec<FileCheck> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let label = path.display().to_string();
                let result = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read {label}: {e}"))
                    .and_then(|source| {
                        check_source(&label, &source, parser, config)
                            .map_err(|e| format!("failed to parse {label}: {e}"))
                    });
                result.unwrap_or_else(|error| FileCheck {
                    path: label.clone(),
                    error: Some(error),
                    checked: 0,
                    skipped: 0,
                    findings: Vec::new(),
                })
            })
            .collect()
    });
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(CheckReport {
        generated_at: Utc::now().to_rfc3339(),
        files,
    })
}
