//! Structured run reporting.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use docgate_core::{Decision, GeneratedDoc, OutcomeRecord, RuleViolation, UnitId, UnitKind, Usage};
use serde::{Deserialize, Serialize};

/// Number of units per terminal decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub kept: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DecisionCounts {
    pub fn from_records(records: &[OutcomeRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.record(record.decision);
        }
        counts
    }

    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Kept => self.kept += 1,
            Decision::Applied => self.applied += 1,
            Decision::Skipped => self.skipped += 1,
            Decision::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.kept + self.applied + self.skipped + self.failed
    }
}

impl AddAssign for DecisionCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.kept += rhs.kept;
        self.applied += rhs.applied;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
    }
}

/// Outcome of one file in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    /// The merged text differs from the original.
    pub changed: bool,
    /// The merged text was written back to disk.
    pub written: bool,
    /// File-level failure (unreadable, unparsable, unwritable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub counts: DecisionCounts,
    pub usage: Usage,
    pub records: Vec<OutcomeRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alternatives: BTreeMap<UnitId, Vec<GeneratedDoc>>,
}

impl FileReport {
    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            changed: false,
            written: false,
            error: Some(error.into()),
            counts: DecisionCounts::default(),
            usage: Usage::default(),
            records: Vec::new(),
            alternatives: BTreeMap::new(),
        }
    }
}

/// Aggregated outcome of a multi-file run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: String,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    pub totals: DecisionCounts,
    pub usage: Usage,
}

impl RunReport {
    /// Builds a report and its totals from per-file reports.
    pub fn new(generated_at: impl Into<String>, dry_run: bool, files: Vec<FileReport>) -> Self {
        let mut totals = DecisionCounts::default();
        let mut usage = Usage::default();
        for file in &files {
            totals += file.counts;
            usage += file.usage;
        }
        Self {
            generated_at: generated_at.into(),
            dry_run,
            files,
            totals,
            usage,
        }
    }

    pub fn changed_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.changed)
    }

    /// `true` when any file or unit failed.
    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0 || self.files.iter().any(|f| f.error.is_some())
    }
}

/// One unit that fails the heuristic gate in check mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFinding {
    pub unit: UnitId,
    pub kind: UnitKind,
    /// 1-based line of the doc block, or of the declaration when undocumented.
    pub line: usize,
    pub violations: Vec<RuleViolation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCheck {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Units that passed the filter and were checked.
    pub checked: usize,
    pub skipped: usize,
    pub findings: Vec<UnitFinding>,
}

/// Heuristic-only audit of a set of files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub generated_at: String,
    pub files: Vec<FileCheck>,
}

impl CheckReport {
    pub fn checked(&self) -> usize {
        self.files.iter().map(|f| f.checked).sum()
    }

    pub fn finding_count(&self) -> usize {
        self.files.iter().map(|f| f.findings.len()).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|f| f.error.is_some())
    }
}

#[cfg(test)]
mod tests {
    use docgate_core::{HeuristicVerdict, SkipReason};

    use super::*;
    use crate::test_support::method_unit;

    #[test]
    fn test_counts_from_records() {
        let records = vec![
            OutcomeRecord::kept(method_unit("a", 20), HeuristicVerdict::Pass, None),
            OutcomeRecord::skipped(method_unit("b", 2), SkipReason::BelowMinLines),
            OutcomeRecord::skipped(method_unit("c", 2), SkipReason::NotPublic),
        ];
        let counts = DecisionCounts::from_records(&records);
        assert_eq!(counts.kept, 1);
        assert_eq!(counts.skipped, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_run_report_totals() {
        let mut a = FileReport::failed("A.java", "boom");
        a.error = None;
        a.counts = DecisionCounts {
            kept: 1,
            applied: 2,
            skipped: 0,
            failed: 0,
        };
        a.usage = Usage {
            calls: 3,
            input_tokens: 10,
            output_tokens: 20,
            cost_usd: 0.5,
        };
        let b = FileReport::failed("B.java", "unreadable");
        let report = RunReport::new("2024-01-01T00:00:00Z", false, vec![a, b]);
        assert_eq!(report.totals.applied, 2);
        assert_eq!(report.usage.calls, 3);
        assert!(report.has_failures());
        assert_eq!(report.changed_files().count(), 0);
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let report = RunReport::new("2024-01-01T00:00:00Z", true, vec![]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"dry_run\":true"));
        assert!(json.contains("\"totals\""));
    }
}
