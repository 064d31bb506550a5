//! Applying accepted documentation back into a file.
//!
//! All `Applied` records of one file are written in a single pass, last in
//! file first, so earlier offsets stay valid. Overlapping edit ranges abort
//! the whole merge.

use std::collections::BTreeMap;

use docgate_core::{
    Decision, FailureDetail, FailureKind, GeneratedDoc, MergeConflict, OutcomeRecord, Stage, UnitId,
    find_span_overlaps,
};
use tracing::{debug, warn};

use crate::mutate::{Edit, doc_edit, replace};

/// Result of merging one file.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// New file text; the original text when a conflict aborted the merge.
    pub text: String,
    /// Alternatives of every regenerated unit, keyed by unit identity.
    pub alternatives: BTreeMap<UnitId, Vec<GeneratedDoc>>,
    pub conflicts: Vec<MergeConflict>,
}

impl MergeOutcome {
    pub fn changed(&self, original: &str) -> bool {
        self.text != original
    }
}

/// Writes the applied documentation of `records` into `original`.
///
/// Records that are not `Applied` leave their bytes untouched. If any two
/// units have overlapping edit ranges, nothing is written and every record
/// is turned into a `Failed` merge-conflict outcome.
pub fn merge(original: &str, records: &mut [OutcomeRecord]) -> MergeOutcome {
    let conflicts = {
        let units: Vec<_> = records.iter().map(|r| &r.unit).collect();
        find_span_overlaps(&units)
    };
    if !conflicts.is_empty() {
        mark_conflicted(records, &conflicts);
        return MergeOutcome {
            text: original.to_string(),
            alternatives: BTreeMap::new(),
            conflicts,
        };
    }

    let mut edits: Vec<Edit> = records
        .iter()
        .filter(|r| r.decision == Decision::Applied)
        .filter_map(|r| r.applied_doc.as_deref().map(|doc| doc_edit(original, &r.unit, doc)))
        .collect();
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    let mut text = original.to_string();
    for edit in &edits {
        text = replace(&text, edit.range.clone(), &edit.text);
    }
    debug!(edits = edits.len(), "merged documentation edits");

    let alternatives = records
        .iter()
        .filter(|r| !r.alternatives.is_empty())
        .map(|r| (r.unit.id(), r.alternatives.clone()))
        .collect();

    MergeOutcome {
        text,
        alternatives,
        conflicts,
    }
}

fn mark_conflicted(records: &mut [OutcomeRecord], conflicts: &[MergeConflict]) {
    let message = conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    warn!(conflicts = conflicts.len(), "overlapping edit ranges; file left unchanged");

    for record in records.iter_mut() {
        record.decision = Decision::Failed;
        record.skip_reason = None;
        record.applied_doc = record.unit.existing_doc_text().map(str::to_string);
        record.alternatives.clear();
        record.failure = Some(FailureDetail {
            stage: Stage::Merge,
            kind: FailureKind::MergeConflict,
            message: message.clone(),
        });
    }
}
