//! Per-unit decision state machine and per-file composition.
//!
//! A unit moves through `filter → heuristics → classifier → synthesizer`
//! and always ends in exactly one of `Kept`, `Applied`, `Skipped` or
//! `Failed`. One unit's failure never stops its siblings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use docgate_core::{
    Config, DocumentableUnit, FailureDetail, GeneratedDoc, Generator, OutcomeRecord, ParseError,
    Quality, SkipReason, SourceParser, Stage, Usage,
};
use tracing::{debug, info, warn};

use crate::classifier::QualityClassifier;
use crate::filter::UnitFilter;
use crate::heuristics::HeuristicGate;
use crate::merger::{MergeOutcome, merge};
use crate::synthesizer::DocSynthesizer;

/// File-level inputs shared by every unit of one file.
#[derive(Debug, Clone, Copy)]
pub struct UnitContext<'a> {
    pub file_text: &'a str,
    pub file_lines: usize,
}

impl<'a> UnitContext<'a> {
    pub fn new(file_text: &'a str) -> Self {
        Self {
            file_text,
            file_lines: file_text.lines().count(),
        }
    }
}

/// Anything that turns one unit into one outcome.
///
/// Implemented by [`Pipeline`] and by decorators such as
/// [`Retrying`](crate::Retrying).
pub trait UnitProcessor: Send + Sync {
    fn process_unit(&self, unit: &DocumentableUnit, ctx: &UnitContext<'_>) -> OutcomeRecord;
}

/// Cooperative cancellation signal shared between a caller and a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The three-stage gate over one configuration.
pub struct Pipeline<'a, C, S> {
    config: &'a Config,
    filter: UnitFilter<'a>,
    gate: HeuristicGate<'a>,
    classifier: QualityClassifier<'a, C>,
    synthesizer: DocSynthesizer<'a, S>,
}

impl<'a, C: Generator, S: Generator> Pipeline<'a, C, S> {
    /// Builds a pipeline with a cheap `classifier` tier and an expensive
    /// `synthesizer` tier.
    pub fn new(config: &'a Config, classifier: C, synthesizer: S) -> Self {
        Self {
            config,
            filter: UnitFilter::new(config),
            gate: HeuristicGate::new(config),
            classifier: QualityClassifier::new(classifier, config),
            synthesizer: DocSynthesizer::new(synthesizer, config),
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }
}

impl<C: Generator, S: Generator> UnitProcessor for Pipeline<'_, C, S> {
    fn process_unit(&self, unit: &DocumentableUnit, ctx: &UnitContext<'_>) -> OutcomeRecord {
        let unit_id = unit.id();

        if let Some(reason) = self.filter.exclusion(unit, ctx.file_lines) {
            debug!(unit = %unit_id, %reason, "skipped");
            return OutcomeRecord::skipped(unit.clone(), reason);
        }

        let verdict = self.gate.evaluate(unit);
        if verdict.is_pass() && !self.config.force_override {
            debug!(unit = %unit_id, "heuristics passed; kept");
            return OutcomeRecord::kept(unit.clone(), verdict, None);
        }
        debug!(unit = %unit_id, rules = ?verdict.rules(), "escalating to classifier");

        let assessment = match self.classifier.assess(unit) {
            Ok(assessment) => assessment,
            Err(err) => {
                warn!(unit = %unit_id, error = %err, "classifier call failed");
                return OutcomeRecord::failed(
                    unit.clone(),
                    Some(verdict),
                    None,
                    FailureDetail {
                        stage: Stage::Classifier,
                        kind: err.kind(),
                        message: err.to_string(),
                    },
                    Usage::default(),
                );
            }
        };

        if assessment.quality == Quality::Good
            && (self.config.classifier_authoritative || verdict.is_pass())
        {
            debug!(unit = %unit_id, "classifier judged documentation good; kept");
            return OutcomeRecord::kept(unit.clone(), verdict, Some(assessment));
        }

        let synthesis = match self
            .synthesizer
            .generate(unit, ctx.file_text, self.config.variant_count)
        {
            Ok(synthesis) => synthesis,
            Err(err) => {
                warn!(unit = %unit_id, error = %err.error, "synthesizer failed");
                return OutcomeRecord::failed(
                    unit.clone(),
                    Some(verdict),
                    Some(assessment.quality),
                    FailureDetail {
                        stage: Stage::Synthesizer,
                        kind: err.error.kind(),
                        message: err.error.to_string(),
                    },
                    assessment.usage + err.usage,
                );
            }
        };

        let usage = assessment.usage + synthesis.usage;
        let mut variants = synthesis.variants.into_iter();
        let Some(primary) = variants.next() else {
            // generate() only succeeds with at least one variant.
            return OutcomeRecord::kept(unit.clone(), verdict, Some(assessment));
        };

        let mut alternatives = Vec::new();
        if let Some(previous) = unit.existing_doc_text() {
            alternatives.push(GeneratedDoc::previous(
                unit_id.clone(),
                previous,
                Utc::now().to_rfc3339(),
            ));
        }
        alternatives.extend(variants);

        debug!(unit = %unit_id, alternatives = alternatives.len(), "documentation regenerated");
        OutcomeRecord::applied(unit.clone(), verdict, assessment, primary.text, alternatives, usage)
    }
}

/// Everything one file produced.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub original: String,
    pub merge: MergeOutcome,
    pub records: Vec<OutcomeRecord>,
}

impl FileOutcome {
    pub fn new_text(&self) -> &str {
        &self.merge.text
    }

    pub fn changed(&self) -> bool {
        self.merge.changed(&self.original)
    }

    pub fn usage(&self) -> Usage {
        self.records
            .iter()
            .fold(Usage::default(), |acc, record| acc + record.usage)
    }
}

/// Runs every unit of `source` through `processor` and merges the result.
///
/// The parser is called exactly once. When `cancel` fires, units not yet
/// started are recorded as `Skipped(Cancelled)`; already decided units are
/// still merged, and each applied edit is a complete doc block.
pub fn process_file<P>(
    processor: &P,
    parser: &dyn SourceParser,
    source: &str,
    cancel: &CancelToken,
) -> Result<FileOutcome, ParseError>
where
    P: UnitProcessor + ?Sized,
{
    let units = parser.parse(source)?;
    let ctx = UnitContext::new(source);

    let mut records = Vec::with_capacity(units.len());
    for unit in units {
        if cancel.is_cancelled() {
            records.push(OutcomeRecord::skipped(unit, SkipReason::Cancelled));
            continue;
        }
        records.push(processor.process_unit(&unit, &ctx));
    }

    let merge = merge(source, &mut records);
    info!(
        units = records.len(),
        changed = merge.changed(source),
        "processed file"
    );

    Ok(FileOutcome {
        original: source.to_string(),
        merge,
        records,
    })
}
