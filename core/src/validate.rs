//! Validation of generated documentation and of unit edit ranges.
//!
//! [`validate_generated_doc`] checks the structural contract every accepted
//! generator output must meet. [`find_span_overlaps`] checks that the edit
//! ranges of a file's units are disjoint before any text is rewritten.
//!
//! # Examples
//!
//! ```
//! use docgate_core::*;
//!
//! let span = Span::new(0, 40, 1, 3);
//! let class = DocumentableUnit::new(UnitKind::Class, "Cache", "public class Cache", span)
//!     .with_modifiers(["public"]);
//! let syntax = DocSyntax::default();
//!
//! assert!(validate_generated_doc(&class, "/**\n * LRU cache.\n */", &syntax).is_empty());
//!
//! let tagged = "/**\n * LRU cache.\n * @param size max\n */";
//! let errors = validate_generated_doc(&class, tagged, &syntax);
//! assert_eq!(errors, vec![DocValidationError::ClassHasParamTag]);
//! ```

use std::ops::Range;

use thiserror::Error;

use crate::{DocComment, DocSyntax, DocumentableUnit, UnitId, UnitKind, is_well_formed};

/// Reasons a generated documentation text is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocValidationError {
    /// Not exactly one delimited block (conversational text, a second block,
    /// or missing delimiters).
    #[error("response is not a single delimited documentation block")]
    NotDelimited,
    #[error("class documentation contains parameter tags")]
    ClassHasParamTag,
    #[error("value-returning method documentation has no return tag")]
    MissingReturnTag,
    /// Void methods, constructors and classes must not document a return value.
    #[error("return tag present on a unit that returns nothing")]
    UnexpectedReturnTag,
}

/// Validates a generator response for `unit`.
///
/// Returns every problem found; an empty list means the text may be
/// accepted. A text that is not delimited is reported alone since its tags
/// cannot be trusted.
pub fn validate_generated_doc(
    unit: &DocumentableUnit,
    text: &str,
    syntax: &DocSyntax,
) -> Vec<DocValidationError> {
    if !is_well_formed(text, syntax) {
        return vec![DocValidationError::NotDelimited];
    }

    let doc = DocComment::parse(text, syntax);
    let mut errors = Vec::new();

    if unit.kind == UnitKind::Class && !doc.params.is_empty() {
        errors.push(DocValidationError::ClassHasParamTag);
    }

    match (unit.returns_value(), doc.returns.is_empty()) {
        (true, true) => errors.push(DocValidationError::MissingReturnTag),
        (false, false) => errors.push(DocValidationError::UnexpectedReturnTag),
        _ => {}
    }

    errors
}

/// Two units whose edit ranges overlap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("edit ranges of {first} and {second} overlap")]
pub struct MergeConflict {
    pub first: UnitId,
    pub second: UnitId,
}

fn ranges_overlap(a: &Range<usize>, b: &Range<usize>) -> bool {
    match (a.is_empty(), b.is_empty()) {
        // Two insertions at the same point would race for the same bytes.
        (true, true) => a.start == b.start,
        (true, false) => b.start <= a.start && a.start < b.end,
        (false, true) => a.start <= b.start && b.start < a.end,
        (false, false) => a.start < b.end && b.start < a.end,
    }
}

/// Returns every pair of units whose edit ranges overlap.
///
/// The edit range of a unit is its existing doc range, or an empty range at
/// the declaration start when it has none (see
/// [`DocumentableUnit::edit_range`]).
pub fn find_span_overlaps(units: &[&DocumentableUnit]) -> Vec<MergeConflict> {
    let mut conflicts = Vec::new();
    for (i, a) in units.iter().enumerate() {
        let range_a = a.edit_range();
        for b in &units[i + 1..] {
            if ranges_overlap(&range_a, &b.edit_range()) {
                conflicts.push(MergeConflict {
                    first: a.id(),
                    second: b.id(),
                });
            }
        }
    }
    conflicts
}
