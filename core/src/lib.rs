//! Core types and contracts for the docgate documentation gate.
//!
//! This crate defines what every other docgate crate shares:
//!
//! - [`DocumentableUnit`]: a class, method, or constructor produced by the
//!   structural parser, with its span and existing documentation.
//! - [`HeuristicVerdict`], [`ClassifierVerdict`], [`GeneratedDoc`] and
//!   [`OutcomeRecord`]: the per-stage results of one pipeline pass.
//! - [`DocComment`]: a parsed documentation block (description and tags).
//! - [`Config`]: the immutable run configuration.
//! - [`Generator`]: the contract for the classifier and synthesizer tiers,
//!   failing with [`GenerationError`].
//! - [`SourceParser`]: the contract for the structural parser.
//!
//! Validation ([`validate_generated_doc`], [`find_span_overlaps`]) catches
//! generator output that breaks the documentation contract and edit ranges
//! that would collide when merged back into a file.
//!
//! # Example
//!
//! ```
//! use docgate_core::*;
//!
//! let span = Span::new(0, 90, 1, 12);
//! let unit = DocumentableUnit::new(UnitKind::Method, "close", "public void close()", span)
//!     .with_owner("Connection")
//!     .with_modifiers(["public"])
//!     .with_existing_doc("/** Closes. */", Span::new(0, 14, 1, 1));
//!
//! let doc = DocComment::parse(unit.existing_doc_text().unwrap(), &DocSyntax::default());
//! assert_eq!(doc.description, vec!["Closes."]);
//! let generated = "/**\n * Closes the connection.\n */";
//! assert!(validate_generated_doc(&unit, generated, &DocSyntax::default()).is_empty());
//! ```

mod config;
mod doc;
mod generate;
mod parse;
mod types;
mod validate;

pub use config::{
    Config, ConfigError, DocSyntax, MAX_VARIANTS, ModelConfig, ModelSpec, PlaceholderMatcher,
    Thresholds,
};
pub use doc::{DocComment, OtherTag, TagEntry, is_well_formed};
pub use generate::{Completion, GenerationError, Generator, PromptTemplate, TemplateVars};
pub use parse::{ParseError, SourceParser};
pub use types::*;
pub use validate::{DocValidationError, MergeConflict, find_span_overlaps, validate_generated_doc};
