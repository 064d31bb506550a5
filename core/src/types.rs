//! Type definitions for documentable units and pipeline outcomes.
//!
//! This module defines the data model shared by the parser, the gating
//! pipeline and the presentation layer. Units are produced fresh by the
//! structural parser for every file run and are treated as immutable while
//! the pipeline evaluates them.

use std::fmt;
use std::ops::{Add, AddAssign, Range};

use serde::{Deserialize, Serialize};

/// Kind of a documentable unit.
///
/// Interfaces, enums and records are all reported as [`UnitKind::Class`];
/// the tag rules for them are identical.
///
/// # Examples
///
/// ```
/// use docgate_core::UnitKind;
///
/// assert_eq!(UnitKind::Constructor.to_string(), "constructor");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Class-like type declaration.
    Class,
    /// Method declaration.
    Method,
    /// Constructor declaration.
    Constructor,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Method => write!(f, "method"),
            Self::Constructor => write!(f, "constructor"),
        }
    }
}

/// One declared parameter of a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name as declared.
    pub name: String,
    /// Declared type text (e.g. `List<String>`).
    pub type_name: String,
}

impl Parameter {
    /// Creates a parameter from its declared type and name.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Byte and line range in the owning file.
///
/// Bytes are a half-open `start..end` range; lines are 1-based and
/// inclusive.
///
/// # Examples
///
/// ```
/// use docgate_core::Span;
///
/// let span = Span::new(10, 42, 3, 7);
/// assert_eq!(span.byte_range(), 10..42);
/// assert_eq!(span.line_count(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    pub fn new(start_byte: usize, end_byte: usize, start_line: usize, end_line: usize) -> Self {
        Self {
            start_byte,
            end_byte,
            start_line,
            end_line,
        }
    }

    /// Returns the half-open byte range.
    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }

    /// Returns the number of lines covered (at least 1).
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Documentation block found immediately before a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingDoc {
    /// Raw comment text, delimiters included, exactly as in the file.
    pub text: String,
    /// Location of the comment bytes.
    pub span: Span,
}

/// Stable textual identity of a unit within one file.
///
/// Classes are identified by their (possibly nested) name; methods and
/// constructors by `Owner#name(Type, Type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One class, method, or constructor eligible for documentation.
///
/// Built by the structural parser. Use [`DocumentableUnit::new`] followed by
/// the `with_*` builder methods.
///
/// # Examples
///
/// ```
/// use docgate_core::*;
///
/// let unit = DocumentableUnit::new(
///     UnitKind::Method,
///     "findUser",
///     "public User findUser(long id)",
///     Span::new(120, 480, 12, 30),
/// )
/// .with_owner("UserService")
/// .with_modifiers(["public"])
/// .with_parameter(Parameter::new("long", "id"))
/// .with_return_type("User");
///
/// assert!(unit.is_public());
/// assert!(unit.returns_value());
/// assert_eq!(unit.id().as_str(), "UserService#findUser(long)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentableUnit {
    pub kind: UnitKind,
    pub name: String,
    /// Dotted name of the enclosing type, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub signature: String,
    pub modifiers: Vec<String>,
    pub parameters: Vec<Parameter>,
    /// Declared return type; `None` for `void`, classes and constructors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Declaration span (annotations and modifiers included).
    pub span: Span,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_doc: Option<ExistingDoc>,
    /// Implementation text; generator input only.
    pub body_text: String,
}

impl DocumentableUnit {
    pub fn new(
        kind: UnitKind,
        name: impl Into<String>,
        signature: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            owner: None,
            signature: signature.into(),
            modifiers: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            span,
            existing_doc: None,
            body_text: String::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_modifiers<I, S>(mut self, modifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modifiers = modifiers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_existing_doc(mut self, text: impl Into<String>, span: Span) -> Self {
        self.existing_doc = Some(ExistingDoc {
            text: text.into(),
            span,
        });
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body_text = body.into();
        self
    }

    /// Returns the identity used to key outcomes and alternatives.
    pub fn id(&self) -> UnitId {
        match self.kind {
            UnitKind::Class => match &self.owner {
                Some(owner) => UnitId::new(format!("{owner}.{}", self.name)),
                None => UnitId::new(self.name.clone()),
            },
            UnitKind::Method | UnitKind::Constructor => {
                let types = self
                    .parameters
                    .iter()
                    .map(|p| p.type_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                match &self.owner {
                    Some(owner) => UnitId::new(format!("{owner}#{}({types})", self.name)),
                    None => UnitId::new(format!("{}({types})", self.name)),
                }
            }
        }
    }

    /// Returns `true` if the unit carries the `public` modifier.
    pub fn is_public(&self) -> bool {
        self.modifiers.iter().any(|m| m == "public")
    }

    /// Returns `true` for methods with a non-void return type.
    pub fn returns_value(&self) -> bool {
        self.kind == UnitKind::Method && self.return_type.is_some()
    }

    pub fn existing_doc_text(&self) -> Option<&str> {
        self.existing_doc.as_ref().map(|doc| doc.text.as_str())
    }

    /// Number of lines in the declaration span.
    pub fn line_count(&self) -> usize {
        self.span.line_count()
    }

    /// Byte range a documentation edit for this unit touches.
    ///
    /// This is the existing doc range, or an empty range at the start of the
    /// declaration when the unit has no documentation.
    pub fn edit_range(&self) -> Range<usize> {
        match &self.existing_doc {
            Some(doc) => doc.span.byte_range(),
            None => self.span.start_byte..self.span.start_byte,
        }
    }

    /// First line of the edit region (1-based), for annotations.
    pub fn edit_line(&self) -> usize {
        match &self.existing_doc {
            Some(doc) => doc.span.start_line,
            None => self.span.start_line,
        }
    }
}

/// Identifier of one heuristic rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeuristicRule {
    /// No documentation block present.
    MissingDoc,
    /// Description (tags excluded) shorter than the configured line count.
    TooShort,
    /// Known placeholder marker or boilerplate phrase present.
    Placeholder,
    /// Parameter tags do not name exactly the declared parameters.
    ParamMismatch,
    /// Missing or duplicate return tag on a value-returning method.
    ReturnTag,
    /// Parameter tag present on a class.
    ClassHasParamTag,
    /// Parameter or return tag without a description.
    EmptyTag,
    /// Documentation line wider than the configured width.
    LineTooLong,
}

impl fmt::Display for HeuristicRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MissingDoc => "missing-doc",
            Self::TooShort => "too-short",
            Self::Placeholder => "placeholder",
            Self::ParamMismatch => "param-mismatch",
            Self::ReturnTag => "return-tag",
            Self::ClassHasParamTag => "class-has-param-tag",
            Self::EmptyTag => "empty-tag",
            Self::LineTooLong => "line-too-long",
        };
        f.write_str(label)
    }
}

/// One violated rule with a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule: HeuristicRule,
    pub detail: String,
}

impl RuleViolation {
    pub fn new(rule: HeuristicRule, detail: impl Into<String>) -> Self {
        Self {
            rule,
            detail: detail.into(),
        }
    }
}

/// Stage 1 result.
///
/// `Fail` always carries at least one violation; build verdicts with
/// [`HeuristicVerdict::from_violations`] to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicVerdict {
    Pass,
    Fail(Vec<RuleViolation>),
}

impl HeuristicVerdict {
    /// Returns `Pass` for an empty list and `Fail` otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_core::{HeuristicRule, HeuristicVerdict, RuleViolation};
    ///
    /// assert!(HeuristicVerdict::from_violations(Vec::new()).is_pass());
    ///
    /// let verdict = HeuristicVerdict::from_violations(vec![
    ///     RuleViolation::new(HeuristicRule::MissingDoc, "no documentation present"),
    /// ]);
    /// assert_eq!(verdict.rules(), vec![HeuristicRule::MissingDoc]);
    /// ```
    pub fn from_violations(violations: Vec<RuleViolation>) -> Self {
        if violations.is_empty() {
            Self::Pass
        } else {
            Self::Fail(violations)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn violations(&self) -> &[RuleViolation] {
        match self {
            Self::Pass => &[],
            Self::Fail(violations) => violations,
        }
    }

    /// Violated rule ids in evaluation order.
    pub fn rules(&self) -> Vec<HeuristicRule> {
        self.violations().iter().map(|v| v.rule).collect()
    }

    pub fn has(&self, rule: HeuristicRule) -> bool {
        self.violations().iter().any(|v| v.rule == rule)
    }
}

/// Token and cost accounting for generator calls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            calls: self.calls + rhs.calls,
            input_tokens: self.input_tokens + rhs.input_tokens,
            output_tokens: self.output_tokens + rhs.output_tokens,
            cost_usd: self.cost_usd + rhs.cost_usd,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}

/// Stage 2 label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quality {
    Good,
    Improve,
}

/// Stage 2 result with the classifier call's cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub quality: Quality,
    pub usage: Usage,
}

/// Where an alternative documentation text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocOrigin {
    /// The documentation that was in the file before regeneration.
    Previous,
    /// Produced by the synthesizer.
    Generated,
}

/// One candidate documentation text.
///
/// Generated candidates are only constructed after passing validation; the
/// previous documentation of a regenerated unit is wrapped with
/// [`GeneratedDoc::previous`] so it can be listed as an alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDoc {
    pub text: String,
    /// Primary is 0, alternates are 1..N.
    pub variant: usize,
    pub origin: DocOrigin,
    pub unit: UnitId,
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub usage: Usage,
}

impl GeneratedDoc {
    pub fn generated(
        unit: UnitId,
        text: impl Into<String>,
        variant: usize,
        generated_at: impl Into<String>,
        usage: Usage,
    ) -> Self {
        Self {
            text: text.into(),
            variant,
            origin: DocOrigin::Generated,
            unit,
            generated_at: generated_at.into(),
            usage,
        }
    }

    pub fn previous(unit: UnitId, text: impl Into<String>, captured_at: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            variant: 0,
            origin: DocOrigin::Previous,
            unit,
            generated_at: captured_at.into(),
            usage: Usage::default(),
        }
    }
}

/// Terminal decision for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Existing documentation left as is.
    Kept,
    /// Documentation regenerated and written into the file.
    #[serde(alias = "regenerated")]
    Applied,
    /// Excluded before any check ran.
    Skipped,
    /// A generator call or the merge failed; the file was not touched for
    /// this unit.
    Failed,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kept => write!(f, "kept"),
            Self::Applied => write!(f, "applied"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Why a unit was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotPublic,
    BelowMinLines,
    FileTooSmall,
    Accessor,
    /// Processing was abandoned before reaching the unit.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPublic => write!(f, "not_public"),
            Self::BelowMinLines => write!(f, "below_min_lines"),
            Self::FileTooSmall => write!(f, "file_too_small"),
            Self::Accessor => write!(f, "accessor"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Structured failure code for a `Failed` unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    RateLimited,
    MalformedResponse,
    MergeConflict,
}

impl FailureKind {
    /// Returns `true` for failures a caller may reasonably retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport | Self::RateLimited)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Transport => write!(f, "transport"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::MergeConflict => write!(f, "merge_conflict"),
        }
    }
}

/// Pipeline stage a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classifier,
    Synthesizer,
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
}

/// Per-unit result of one pipeline pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub unit: DocumentableUnit,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristic: Option<HeuristicVerdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<Quality>,
    /// Documentation now in the file for this unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_doc: Option<String>,
    /// Documentation not applied; the previous doc comes first when the unit
    /// was regenerated.
    pub alternatives: Vec<GeneratedDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    pub usage: Usage,
}

impl OutcomeRecord {
    pub fn skipped(unit: DocumentableUnit, reason: SkipReason) -> Self {
        let applied_doc = unit.existing_doc_text().map(str::to_string);
        Self {
            unit,
            decision: Decision::Skipped,
            skip_reason: Some(reason),
            heuristic: None,
            classifier: None,
            applied_doc,
            alternatives: Vec::new(),
            failure: None,
            usage: Usage::default(),
        }
    }

    pub fn kept(
        unit: DocumentableUnit,
        heuristic: HeuristicVerdict,
        classifier: Option<ClassifierVerdict>,
    ) -> Self {
        let applied_doc = unit.existing_doc_text().map(str::to_string);
        let usage = classifier.as_ref().map(|c| c.usage).unwrap_or_default();
        Self {
            unit,
            decision: Decision::Kept,
            skip_reason: None,
            heuristic: Some(heuristic),
            classifier: classifier.map(|c| c.quality),
            applied_doc,
            alternatives: Vec::new(),
            failure: None,
            usage,
        }
    }

    pub fn applied(
        unit: DocumentableUnit,
        heuristic: HeuristicVerdict,
        classifier: ClassifierVerdict,
        applied_doc: String,
        alternatives: Vec<GeneratedDoc>,
        usage: Usage,
    ) -> Self {
        Self {
            unit,
            decision: Decision::Applied,
            skip_reason: None,
            heuristic: Some(heuristic),
            classifier: Some(classifier.quality),
            applied_doc: Some(applied_doc),
            alternatives,
            failure: None,
            usage,
        }
    }

    pub fn failed(
        unit: DocumentableUnit,
        heuristic: Option<HeuristicVerdict>,
        classifier: Option<Quality>,
        failure: FailureDetail,
        usage: Usage,
    ) -> Self {
        let applied_doc = unit.existing_doc_text().map(str::to_string);
        Self {
            unit,
            decision: Decision::Failed,
            skip_reason: None,
            heuristic,
            classifier,
            applied_doc,
            alternatives: Vec::new(),
            failure: Some(failure),
            usage,
        }
    }

    /// Human-readable failure description, if the unit failed.
    pub fn error_detail(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|f| format!("{}: {}", f.kind, f.message))
    }
}
