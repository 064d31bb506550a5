//! Stage 1: rule-based documentation checks.
//!
//! Every rule runs independently and the verdict lists every violation, in
//! rule order. The gate is deterministic and performs no I/O.

use std::collections::HashSet;

use docgate_core::{
    Config, DocComment, DocumentableUnit, HeuristicRule, HeuristicVerdict, PlaceholderMatcher,
    RuleViolation, UnitKind,
};

#[derive(Debug, Clone)]
pub struct HeuristicGate<'a> {
    config: &'a Config,
    placeholders: PlaceholderMatcher,
}

impl<'a> HeuristicGate<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            placeholders: config.placeholder_matcher(),
        }
    }

    /// Evaluates the unit's existing documentation.
    pub fn evaluate(&self, unit: &DocumentableUnit) -> HeuristicVerdict {
        self.evaluate_text(unit, unit.existing_doc_text())
    }

    /// Evaluates `doc` as if it were the documentation of `unit`.
    ///
    /// Used both for existing docs and for generated candidates, so that
    /// accepted output satisfies the same rules it was generated to fix.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_core::*;
    /// use docgate_pipeline::HeuristicGate;
    ///
    /// let config = Config::default();
    /// let gate = HeuristicGate::new(&config);
    /// let signature = "public User find(long id)";
    /// let span = Span::new(0, 300, 1, 14);
    /// let unit = DocumentableUnit::new(UnitKind::Method, "find", signature, span)
    ///     .with_modifiers(["public"])
    ///     .with_parameter(Parameter::new("long", "id"))
    ///     .with_return_type("User");
    ///
    /// let verdict = gate.evaluate_text(&unit, Some("/** Gets user. */"));
    /// assert_eq!(
    ///     verdict.rules(),
    ///     vec![HeuristicRule::TooShort, HeuristicRule::ParamMismatch, HeuristicRule::ReturnTag]
    /// );
    /// ```
    pub fn evaluate_text(&self, unit: &DocumentableUnit, doc: Option<&str>) -> HeuristicVerdict {
        let Some(text) = doc else {
            return HeuristicVerdict::from_violations(vec![RuleViolation::new(
                HeuristicRule::MissingDoc,
                "no documentation present",
            )]);
        };

        let thresholds = &self.config.thresholds;
        let parsed = DocComment::parse(text, &self.config.syntax);
        let mut violations = Vec::new();

        if parsed.description.len() < thresholds.min_description_lines {
            violations.push(RuleViolation::new(
                HeuristicRule::TooShort,
                format!(
                    "description has {} line(s), expected at least {}",
                    parsed.description.len(),
                    thresholds.min_description_lines
                ),
            ));
        }

        if let Some(marker) = self.placeholders.find(text) {
            violations.push(RuleViolation::new(
                HeuristicRule::Placeholder,
                format!("contains placeholder: {marker}"),
            ));
        }

        match unit.kind {
            UnitKind::Class => {
                if !parsed.params.is_empty() {
                    violations.push(RuleViolation::new(
                        HeuristicRule::ClassHasParamTag,
                        format!("class documentation has {} parameter tag(s)", parsed.params.len()),
                    ));
                }
            }
            UnitKind::Method | UnitKind::Constructor => {
                if let Some(detail) = param_mismatch(unit, &parsed) {
                    violations.push(RuleViolation::new(HeuristicRule::ParamMismatch, detail));
                }
            }
        }

        if unit.returns_value() && parsed.returns.len() != 1 {
            let detail = if parsed.returns.is_empty() {
                format!(
                    "missing {} tag for {} method",
                    self.config.syntax.return_tag,
                    unit.return_type.as_deref().unwrap_or_default()
                )
            } else {
                format!("{} {} tags present", parsed.returns.len(), self.config.syntax.return_tag)
            };
            violations.push(RuleViolation::new(HeuristicRule::ReturnTag, detail));
        }

        let empty_params: Vec<&str> = parsed
            .params
            .iter()
            .filter(|p| p.description.is_empty())
            .map(|p| p.name.as_str())
            .collect();
        let empty_returns = parsed.returns.iter().filter(|r| r.is_empty()).count();
        if !empty_params.is_empty() || empty_returns > 0 {
            let mut parts = Vec::new();
            if !empty_params.is_empty() {
                parts.push(format!(
                    "{} without description: {}",
                    self.config.syntax.param_tag,
                    empty_params.join(", ")
                ));
            }
            if empty_returns > 0 {
                parts.push(format!("{} without description", self.config.syntax.return_tag));
            }
            violations.push(RuleViolation::new(HeuristicRule::EmptyTag, parts.join("; ")));
        }

        let too_long = text
            .lines()
            .filter(|line| line.trim().chars().count() > thresholds.max_line_width)
            .count();
        if too_long > 0 {
            violations.push(RuleViolation::new(
                HeuristicRule::LineTooLong,
                format!(
                    "{too_long} line(s) longer than {} characters",
                    thresholds.max_line_width
                ),
            ));
        }

        HeuristicVerdict::from_violations(violations)
    }
}

/// Parameter tags must name exactly the declared parameters, once each.
///
/// Type-parameter tags (`@param <T>`) document generics, not arguments, and
/// are ignored here.
fn param_mismatch(unit: &DocumentableUnit, doc: &DocComment) -> Option<String> {
    let declared: Vec<&str> = unit.parameters.iter().map(|p| p.name.as_str()).collect();
    let documented: Vec<&str> = doc
        .param_names()
        .into_iter()
        .filter(|name| !is_type_parameter(name))
        .collect();

    let unknown: Vec<&str> = documented
        .iter()
        .copied()
        .filter(|name| !declared.contains(name))
        .collect();
    if !unknown.is_empty() {
        return Some(format!(
            "tag names parameter(s) not in signature: {}",
            unknown.join(", ")
        ));
    }

    let missing: Vec<&str> = declared
        .iter()
        .copied()
        .filter(|name| !documented.contains(name))
        .collect();
    if !missing.is_empty() {
        return Some(format!("undocumented parameter(s): {}", missing.join(", ")));
    }

    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = documented
        .iter()
        .copied()
        .filter(|name| !seen.insert(*name))
        .collect();
    if !duplicates.is_empty() {
        return Some(format!("parameter(s) documented twice: {}", duplicates.join(", ")));
    }

    None
}

fn is_type_parameter(name: &str) -> bool {
    name.len() > 2 && name.starts_with('<') && name.ends_with('>')
}

#[cfg(test)]
mod tests {
    use docgate_core::{Parameter, Span};

    use super::*;
    use crate::test_support::{ADD_TODO_DOC, add_todo_unit, class_unit, method_unit};

    fn documented(unit: DocumentableUnit, doc: &str) -> DocumentableUnit {
        unit.with_existing_doc(doc, Span::new(0, doc.len(), 1, doc.lines().count()))
    }

    fn two_param_method() -> DocumentableUnit {
        method_unit("transfer", 20)
            .with_parameter(Parameter::new("Account", "from"))
            .with_parameter(Parameter::new("Account", "to"))
            .with_return_type("boolean")
    }

    const GOOD_TRANSFER: &str = concat!(
        "/**\n",
        " * Moves funds between accounts.\n",
        " * The transfer is atomic.\n",
        " *\n",
        " * @param from source account\n",
        " * @param to target account\n",
        " * @return true when the transfer settled\n",
        " */",
    );

    #[test]
    fn test_missing_doc_is_reported_alone() {
        let config = Config::default();
        let verdict = HeuristicGate::new(&config).evaluate(&two_param_method());
        assert_eq!(verdict.rules(), vec![HeuristicRule::MissingDoc]);
    }

    #[test]
    fn test_complete_doc_passes() {
        let config = Config::default();
        let unit = documented(two_param_method(), GOOD_TRANSFER);
        assert!(HeuristicGate::new(&config).evaluate(&unit).is_pass());
    }

    #[test]
    fn test_unknown_param_name_with_matching_count() {
        let config = Config::default();
        let doc = GOOD_TRANSFER.replace("@param to", "@param target");
        let verdict = HeuristicGate::new(&config).evaluate(&documented(two_param_method(), &doc));
        assert_eq!(verdict.rules(), vec![HeuristicRule::ParamMismatch]);
        assert!(verdict.violations()[0].detail.contains("target"));
    }

    #[test]
    fn test_generic_method_type_parameter_tag_is_allowed() {
        let config = Config::default();
        let unit = documented(
            method_unit("firstOf", 20)
                .with_parameter(Parameter::new("List<T>", "items"))
                .with_return_type("T"),
            concat!(
                "/**\n",
                " * Returns the first element.\n",
                " * The list is not modified.\n",
                " *\n",
                " * @param <T> element type\n",
                " * @param items the source list\n",
                " * @return the first element\n",
                " */",
            ),
        );
        assert!(HeuristicGate::new(&config).evaluate(&unit).is_pass());
    }

    #[test]
    fn test_type_parameter_tag_does_not_stand_in_for_argument() {
        let config = Config::default();
        let unit = documented(
            method_unit("firstOf", 20)
                .with_parameter(Parameter::new("List<T>", "items"))
                .with_return_type("T"),
            concat!(
                "/**\n",
                " * Returns the first element.\n",
                " * The list is not modified.\n",
                " *\n",
                " * @param <T> element type\n",
                " * @return the first element\n",
                " */",
            ),
        );
        let verdict = HeuristicGate::new(&config).evaluate(&unit);
        assert_eq!(verdict.rules(), vec![HeuristicRule::ParamMismatch]);
        assert!(verdict.violations()[0].detail.contains("items"));
    }

    #[test]
    fn test_duplicate_param_tag() {
        let config = Config::default();
        let doc = GOOD_TRANSFER.replace(
            " * @param to target account\n",
            " * @param to target account\n * @param to again\n",
        );
        let verdict = HeuristicGate::new(&config).evaluate(&documented(two_param_method(), &doc));
        assert_eq!(verdict.rules(), vec![HeuristicRule::ParamMismatch]);
    }

    #[test]
    fn test_duplicate_return_tag() {
        let config = Config::default();
        let doc = GOOD_TRANSFER.replace(" */", " * @return again\n */");
        let verdict = HeuristicGate::new(&config).evaluate(&documented(two_param_method(), &doc));
        assert_eq!(verdict.rules(), vec![HeuristicRule::ReturnTag]);
    }

    #[test]
    fn test_placeholder_marker() {
        let config = Config::default();
        let doc = GOOD_TRANSFER.replace("The transfer is atomic.", "FIXME: check locking.");
        let verdict = HeuristicGate::new(&config).evaluate(&documented(two_param_method(), &doc));
        assert_eq!(verdict.rules(), vec![HeuristicRule::Placeholder]);
    }

    #[test]
    fn test_domain_words_are_not_placeholders() {
        let config = Config::default();
        let gate = HeuristicGate::new(&config);

        let add_todo = documented(add_todo_unit(), ADD_TODO_DOC);
        assert!(gate.evaluate(&add_todo).is_pass());

        let release = documented(
            method_unit("release", 20),
            "/**\n * Releases the shackle on the gate.\n * Safe to call twice.\n */",
        );
        assert!(gate.evaluate(&release).is_pass());
    }

    #[test]
    fn test_upper_case_todo_in_domain_doc_is_placeholder() {
        let config = Config::default();
        let doc = ADD_TODO_DOC.replace("The item is stored", "TODO the item is stored");
        let verdict = HeuristicGate::new(&config).evaluate(&documented(add_todo_unit(), &doc));
        assert_eq!(verdict.rules(), vec![HeuristicRule::Placeholder]);
        assert!(verdict.violations()[0].detail.contains("TODO"));
    }

    #[test]
    fn test_class_with_param_tag() {
        let config = Config::default();
        let unit = documented(
            class_unit("Ledger"),
            "/**\n * Keeps balances.\n * Thread safe.\n * @param <T> entry type\n */",
        );
        let verdict = HeuristicGate::new(&config).evaluate(&unit);
        assert_eq!(verdict.rules(), vec![HeuristicRule::ClassHasParamTag]);
    }

    #[test]
    fn test_empty_tags_and_long_lines() {
        let config = Config::default();
        let long = "word ".repeat(30);
        let doc = format!(
            "/**\n * Moves funds.\n * {long}\n * @param from\n * @param to target\n * @return\n */"
        );
        let verdict = HeuristicGate::new(&config).evaluate(&documented(two_param_method(), &doc));
        assert_eq!(
            verdict.rules(),
            vec![HeuristicRule::EmptyTag, HeuristicRule::LineTooLong]
        );
    }

    #[test]
    fn test_constructor_needs_no_return_tag() {
        let config = Config::default();
        let mut ctor = method_unit("Account", 20).with_parameter(Parameter::new("String", "owner"));
        ctor.kind = UnitKind::Constructor;
        let unit = documented(
            ctor,
            "/**\n * Opens an account.\n * Starts at zero.\n * @param owner holder name\n */",
        );
        assert!(HeuristicGate::new(&config).evaluate(&unit).is_pass());
    }

    #[test]
    fn test_one_line_doc_on_three_param_method() {
        let config = Config::default();
        let unit = documented(
            method_unit("getUser", 20)
                .with_parameter(Parameter::new("long", "id"))
                .with_parameter(Parameter::new("boolean", "cached"))
                .with_parameter(Parameter::new("Locale", "locale"))
                .with_return_type("User"),
            "/** Gets user. */",
        );
        let verdict = HeuristicGate::new(&config).evaluate(&unit);
        assert_eq!(
            verdict.rules(),
            vec![
                HeuristicRule::TooShort,
                HeuristicRule::ParamMismatch,
                HeuristicRule::ReturnTag
            ]
        );
    }
}
