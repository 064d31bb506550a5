//! Fixed prompt templates for the classifier and synthesizer tiers.

use std::sync::LazyLock;

use docgate_core::{Config, DocumentableUnit, PromptTemplate, TemplateVars, UnitKind};
use regex::Regex;

static THROW_NEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bthrow\s+new\s+([A-Za-z_$][\w$.]*)").expect("static regex must compile")
});
static THROWS_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\)\s*throws\s+([^{;]+)$").expect("static regex must compile")
});

pub const ASSESSMENT_TEMPLATE_NAME: &str = "assess";
pub const GENERATION_TEMPLATE_NAME: &str = "generate";

const ASSESSMENT_BODY: &str = r#"You are reviewing the documentation comment of a Java {unit_kind}.

Name: {unit_name}
Signature: {signature}

Existing documentation:
{existing_doc}

Implementation:
{body}

The documentation is GOOD only if all of the following hold:
1. A documentation comment is present.
2. The description has at least {min_description_lines} lines of real content.
3. It contains no placeholder text such as TODO, FIXME or boilerplate phrases.
4. For methods and constructors, there is exactly one {param_tag} tag per declared parameter, naming that parameter, and no tags for parameters that do not exist.
5. For methods returning a value, there is exactly one {return_tag} tag.
6. For classes, there are no {param_tag} tags.
It must also be clear, correctly formatted, and accurate with respect to the implementation.

Answer with exactly one word: GOOD or IMPROVE."#;

const GENERATION_BODY: &str = r#"Write the documentation comment for a Java {unit_kind}.

Name: {unit_name}
Signature: {signature}
Modifiers: {modifiers}
Parameters: {parameters}
Return type: {return_type}
Potential exceptions: {potential_exceptions}

Implementation:
{body}

{existing_section}

Rules:
- Describe the contract: what the {unit_kind} does, what it expects, and what it guarantees. Do not narrate the implementation step by step.
- Write at least {min_description_lines} lines of description before any tag, and keep every line under {max_line_width} characters.
- {tag_rules}
- {throws_rule}
- Never use placeholder text such as TODO or FIXME.
- Where the existing documentation is accurate, preserve its wording.
- Respond with exactly one documentation block that starts with {doc_open} and ends with {doc_close}. Do not add any text before or after it.
{variant_hint}{guidelines}
Full source file for context:
{file_text}"#;

/// Template sent to the cheap classifier tier.
pub fn assessment_template() -> PromptTemplate {
    PromptTemplate::new(ASSESSMENT_TEMPLATE_NAME, ASSESSMENT_BODY)
}

/// Template sent to the expensive synthesizer tier.
pub fn generation_template() -> PromptTemplate {
    PromptTemplate::new(GENERATION_TEMPLATE_NAME, GENERATION_BODY)
}

pub fn assessment_vars(unit: &DocumentableUnit, config: &Config) -> TemplateVars {
    TemplateVars::new()
        .with("unit_kind", unit.kind.to_string())
        .with("unit_name", unit.id().to_string())
        .with("signature", unit.signature.as_str())
        .with("existing_doc", unit.existing_doc_text().unwrap_or("(none)"))
        .with("body", unit.body_text.as_str())
        .with(
            "min_description_lines",
            config.thresholds.min_description_lines.to_string(),
        )
        .with("param_tag", config.syntax.param_tag.as_str())
        .with("return_tag", config.syntax.return_tag.as_str())
}

/// Variables for one generation call; `variant` > 0 asks for a distinct
/// alternative phrasing.
pub fn generation_vars(
    unit: &DocumentableUnit,
    file_text: &str,
    variant: usize,
    config: &Config,
) -> TemplateVars {
    let syntax = &config.syntax;
    let modifiers = if unit.modifiers.is_empty() {
        "default".to_string()
    } else {
        unit.modifiers.join(" ")
    };
    let parameters = if unit.parameters.is_empty() {
        "(none)".to_string()
    } else {
        unit.parameters
            .iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let existing_section = match unit.existing_doc_text() {
        Some(doc) => format!("Existing documentation to preserve or improve:\n{doc}"),
        None => "There is no existing documentation.".to_string(),
    };
    let tag_rules = tag_rules(unit, config);
    let variant_hint = if variant > 0 {
        format!(
            "- This is alternative version {}. \
             Use different wording from the obvious first draft.\n",
            variant + 1
        )
    } else {
        String::new()
    };
    let guidelines = match &config.generation_guidelines {
        Some(text) if !text.trim().is_empty() => format!("\nHouse style:\n{}\n", text.trim()),
        _ => String::new(),
    };

    TemplateVars::new()
        .with("unit_kind", unit.kind.to_string())
        .with("unit_name", unit.id().to_string())
        .with("signature", unit.signature.as_str())
        .with("modifiers", modifiers)
        .with("parameters", parameters)
        .with("return_type", unit.return_type.as_deref().unwrap_or("(none)"))
        .with("body", unit.body_text.as_str())
        .with("existing_section", existing_section)
        .with(
            "min_description_lines",
            config.thresholds.min_description_lines.to_string(),
        )
        .with("max_line_width", config.thresholds.max_line_width.to_string())
        .with("tag_rules", tag_rules)
        .with("potential_exceptions", exceptions_summary(unit))
        .with("throws_rule", throws_rule(unit))
        .with("doc_open", syntax.open.as_str())
        .with("doc_close", syntax.close.as_str())
        .with("variant_hint", variant_hint)
        .with("guidelines", guidelines)
        .with("file_text", file_text)
}

/// Exceptions a unit can raise: the signature's `throws` list first, then
/// every `throw new X` in the body, without duplicates.
///
/// ```
/// use docgate_core::{DocumentableUnit, Span, UnitKind};
/// use docgate_pipeline::potential_exceptions;
///
/// let unit = DocumentableUnit::new(
///     UnitKind::Method,
///     "open",
///     "public Reader open(Path path) throws IOException",
///     Span::new(0, 200, 1, 12),
/// )
/// .with_body(
///     "{ if (path == null) { throw new IllegalArgumentException(); } return read(path); }",
/// );
///
/// assert_eq!(potential_exceptions(&unit), vec!["IOException", "IllegalArgumentException"]);
/// ```
pub fn potential_exceptions(unit: &DocumentableUnit) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        let name = name.trim();
        if !name.is_empty() && !found.iter().any(|known| known == name) {
            found.push(name.to_string());
        }
    };

    if let Some(caps) = THROWS_CLAUSE_RE.captures(unit.signature.trim()) {
        caps[1].split(',').for_each(&mut push);
    }
    for caps in THROW_NEW_RE.captures_iter(&unit.body_text) {
        push(&caps[1]);
    }
    found
}

fn exceptions_summary(unit: &DocumentableUnit) -> String {
    if unit.kind == UnitKind::Class {
        return "(not applicable to classes)".to_string();
    }
    let exceptions = potential_exceptions(unit);
    if exceptions.is_empty() {
        "(none found)".to_string()
    } else {
        exceptions.join(", ")
    }
}

fn throws_rule(unit: &DocumentableUnit) -> String {
    if unit.kind == UnitKind::Class {
        return "Do not use @throws tags in class documentation.".to_string();
    }
    let exceptions = potential_exceptions(unit);
    if exceptions.is_empty() {
        "Add @throws tags only for exceptions the implementation can actually raise.".to_string()
    } else {
        format!(
            "Add one @throws tag explaining when it is raised for each of: {}.",
            exceptions.join(", ")
        )
    }
}

fn tag_rules(unit: &DocumentableUnit, config: &Config) -> String {
    let syntax = &config.syntax;
    match unit.kind {
        UnitKind::Class => format!(
            "This is a class: do not use any {} tags at all.",
            syntax.param_tag
        ),
        _ => {
            let params = if unit.parameters.is_empty() {
                format!("Do not use any {} tags.", syntax.param_tag)
            } else {
                let names = unit
                    .parameters
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "Use exactly one {} tag with a description for each of: {names}.",
                    syntax.param_tag
                )
            };
            let returns = if unit.returns_value() {
                format!(" Add exactly one {} tag with a description.", syntax.return_tag)
            } else {
                format!(" Do not use a {} tag.", syntax.return_tag)
            };
            format!("{params}{returns}")
        }
    }
}

#[cfg(test)]
mod tests {
    use docgate_core::Parameter;

    use super::*;
    use crate::test_support::{class_unit, method_unit};

    #[test]
    fn test_assessment_prompt_is_fully_rendered() {
        let config = Config::default();
        let unit = method_unit("load", 20);
        let prompt = assessment_template().render(&assessment_vars(&unit, &config));
        assert!(prompt.contains("Sample#load()"));
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("GOOD or IMPROVE"));
        assert!(!prompt.contains("{param_tag}"));
    }

    #[test]
    fn test_class_prompt_forbids_param_tags() {
        let config = Config::default();
        let vars = generation_vars(&class_unit("Ledger"), "", 0, &config);
        let prompt = generation_template().render(&vars);
        assert!(prompt.contains("do not use any @param tags"));
        assert!(prompt.contains("Do not use @throws tags in class documentation."));
        assert!(!prompt.contains("alternative version"));
    }

    #[test]
    fn test_method_prompt_lists_params_and_return() {
        let config = Config::default();
        let unit = method_unit("find", 20)
            .with_parameter(Parameter::new("long", "id"))
            .with_return_type("User");
        let vars = generation_vars(&unit, "class X {}", 2, &config);
        let prompt = generation_template().render(&vars);
        assert!(prompt.contains("each of: id."));
        assert!(prompt.contains("exactly one @return tag"));
        assert!(prompt.contains("alternative version 3"));
        assert!(prompt.trim_end().ends_with("class X {}"));
    }

    #[test]
    fn test_exceptions_from_throws_clause_and_body() {
        let body = r#"{
    if (amount < 0) {
        throw new IllegalArgumentException("amount");
    }
    if (closed) throw new java.lang.IllegalStateException();
    throw new IllegalArgumentException("again");
}"#;
        let mut unit = method_unit("transfer", 20).with_body(body);
        unit.signature =
            "public void transfer(long amount) throws IOException, TimeoutException".to_string();
        assert_eq!(
            potential_exceptions(&unit),
            vec![
                "IOException",
                "TimeoutException",
                "IllegalArgumentException",
                "java.lang.IllegalStateException"
            ]
        );
    }

    #[test]
    fn test_rethrow_of_caught_exception_is_not_listed() {
        let unit = method_unit("close", 20)
            .with_body("{ try { flush(); } catch (IOException e) { throw e; } }");
        assert!(potential_exceptions(&unit).is_empty());
    }

    #[test]
    fn test_generation_prompt_asks_for_throws_tags() {
        let config = Config::default();
        let unit = method_unit("parse", 20)
            .with_body("{ if (text.isEmpty()) { throw new ParseException(text, 0); } }");
        let prompt = generation_template().render(&generation_vars(&unit, "", 0, &config));
        assert!(prompt.contains("Potential exceptions: ParseException"));
        assert!(prompt.contains(
            "one @throws tag explaining when it is raised for each of: ParseException."
        ));

        let vars = generation_vars(&method_unit("run", 20), "", 0, &config);
        let quiet = generation_template().render(&vars);
        assert!(quiet.contains("Potential exceptions: (none found)"));
        assert!(quiet.contains("only for exceptions the implementation can actually raise"));
        assert!(!quiet.contains("{throws_rule}"));
    }

    #[test]
    fn test_guidelines_appended() {
        let config = Config {
            generation_guidelines: Some("Mention thread safety.".to_string()),
            ..Config::default()
        };
        let vars = generation_vars(&method_unit("run", 20), "", 0, &config);
        let prompt = generation_template().render(&vars);
        assert!(prompt.contains("House style:\nMention thread safety."));
    }
}
