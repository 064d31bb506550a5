//! Stage 3: expensive documentation generation.
//!
//! Each generator response is accepted only if it is a single delimited
//! block that satisfies the tag contract for the unit and passes every
//! heuristic rule. A rejected response is a [`GenerationError::MalformedResponse`].

use chrono::Utc;
use docgate_core::{
    Config, DocumentableUnit, GeneratedDoc, GenerationError, Generator, PromptTemplate, Usage,
    validate_generated_doc,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::heuristics::HeuristicGate;
use crate::prompts;

/// Accepted candidates for one unit, primary first.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub variants: Vec<GeneratedDoc>,
    /// Cost of every call made, rejected responses included.
    pub usage: Usage,
    /// Number of calls whose output was unusable.
    pub rejected: usize,
}

impl Synthesis {
    pub fn primary(&self) -> Option<&GeneratedDoc> {
        self.variants.first()
    }
}

/// No usable candidate was produced.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct SynthesisError {
    /// The first failure encountered.
    pub error: GenerationError,
    pub usage: Usage,
}

pub struct DocSynthesizer<'a, G> {
    generator: G,
    template: PromptTemplate,
    config: &'a Config,
    gate: HeuristicGate<'a>,
}

impl<'a, G: Generator> DocSynthesizer<'a, G> {
    pub fn new(generator: G, config: &'a Config) -> Self {
        Self {
            generator,
            template: prompts::generation_template(),
            config,
            gate: HeuristicGate::new(config),
        }
    }

    /// Issues `variant_count` independent generation calls for `unit`.
    ///
    /// Candidates that fail are dropped and the rest are re-indexed so the
    /// primary is always variant 0. Fails only when no call produced a
    /// usable candidate.
    pub fn generate(
        &self,
        unit: &DocumentableUnit,
        file_text: &str,
        variant_count: usize,
    ) -> Result<Synthesis, SynthesisError> {
        let unit_id = unit.id();
        let mut usage = Usage::default();
        let mut accepted: Vec<(String, Usage)> = Vec::new();
        let mut first_error = None;
        let mut rejected = 0;

        for variant in 0..variant_count.max(1) {
            let vars = prompts::generation_vars(unit, file_text, variant, self.config);
            let result = self
                .generator
                .call(&self.template, &vars)
                .and_then(|completion| {
                    usage += completion.usage;
                    self.check(unit, completion.text.trim())
                        .map(|text| (text, completion.usage))
                });

            match result {
                Ok(candidate) => accepted.push(candidate),
                Err(error) => {
                    warn!(unit = %unit_id, variant, %error, "generation candidate rejected");
                    rejected += 1;
                    first_error.get_or_insert(error);
                }
            }
        }

        if accepted.is_empty() {
            let error = first_error.unwrap_or_else(|| {
                GenerationError::MalformedResponse("no generation calls were made".to_string())
            });
            return Err(SynthesisError { error, usage });
        }

        let generated_at = Utc::now().to_rfc3339();
        let variants = accepted
            .into_iter()
            .enumerate()
            .map(|(idx, (text, call_usage))| {
                let at = generated_at.clone();
                GeneratedDoc::generated(unit_id.clone(), text, idx, at, call_usage)
            })
            .collect::<Vec<_>>();

        debug!(unit = %unit_id, variants = variants.len(), rejected, "synthesized documentation");
        Ok(Synthesis {
            variants,
            usage,
            rejected,
        })
    }

    fn check(&self, unit: &DocumentableUnit, text: &str) -> Result<String, GenerationError> {
        let errors = validate_generated_doc(unit, text, &self.config.syntax);
        if !errors.is_empty() {
            let detail = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GenerationError::MalformedResponse(detail));
        }

        let verdict = self.gate.evaluate_text(unit, Some(text));
        if !verdict.is_pass() {
            let detail = verdict
                .violations()
                .iter()
                .map(|v| format!("{}: {}", v.rule, v.detail))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GenerationError::MalformedResponse(format!(
                "generated documentation fails checks: {detail}"
            )));
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use docgate_core::{DocOrigin, Parameter};

    use super::*;
    use crate::test_support::{
        ADD_TODO_DOC, ScriptedGenerator, add_todo_unit, class_unit, method_unit,
    };

    const FIND_DOC: &str = concat!(
        "/**\n",
        " * Looks up a user by id.\n",
        " * Returns null when absent.\n",
        " *\n",
        " * @param id the user id\n",
        " * @return the user, or null\n",
        " */",
    );

    fn find_unit() -> DocumentableUnit {
        method_unit("find", 20)
            .with_parameter(Parameter::new("long", "id"))
            .with_return_type("User")
    }

    #[test]
    fn test_single_variant_accepted() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(format!("\n{FIND_DOC}\n"))]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let synthesis = synthesizer.generate(&find_unit(), "", 1).unwrap();
        assert_eq!(synthesis.variants.len(), 1);
        let primary = synthesis.primary().unwrap();
        assert_eq!(primary.text, FIND_DOC);
        assert_eq!(primary.variant, 0);
        assert_eq!(primary.origin, DocOrigin::Generated);
        assert_eq!(primary.unit.as_str(), "Sample#find(long)");
        assert_eq!(generator.templates(), vec!["generate"]);
    }

    #[test]
    fn test_chatty_response_is_malformed() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(format!("Sure! Here it is:\n{FIND_DOC}"))]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let err = synthesizer.generate(&find_unit(), "", 1).unwrap_err();
        assert!(matches!(err.error, GenerationError::MalformedResponse(_)));
        assert_eq!(err.usage.calls, 1);
    }

    #[test]
    fn test_empty_response_is_rejected_but_billed() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(String::new())]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let err = synthesizer.generate(&find_unit(), "", 1).unwrap_err();
        assert!(matches!(err.error, GenerationError::MalformedResponse(_)));
        assert_eq!(err.usage.calls, 1);
        assert!((err.usage.cost_usd - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_class_doc_with_param_tag_rejected() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(
            "/**\n * Ledger of balances.\n * Thread safe.\n * @param <T> entry\n */".to_string(),
        )]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let err = synthesizer.generate(&class_unit("Ledger"), "", 1).unwrap_err();
        assert!(matches!(err.error, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn test_candidate_must_pass_heuristics() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(
            "/**\n * Looks up a user.\n * @param id the id\n * @return the user\n */".to_string(),
        )]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let err = synthesizer.generate(&find_unit(), "", 1).unwrap_err();
        match err.error {
            GenerationError::MalformedResponse(detail) => assert!(detail.contains("too-short")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_todo_domain_doc_is_accepted() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(ADD_TODO_DOC.to_string())]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let synthesis = synthesizer.generate(&add_todo_unit(), "", 1).unwrap();
        assert_eq!(synthesis.primary().unwrap().text, ADD_TODO_DOC);
        assert_eq!(synthesis.rejected, 0);
    }

    #[test]
    fn test_wrong_param_name_with_matching_count_is_rejected() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([
            Ok(FIND_DOC.replace("@param id", "@param userId")),
            Ok(FIND_DOC.to_string()),
        ]);
        let synthesizer = DocSynthesizer::new(&generator, &config);

        let synthesis = synthesizer.generate(&find_unit(), "", 2).unwrap();
        assert_eq!(synthesis.rejected, 1);
        assert_eq!(synthesis.variants.len(), 1);
        assert_eq!(synthesis.primary().unwrap().text, FIND_DOC);
    }

    #[test]
    fn test_wrong_param_name_alone_fails_the_unit() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(FIND_DOC.replace("@param id", "@param key"))]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let err = synthesizer.generate(&find_unit(), "", 1).unwrap_err();
        match err.error {
            GenerationError::MalformedResponse(detail) => assert!(detail.contains("key")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_partial_variant_failure_reindexes() {
        let config = Config::default();
        let second = FIND_DOC.replace("Returns null when absent.", "Never throws.");
        let generator = ScriptedGenerator::new([
            Err(GenerationError::RateLimited),
            Ok(FIND_DOC.to_string()),
            Ok(second.clone()),
        ]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let synthesis = synthesizer.generate(&find_unit(), "", 3).unwrap();
        assert_eq!(synthesis.rejected, 1);
        let texts: Vec<&str> = synthesis.variants.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec![FIND_DOC, second.as_str()]);
        assert_eq!(synthesis.variants[1].variant, 1);
        assert_eq!(synthesis.usage.calls, 2);
    }

    #[test]
    fn test_all_variants_failing_returns_first_error() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([
            Err(GenerationError::Timeout),
            Err(GenerationError::RateLimited),
        ]);
        let synthesizer = DocSynthesizer::new(&generator, &config);
        let err = synthesizer.generate(&find_unit(), "", 2).unwrap_err();
        assert_eq!(err.error, GenerationError::Timeout);
        assert_eq!(generator.calls(), 2);
    }
}
