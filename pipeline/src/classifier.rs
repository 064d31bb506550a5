//! Stage 2: cheap GOOD/IMPROVE assessment.

use docgate_core::{
    ClassifierVerdict, Config, DocumentableUnit, GenerationError, Generator, PromptTemplate,
    Quality,
};
use tracing::debug;

use crate::prompts;

pub struct QualityClassifier<'a, G> {
    generator: G,
    template: PromptTemplate,
    config: &'a Config,
}

impl<'a, G: Generator> QualityClassifier<'a, G> {
    pub fn new(generator: G, config: &'a Config) -> Self {
        Self {
            generator,
            template: prompts::assessment_template(),
            config,
        }
    }

    /// Makes exactly one classifier call for `unit`.
    ///
    /// # Errors
    ///
    /// Propagates the generator's [`GenerationError`]; the response text
    /// itself can never fail, see [`parse_verdict`].
    pub fn assess(&self, unit: &DocumentableUnit) -> Result<ClassifierVerdict, GenerationError> {
        let vars = prompts::assessment_vars(unit, self.config);
        let completion = self.generator.call(&self.template, &vars)?;
        let quality = parse_verdict(&completion.text);
        debug!(unit = %unit.id(), ?quality, raw = completion.text.trim(), "classifier verdict");
        Ok(ClassifierVerdict {
            quality,
            usage: completion.usage,
        })
    }
}

/// Maps a classifier response to a verdict.
///
/// Only a bare `GOOD` (any case, optional trailing period) is accepted as
/// good; everything else, including empty or chatty answers, is `Improve`.
///
/// ```
/// use docgate_core::Quality;
/// use docgate_pipeline::parse_verdict;
///
/// assert_eq!(parse_verdict(" good.\n"), Quality::Good);
/// assert_eq!(parse_verdict("IMPROVE"), Quality::Improve);
/// assert_eq!(parse_verdict("GOOD, mostly"), Quality::Improve);
/// ```
pub fn parse_verdict(text: &str) -> Quality {
    let token = text.trim();
    let token = token.strip_suffix('.').unwrap_or(token);
    if token.eq_ignore_ascii_case("GOOD") {
        Quality::Good
    } else {
        Quality::Improve
    }
}

#[cfg(test)]
mod tests {
    use docgate_core::{GenerationError, Quality};

    use super::*;
    use crate::test_support::{ScriptedGenerator, method_unit};

    #[test]
    fn test_good_response() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok("GOOD".to_string())]);
        let classifier = QualityClassifier::new(&generator, &config);
        let verdict = classifier.assess(&method_unit("run", 20)).unwrap();
        assert_eq!(verdict.quality, Quality::Good);
        assert_eq!(verdict.usage.calls, 1);
        assert_eq!(generator.calls(), 1);
        assert_eq!(generator.templates(), vec!["assess"]);
    }

    #[test]
    fn test_ambiguous_response_is_improve() {
        for raw in ["", "Maybe", "GOOD GOOD", "It is GOOD", "NOT GOOD"] {
            assert_eq!(parse_verdict(raw), Quality::Improve, "{raw:?}");
        }
    }

    #[test]
    fn test_empty_response_is_improve_and_billed() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Ok(String::new())]);
        let classifier = QualityClassifier::new(&generator, &config);
        let verdict = classifier.assess(&method_unit("run", 20)).unwrap();
        assert_eq!(verdict.quality, Quality::Improve);
        assert_eq!(verdict.usage.calls, 1);
    }

    #[test]
    fn test_transport_error_propagates() {
        let config = Config::default();
        let generator = ScriptedGenerator::new([Err(GenerationError::Timeout)]);
        let classifier = QualityClassifier::new(&generator, &config);
        let err = classifier.assess(&method_unit("run", 20)).unwrap_err();
        assert_eq!(err, GenerationError::Timeout);
    }
}
