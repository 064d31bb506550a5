//! Generator contract.
//!
//! Both the cheap classifier tier and the expensive synthesizer tier are
//! reached through the same [`Generator`] trait; they differ only in the
//! prompt template and the model behind the implementation.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::{FailureKind, Usage};

/// Failure of one generator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generator call timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("generator rate limit reached")]
    RateLimited,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout => FailureKind::Timeout,
            Self::Transport(_) => FailureKind::Transport,
            Self::RateLimited => FailureKind::RateLimited,
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }
}

/// Values substituted into a [`PromptTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(BTreeMap<String, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// A fixed prompt with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Short identifier used in logs and by test fakes.
    pub name: String,
    pub body: String,
}

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("static regex must compile")
});

impl PromptTemplate {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Substitutes every known `{name}` placeholder in one pass.
    ///
    /// Unknown placeholders are left as written, and substituted values are
    /// never re-scanned, so code containing braces is safe to pass in.
    ///
    /// ```
    /// use docgate_core::{PromptTemplate, TemplateVars};
    ///
    /// let template = PromptTemplate::new("greet", "Hello {name}, see {other}.");
    /// let vars = TemplateVars::new().with("name", "{ world }");
    /// assert_eq!(template.render(&vars), "Hello { world }, see {other}.");
    /// ```
    pub fn render(&self, vars: &TemplateVars) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.body, |caps: &Captures<'_>| match vars.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Text returned by a generator plus its cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

impl Completion {
    pub fn new(text: impl Into<String>, usage: Usage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// A blocking request/response text generator.
///
/// Implementations must not retry internally; callers decide whether a
/// failed unit is re-run.
pub trait Generator: Send + Sync {
    fn call(
        &self,
        template: &PromptTemplate,
        vars: &TemplateVars,
    ) -> Result<Completion, GenerationError>;
}

impl<G: Generator + ?Sized> Generator for &G {
    fn call(
        &self,
        template: &PromptTemplate,
        vars: &TemplateVars,
    ) -> Result<Completion, GenerationError> {
        (**self).call(template, vars)
    }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn call(
        &self,
        template: &PromptTemplate,
        vars: &TemplateVars,
    ) -> Result<Completion, GenerationError> {
        (**self).call(template, vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let template = PromptTemplate::new("t", "{a} and {a} then {b}");
        let vars = TemplateVars::new().with("a", "x").with("b", "y");
        assert_eq!(template.render(&vars), "x and x then y");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let template = PromptTemplate::new("t", "code: {code}");
        let vars = TemplateVars::new()
            .with("code", "if (x) { return {code}; }")
            .with("x", "boom");
        assert_eq!(template.render(&vars), "code: if (x) { return {code}; }");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(GenerationError::Timeout.kind(), FailureKind::Timeout);
        assert_eq!(
            GenerationError::Transport("reset".into()).kind(),
            FailureKind::Transport
        );
        assert_eq!(GenerationError::RateLimited.kind(), FailureKind::RateLimited);
        assert_eq!(
            GenerationError::MalformedResponse("empty".into()).kind(),
            FailureKind::MalformedResponse
        );
    }

    struct Echo;

    impl Generator for Echo {
        fn call(
            &self,
            template: &PromptTemplate,
            vars: &TemplateVars,
        ) -> Result<Completion, GenerationError> {
            Ok(Completion::new(template.render(vars), Usage::default()))
        }
    }

    #[test]
    fn test_boxed_generator_delegates() {
        let boxed: Box<dyn Generator> = Box::new(Echo);
        let template = PromptTemplate::new("t", "{v}");
        let out = boxed
            .call(&template, &TemplateVars::new().with("v", "ok"))
            .unwrap();
        assert_eq!(out.text, "ok");
    }
}
