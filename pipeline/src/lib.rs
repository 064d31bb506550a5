//! Three-stage documentation quality gate.
//!
//! Units produced by a [`SourceParser`](docgate_core::SourceParser) pass
//! through, in order:
//!
//! 1. [`UnitFilter`]: drops private, trivial and accessor units.
//! 2. [`HeuristicGate`]: free, deterministic rule checks on the existing doc.
//! 3. [`QualityClassifier`]: a cheap generator call judging GOOD or IMPROVE.
//! 4. [`DocSynthesizer`]: an expensive generator call producing new docs.
//!
//! [`Pipeline`] drives the per-unit state machine and [`process_file`] merges
//! every applied doc back into the source text via [`merge`]. [`run_files`]
//! fans out over many files on a bounded worker pool.
//!
//! # Example
//!
//! ```
//! use docgate_core::*;
//! use docgate_pipeline::{HeuristicGate, UnitFilter};
//!
//! let config = Config::default();
//! let signature = "public User getUser(long id)";
//! let span = Span::new(0, 400, 1, 20);
//! let unit = DocumentableUnit::new(UnitKind::Method, "getUser", signature, span)
//!     .with_owner("UserService")
//!     .with_modifiers(["public"])
//!     .with_parameter(Parameter::new("long", "id"))
//!     .with_return_type("User")
//!     .with_existing_doc("/** Gets user. */", Span::new(0, 17, 1, 1));
//!
//! assert_eq!(UnitFilter::new(&config).exclusion(&unit, 200), None);
//! let verdict = HeuristicGate::new(&config).evaluate(&unit);
//! assert!(verdict.has(HeuristicRule::TooShort));
//! assert!(verdict.has(HeuristicRule::ReturnTag));
//! ```

mod classifier;
mod filter;
mod heuristics;
mod merger;
mod mutate;
mod orchestrator;
mod output;
mod prompts;
mod report;
mod retry;
mod run;
mod synthesizer;

pub use classifier::{QualityClassifier, parse_verdict};
pub use filter::{UnitFilter, is_accessor};
pub use heuristics::HeuristicGate;
pub use merger::{MergeOutcome, merge};
pub use mutate::{Edit, apply_doc, doc_edit, render_doc, replace};
pub use orchestrator::{
    CancelToken, FileOutcome, Pipeline, UnitContext, UnitProcessor, process_file,
};
pub use output::{OutputFormat, format_check, format_report, record_detail};
pub use prompts::{
    ASSESSMENT_TEMPLATE_NAME, GENERATION_TEMPLATE_NAME, assessment_template, assessment_vars,
    generation_template, generation_vars, potential_exceptions,
};
pub use report::{CheckReport, DecisionCounts, FileCheck, FileReport, RunReport, UnitFinding};
pub use retry::{RetryPolicy, Retrying};
pub use run::{RunError, RunOptions, check_files, check_source, run_file, run_files};
pub use synthesizer::{DocSynthesizer, Synthesis, SynthesisError};

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use docgate_core::{
        Completion, DocumentableUnit, GenerationError, Generator, Parameter, PromptTemplate, Span,
        TemplateVars, UnitKind, Usage,
    };

    /// A public method on `Sample` spanning `lines` lines.
    pub fn method_unit(name: &str, lines: usize) -> DocumentableUnit {
        DocumentableUnit::new(
            UnitKind::Method,
            name,
            format!("public void {name}()"),
            Span::new(0, lines * 10, 1, lines),
        )
        .with_owner("Sample")
        .with_modifiers(["public"])
        .with_body("{ work(); more(); }")
    }

    /// A correct doc for [`add_todo_unit`] whose prose uses the word "todo".
    pub const ADD_TODO_DOC: &str = concat!(
        "/**\n",
        " * Adds a todo item to the owner's list.\n",
        " * The item is stored before this returns.\n",
        " *\n",
        " * @param todo the todo item to store\n",
        " * @return the stored todo item\n",
        " */",
    );

    /// `TodoService#addTodo(Todo todo)` returning `Todo`.
    pub fn add_todo_unit() -> DocumentableUnit {
        DocumentableUnit::new(
            UnitKind::Method,
            "addTodo",
            "public Todo addTodo(Todo todo)",
            Span::new(0, 300, 1, 15),
        )
        .with_owner("TodoService")
        .with_modifiers(["public"])
        .with_parameter(Parameter::new("Todo", "todo"))
        .with_return_type("Todo")
        .with_body("{ validate(todo); return repository.save(todo); }")
    }

    /// A public top-level class spanning 40 lines.
    pub fn class_unit(name: &str) -> DocumentableUnit {
        DocumentableUnit::new(
            UnitKind::Class,
            name,
            format!("public class {name}"),
            Span::new(0, 800, 1, 40),
        )
        .with_modifiers(["public"])
        .with_body("{ }")
    }

    fn call_usage() -> Usage {
        Usage {
            calls: 1,
            input_tokens: 100,
            output_tokens: 10,
            cost_usd: 0.01,
        }
    }

    /// Replays scripted responses in order; errors once exhausted.
    pub struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
        templates: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn new<I>(responses: I) -> Self
        where
            I: IntoIterator<Item = Result<String, GenerationError>>,
        {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                templates: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.templates.lock().unwrap().len()
        }

        /// Template names in call order.
        pub fn templates(&self) -> Vec<String> {
            self.templates.lock().unwrap().clone()
        }
    }

    impl Generator for ScriptedGenerator {
        fn call(
            &self,
            template: &PromptTemplate,
            _vars: &TemplateVars,
        ) -> Result<Completion, GenerationError> {
            self.templates.lock().unwrap().push(template.name.clone());
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(Completion::new(text, call_usage())),
                Some(Err(err)) => Err(err),
                None => Err(GenerationError::MalformedResponse(
                    "no scripted response left".to_string(),
                )),
            }
        }
    }

    /// Answers every call with a closure.
    pub struct FnGenerator<F>(F);

    impl<F> FnGenerator<F>
    where
        F: Fn(&PromptTemplate, &TemplateVars) -> Result<String, GenerationError> + Send + Sync,
    {
        pub fn new(f: F) -> Self {
            Self(f)
        }
    }

    impl<F> Generator for FnGenerator<F>
    where
        F: Fn(&PromptTemplate, &TemplateVars) -> Result<String, GenerationError> + Send + Sync,
    {
        fn call(
            &self,
            template: &PromptTemplate,
            vars: &TemplateVars,
        ) -> Result<Completion, GenerationError> {
            (self.0)(template, vars).map(|text| Completion::new(text, call_usage()))
        }
    }
}
