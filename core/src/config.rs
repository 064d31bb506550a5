//! Run configuration for documentation gating.
//!
//! One [`Config`] value is built per run (from defaults, a YAML file, and
//! command-line overrides) and passed by reference into every component.
//! Every field has a default, so a partial YAML file is valid.
//!
//! # Example YAML
//!
//! ```yaml
//! thresholds:
//!   min_method_lines: 10
//!   min_file_lines: 30
//! force_override: false
//! classifier_authoritative: true
//! variant_count: 2
//! jobs: 4
//! models:
//!   synthesizer:
//!     model: claude-opus-4-1-20250805
//!     max_tokens: 5000
//!     temperature: 0.3
//!     input_cost_per_token: 0.000015
//!     output_cost_per_token: 0.000075
//!     timeout_secs: 120
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for [`Config::variant_count`].
pub const MAX_VARIANTS: usize = 5;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Size and shape thresholds used by the filter and the heuristic rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Methods and constructors shorter than this are not regenerated.
    pub min_method_lines: usize,
    /// Files shorter than this get no class-level documentation.
    pub min_file_lines: usize,
    /// Minimum description lines (tags excluded) for a doc to count as complete.
    pub min_description_lines: usize,
    /// Maximum width of a documentation line.
    pub max_line_width: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_method_lines: 10,
            min_file_lines: 30,
            min_description_lines: 2,
            max_line_width: 120,
        }
    }
}

/// Documentation delimiters and tag markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocSyntax {
    pub open: String,
    pub close: String,
    pub param_tag: String,
    pub return_tag: String,
}

impl Default for DocSyntax {
    fn default() -> Self {
        Self {
            open: "/**".to_string(),
            close: "*/".to_string(),
            param_tag: "@param".to_string(),
            return_tag: "@return".to_string(),
        }
    }
}

/// One generator model with its call limits and token prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// USD per input token.
    pub input_cost_per_token: f64,
    /// USD per output token.
    pub output_cost_per_token: f64,
    pub timeout_secs: u64,
}

impl ModelSpec {
    /// Cheap tier used for the GOOD/IMPROVE assessment.
    pub fn classifier() -> Self {
        Self {
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 10,
            temperature: 0.0,
            input_cost_per_token: 0.000_001,
            output_cost_per_token: 0.000_005,
            timeout_secs: 30,
        }
    }

    /// Expensive tier used to write documentation.
    pub fn synthesizer() -> Self {
        Self {
            model: "claude-opus-4-1-20250805".to_string(),
            max_tokens: 5000,
            temperature: 0.3,
            input_cost_per_token: 0.000_015,
            output_cost_per_token: 0.000_075,
            timeout_secs: 120,
        }
    }

    /// Estimated cost in USD for the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 * self.input_cost_per_token
            + output_tokens as f64 * self.output_cost_per_token
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_base: String,
    pub classifier: ModelSpec,
    pub synthesizer: ModelSpec,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.anthropic.com".to_string(),
            classifier: ModelSpec::classifier(),
            synthesizer: ModelSpec::synthesizer(),
        }
    }
}

fn default_placeholder_markers() -> Vec<String> {
    [
        "TODO",
        "FIXME",
        "XXX",
        "HACK",
        "placeholder text",
        "insert description here",
        "description here",
        "auto-generated",
        "default constructor",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Top-level run configuration.
///
/// # Examples
///
/// ```
/// use docgate_core::Config;
///
/// let config: Config = serde_yaml::from_str("variant_count: 3\nforce_override: true\n").unwrap();
/// assert_eq!(config.variant_count, 3);
/// assert!(config.force_override);
/// assert_eq!(config.thresholds.min_method_lines, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    pub syntax: DocSyntax,
    /// Markers that flag placeholder documentation; see [`PlaceholderMatcher`].
    pub placeholder_markers: Vec<String>,
    /// Run the classifier even when every heuristic passes.
    pub force_override: bool,
    /// When `false`, a GOOD verdict cannot keep a doc that failed a heuristic.
    pub classifier_authoritative: bool,
    /// Independent generation calls per regenerated unit.
    pub variant_count: usize,
    /// Files processed in parallel.
    pub jobs: usize,
    pub models: ModelConfig,
    /// House-style text appended to the generation prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_guidelines: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            syntax: DocSyntax::default(),
            placeholder_markers: default_placeholder_markers(),
            force_override: false,
            classifier_authoritative: true,
            variant_count: 1,
            jobs: 4,
            models: ModelConfig::default(),
            generation_guidelines: None,
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if parsing fails, or [`ConfigError::Invalid`]
    /// if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Config = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variant_count == 0 || self.variant_count > MAX_VARIANTS {
            return Err(ConfigError::Invalid(format!(
                "variant_count must be between 1 and {MAX_VARIANTS}, got {}",
                self.variant_count
            )));
        }
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs must be at least 1".to_string()));
        }
        if self.thresholds.min_description_lines == 0 || self.thresholds.max_line_width == 0 {
            return Err(ConfigError::Invalid(
                "description and line width thresholds must be positive".to_string(),
            ));
        }
        if self.syntax.open.is_empty() || self.syntax.close.is_empty() {
            return Err(ConfigError::Invalid(
                "documentation delimiters cannot be empty".to_string(),
            ));
        }
        if !self.syntax.param_tag.starts_with('@') || !self.syntax.return_tag.starts_with('@') {
            return Err(ConfigError::Invalid(
                "tag markers must start with '@'".to_string(),
            ));
        }
        Ok(())
    }

    /// Compiles [`Config::placeholder_markers`] into a matcher.
    pub fn placeholder_matcher(&self) -> PlaceholderMatcher {
        PlaceholderMatcher::new(&self.placeholder_markers)
    }
}

/// Whole-word matcher for placeholder markers.
///
/// A marker written entirely in upper case (`TODO`, `FIXME`) matches only in
/// that case, so prose such as "adds a todo item" is not flagged. Other
/// markers match case-insensitively. Either kind must start and end on a
/// word boundary: `HACK` does not match inside "shackle".
///
/// ```
/// use docgate_core::PlaceholderMatcher;
///
/// let matcher = PlaceholderMatcher::new(&["TODO".to_string(), "description here".to_string()]);
/// assert_eq!(matcher.find("/** TODO: describe */"), Some("TODO"));
/// assert_eq!(matcher.find("/** Description here. */"), Some("description here"));
/// assert_eq!(matcher.find("/** Adds a todo item. */"), None);
/// assert_eq!(matcher.find("/** Parses TODOS. */"), None);
/// ```
#[derive(Debug, Clone)]
pub struct PlaceholderMatcher {
    patterns: Vec<(String, Regex)>,
}

impl PlaceholderMatcher {
    pub fn new(markers: &[String]) -> Self {
        let patterns = markers
            .iter()
            .map(|marker| marker.trim())
            .filter(|marker| !marker.is_empty())
            .filter_map(|marker| {
                marker_regex(marker)
                    .ok()
                    .map(|re| (marker.to_string(), re))
            })
            .collect();
        Self { patterns }
    }

    /// Returns the first marker, in configured order, found in `text`.
    pub fn find(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(marker, _)| marker.as_str())
    }
}

fn marker_regex(marker: &str) -> Result<Regex, regex::Error> {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let case_sensitive = marker.chars().any(char::is_alphabetic)
        && !marker.chars().any(char::is_lowercase);

    let mut pattern = String::new();
    if !case_sensitive {
        pattern.push_str("(?i)");
    }
    if is_word(marker.chars().next()) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(marker));
    if is_word(marker.chars().last()) {
        pattern.push_str(r"\b");
    }
    Regex::new(&pattern)
}
