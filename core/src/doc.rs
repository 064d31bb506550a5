//! Documentation comment parsing.
//!
//! Splits a `/** ... */` block into its free-text description and its block
//! tags. Delimiters and tag markers come from [`DocSyntax`] so the same
//! parser serves any comment dialect with an open/close pair and
//! line-leading `@tag` markers.

use serde::{Deserialize, Serialize};

use crate::DocSyntax;

/// A named tag entry such as `@param id the user id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    /// Parameter or exception name; empty when the tag line had none.
    pub name: String,
    pub description: String,
}

/// A block tag that is neither a parameter nor a return tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherTag {
    /// Tag marker including the `@` (e.g. `@throws`).
    pub tag: String,
    pub text: String,
}

/// Parsed view of one documentation block.
///
/// # Examples
///
/// ```
/// use docgate_core::{DocComment, DocSyntax};
///
/// let text = "/**\n * Loads a user.\n *\n * @param id the user id\n * @return the user\n */";
/// let doc = DocComment::parse(text, &DocSyntax::default());
///
/// assert_eq!(doc.description, vec!["Loads a user."]);
/// assert_eq!(doc.param_names(), vec!["id"]);
/// assert_eq!(doc.returns, vec!["the user"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocComment {
    /// Non-empty description lines before the first block tag.
    pub description: Vec<String>,
    pub params: Vec<TagEntry>,
    /// One entry per return tag, so duplicates stay visible.
    pub returns: Vec<String>,
    pub other_tags: Vec<OtherTag>,
    /// Comment content lines with delimiters and leading `*` removed.
    pub content_lines: Vec<String>,
}

enum Section {
    Description,
    Param(usize),
    Return(usize),
    Other(usize),
}

impl DocComment {
    pub fn parse(text: &str, syntax: &DocSyntax) -> Self {
        let mut doc = DocComment::default();
        let mut section = Section::Description;

        for raw in text.lines() {
            let line = strip_decoration(raw, syntax);
            doc.content_lines.push(line.to_string());
            if line.is_empty() {
                continue;
            }

            if let Some((tag, rest)) = split_tag(line) {
                if tag == syntax.param_tag {
                    let (name, description) = split_word(rest);
                    doc.params.push(TagEntry {
                        name: name.to_string(),
                        description: description.to_string(),
                    });
                    section = Section::Param(doc.params.len() - 1);
                } else if tag == syntax.return_tag {
                    doc.returns.push(rest.to_string());
                    section = Section::Return(doc.returns.len() - 1);
                } else {
                    doc.other_tags.push(OtherTag {
                        tag: tag.to_string(),
                        text: rest.to_string(),
                    });
                    section = Section::Other(doc.other_tags.len() - 1);
                }
                continue;
            }

            match section {
                Section::Description => doc.description.push(line.to_string()),
                Section::Param(idx) => append(&mut doc.params[idx].description, line),
                Section::Return(idx) => append(&mut doc.returns[idx], line),
                Section::Other(idx) => append(&mut doc.other_tags[idx].text, line),
            }
        }

        doc
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn has_tags(&self) -> bool {
        !self.params.is_empty() || !self.returns.is_empty() || !self.other_tags.is_empty()
    }
}

/// Returns `true` when `text` is exactly one delimited documentation block.
///
/// The text must start with the open delimiter, end with the close
/// delimiter, and contain neither delimiter anywhere in between.
///
/// ```
/// use docgate_core::{DocSyntax, is_well_formed};
///
/// let syntax = DocSyntax::default();
/// assert!(is_well_formed("/** Adds two numbers. */", &syntax));
/// assert!(!is_well_formed("Here you go:\n/** Adds. */", &syntax));
/// assert!(!is_well_formed("/** One. */\n/** Two. */", &syntax));
/// ```
pub fn is_well_formed(text: &str, syntax: &DocSyntax) -> bool {
    let text = text.trim();
    let Some(inner) = text.strip_prefix(syntax.open.as_str()) else {
        return false;
    };
    let Some(inner) = inner.strip_suffix(syntax.close.as_str()) else {
        return false;
    };
    !inner.contains(syntax.open.as_str()) && !inner.contains(syntax.close.as_str())
}

fn strip_decoration<'a>(raw: &'a str, syntax: &DocSyntax) -> &'a str {
    let mut line = raw.trim();
    if let Some(rest) = line.strip_prefix(syntax.open.as_str()) {
        line = rest.trim_start();
    }
    if let Some(rest) = line.strip_suffix(syntax.close.as_str()) {
        line = rest.trim_end();
    }
    if let Some(rest) = line.strip_prefix('*') {
        line = rest.trim_start();
    }
    line.trim()
}

/// Splits `@tag rest` into `("@tag", "rest")`.
///
/// The marker must be followed by whitespace or end the line, so inline
/// tags like `{@link Foo}` and e-mail addresses are not block tags.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with('@') {
        return None;
    }
    let end = line.find(char::is_whitespace).unwrap_or(line.len());
    let tag = &line[..end];
    if tag.len() < 2 {
        return None;
    }
    Some((tag, line[end..].trim()))
}

fn split_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    }
}

fn append(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}
