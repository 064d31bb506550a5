//! Source mutation: writing a documentation block into file text.
//!
//! Existing docs are replaced in place; missing docs are inserted on their
//! own line above the declaration. Generated blocks are normalised to the
//! ` * ` continuation style and re-indented to match the surrounding code.

use std::ops::Range;

use docgate_core::DocumentableUnit;

/// One pending text replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

/// Replaces `range` of `original` with `new_text`.
///
/// ```
/// use docgate_pipeline::replace;
///
/// assert_eq!(replace("hello world", 6..11, "there"), "hello there");
/// assert_eq!(replace("ab", 1..1, "-"), "a-b");
/// ```
pub fn replace(original: &str, range: Range<usize>, new_text: &str) -> String {
    let mut out = String::with_capacity(original.len() + new_text.len());
    out.push_str(&original[..range.start]);
    out.push_str(new_text);
    out.push_str(&original[range.end..]);
    out
}

/// Computes the edit that puts `doc` in front of `unit`.
pub fn doc_edit(original: &str, unit: &DocumentableUnit, doc: &str) -> Edit {
    let newline = newline_style(original);

    if let Some(existing) = &unit.existing_doc {
        let indent = line_indent(original, existing.span.start_byte);
        return Edit {
            range: existing.span.byte_range(),
            text: render_doc(doc, indent, newline),
        };
    }

    let start = unit.span.start_byte;
    let line_start = line_start(original, start);
    let prefix = &original[line_start..start];
    if prefix.chars().all(char::is_whitespace) {
        Edit {
            range: line_start..line_start,
            text: format!("{prefix}{}{newline}", render_doc(doc, prefix, newline)),
        }
    } else {
        // Declaration shares its line with other code; break the line.
        let indent = line_indent(original, start);
        Edit {
            range: start..start,
            text: format!("{}{newline}{indent}", render_doc(doc, indent, newline)),
        }
    }
}

/// Writes `doc` for a single unit and returns the new text.
pub fn apply_doc(original: &str, unit: &DocumentableUnit, doc: &str) -> String {
    let edit = doc_edit(original, unit, doc);
    replace(original, edit.range, &edit.text)
}

/// Normalises a documentation block and indents every line after the first.
///
/// ```
/// use docgate_pipeline::render_doc;
///
/// let doc = "/**\nAdds numbers.\n*\n   * @return the sum\n*/";
/// assert_eq!(
///     render_doc(doc, "    ", "\n"),
///     "/**\n     * Adds numbers.\n     *\n     * @return the sum\n     */"
/// );
/// ```
pub fn render_doc(doc: &str, indent: &str, newline: &str) -> String {
    let lines: Vec<&str> = doc.trim().lines().map(str::trim).collect();
    if lines.len() <= 1 {
        return lines.first().copied().unwrap_or_default().to_string();
    }

    let separator = format!("{newline}{indent}");
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            if idx == 0 {
                (*line).to_string()
            } else if line.starts_with('*') {
                format!(" {line}")
            } else if line.is_empty() {
                " *".to_string()
            } else {
                format!(" * {line}")
            }
        })
        .collect::<Vec<_>>()
        .join(&separator)
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |idx| idx + 1)
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    let line = &text[start..offset];
    let width = line.len() - line.trim_start().len();
    &line[..width]
}

fn newline_style(text: &str) -> &'static str {
    if text.contains("\r\n") { "\r\n" } else { "\n" }
}
