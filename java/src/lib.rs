//! Java structural parser for docgate.
//!
//! Uses tree-sitter to find every class-like declaration, method and
//! constructor in a Java source file, together with the `/** ... */` block
//! that documents it. Members of anonymous and local classes are not
//! reported; only declarations reachable through type bodies are.
//!
//! # Example
//!
//! ```
//! use docgate_core::{SourceParser, UnitKind};
//! use docgate_java::JavaParser;
//!
//! let source = r#"
//! /** Greets people. */
//! public class Greeter {
//!     public String greet(String name) {
//!         return "Hello " + name;
//!     }
//! }
//! "#;
//!
//! let units = JavaParser::new().parse(source).unwrap();
//! assert_eq!(units.len(), 2);
//! assert_eq!(units[0].kind, UnitKind::Class);
//! assert_eq!(units[0].existing_doc_text(), Some("/** Greets people. */"));
//! assert_eq!(units[1].id().as_str(), "Greeter#greet(String)");
//! ```

use docgate_core::{
    DocumentableUnit, ExistingDoc, ParseError, Parameter, SourceParser, Span, UnitKind,
};
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

const CLASS_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

const DOC_OPEN: &str = "/**";

/// Stateless Java parser.
///
/// A fresh tree-sitter parser is created per call, so one `JavaParser` can
/// be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaParser;

impl JavaParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for JavaParser {
    fn parse(&self, source: &str) -> Result<Vec<DocumentableUnit>, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseError::Language(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Parse("parser produced no syntax tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            warn!("java source contains syntax errors; units may be incomplete");
        }

        let mut units = Vec::new();
        collect_members(root, source.as_bytes(), &[], &mut units);
        debug!(units = units.len(), "parsed java source");
        Ok(units)
    }
}

fn collect_members(node: Node<'_>, src: &[u8], owner: &[String], out: &mut Vec<DocumentableUnit>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            kind if CLASS_KINDS.contains(&kind) => {
                let Some(unit) = class_unit(child, src, owner) else {
                    continue;
                };
                let mut nested = owner.to_vec();
                nested.push(unit.name.clone());
                out.push(unit);
                if let Some(body) = child.child_by_field_name("body") {
                    collect_members(body, src, &nested, out);
                }
            }
            "method_declaration" | "constructor_declaration" => {
                if let Some(unit) = callable_unit(child, src, owner) {
                    out.push(unit);
                }
            }
            // Enum constants come first; members live in this wrapper.
            "enum_body_declarations" => collect_members(child, src, owner, out),
            _ => {}
        }
    }
}

fn class_unit(node: Node<'_>, src: &[u8], owner: &[String]) -> Option<DocumentableUnit> {
    let name = text(node.child_by_field_name("name")?, src);
    let body = node.child_by_field_name("body");
    let signature = signature_text(node, body, src);

    let mut unit = DocumentableUnit::new(UnitKind::Class, name, signature, span_of(node))
        .with_modifiers(modifiers(node, src));
    if !owner.is_empty() {
        unit = unit.with_owner(owner.join("."));
    }
    if let Some(body) = body {
        unit = unit.with_body(text(body, src));
    }
    unit.existing_doc = existing_doc(node, src);
    Some(unit)
}

fn callable_unit(node: Node<'_>, src: &[u8], owner: &[String]) -> Option<DocumentableUnit> {
    let kind = if node.kind() == "constructor_declaration" {
        UnitKind::Constructor
    } else {
        UnitKind::Method
    };
    let name = text(node.child_by_field_name("name")?, src);
    let body = node.child_by_field_name("body");
    let signature = signature_text(node, body, src);

    let mut unit = DocumentableUnit::new(kind, name, signature, span_of(node))
        .with_modifiers(modifiers(node, src));
    if !owner.is_empty() {
        unit = unit.with_owner(owner.join("."));
    }
    if let Some(params) = node.child_by_field_name("parameters") {
        unit.parameters = parameters(params, src);
    }
    if kind == UnitKind::Method {
        if let Some(ty) = node.child_by_field_name("type") {
            if ty.kind() != "void_type" {
                unit = unit.with_return_type(text(ty, src));
            }
        }
    }
    if let Some(body) = body {
        unit = unit.with_body(text(body, src));
    }
    unit.existing_doc = existing_doc(node, src);
    Some(unit)
}

fn parameters(node: Node<'_>, src: &[u8]) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "formal_parameter" => {
                let ty = child.child_by_field_name("type");
                let name = child.child_by_field_name("name");
                if let (Some(ty), Some(name)) = (ty, name) {
                    params.push(Parameter::new(text(ty, src), text(name, src)));
                }
            }
            "spread_parameter" => {
                if let Some(param) = spread_parameter(child, src) {
                    params.push(param);
                }
            }
            _ => {}
        }
    }
    params
}

/// `String... values` has no `type` or `name` fields; the type is the first
/// non-modifier child and the name sits in the trailing declarator.
fn spread_parameter(node: Node<'_>, src: &[u8]) -> Option<Parameter> {
    let mut ty = None;
    let mut name = None;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "modifiers" => {}
            "variable_declarator" => {
                name = child.child_by_field_name("name").map(|n| text(n, src));
            }
            _ if ty.is_none() => ty = Some(text(child, src)),
            _ => {}
        }
    }
    Some(Parameter::new(format!("{}...", ty?), name?))
}

fn modifiers(node: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(mods) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
        return Vec::new();
    };
    let mut inner = mods.walk();
    mods.children(&mut inner)
        .filter(|c| {
            !matches!(
                c.kind(),
                "annotation" | "marker_annotation" | "line_comment" | "block_comment"
            )
        })
        .map(|c| text(c, src).to_string())
        .collect()
}

/// Finds the doc block right before `node`, skipping line comments.
fn existing_doc(node: Node<'_>, src: &[u8]) -> Option<ExistingDoc> {
    let mut prev = node.prev_sibling();
    while let Some(sibling) = prev {
        match sibling.kind() {
            "line_comment" => prev = sibling.prev_sibling(),
            "block_comment" => {
                let comment = text(sibling, src);
                if comment.starts_with(DOC_OPEN) && comment != "/**/" {
                    return Some(ExistingDoc {
                        text: comment.to_string(),
                        span: span_of(sibling),
                    });
                }
                return None;
            }
            _ => return None,
        }
    }
    None
}

fn signature_text(node: Node<'_>, body: Option<Node<'_>>, src: &[u8]) -> String {
    let end = body.map_or(node.end_byte(), |b| b.start_byte());
    let raw = String::from_utf8_lossy(&src[node.start_byte()..end]);
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches(';').trim_end().to_string()
}

fn span_of(node: Node<'_>) -> Span {
    Span::new(
        node.start_byte(),
        node.end_byte(),
        node.start_position().row + 1,
        node.end_position().row + 1,
    )
}

fn text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<DocumentableUnit> {
        JavaParser::new().parse(source).unwrap()
    }

    #[test]
    fn test_void_method_has_no_return_type() {
        let units = parse("class A { public void run() {} }");
        assert_eq!(units[1].kind, UnitKind::Method);
        assert_eq!(units[1].return_type, None);
    }

    #[test]
    fn test_generic_return_type_text() {
        let units = parse("class A { public List<String> names() { return null; } }");
        assert_eq!(units[1].return_type.as_deref(), Some("List<String>"));
    }

    #[test]
    fn test_annotations_are_not_modifiers() {
        let units =
            parse("class A {\n  @Override\n  public final String toString() { return \"\"; }\n}");
        assert_eq!(units[1].modifiers, vec!["public", "final"]);
        assert!(units[1].is_public());
    }

    #[test]
    fn test_varargs_parameter() {
        let units = parse("class A { public void log(String fmt, Object... args) {} }");
        let params = &units[1].parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].name, "args");
        assert_eq!(params[1].type_name, "Object...");
    }

    #[test]
    fn test_plain_block_comment_is_not_doc() {
        let units = parse("class A {\n  /* internal */\n  public void run() {}\n}");
        assert!(units[1].existing_doc.is_none());
    }

    #[test]
    fn test_signature_collapses_whitespace() {
        let units = parse(
            "class A {\n  public int add(int a,\n                 int b) { return a + b; }\n}",
        );
        assert_eq!(units[1].signature, "public int add(int a, int b)");
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").is_empty());
    }
}
