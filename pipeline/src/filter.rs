//! Unit eligibility filter.
//!
//! Decides which parsed units are considered for documentation at all. The
//! filter is a pure function of the unit, the owning file's line count and
//! the configuration; it never calls a generator.

use std::sync::LazyLock;

use docgate_core::{Config, DocumentableUnit, PlaceholderMatcher, SkipReason, UnitKind};
use regex::Regex;

static GETTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^return\s+(?:this\s*\.\s*)?[A-Za-z_$][\w$]*\s*;$")
        .expect("static regex must compile")
});
static SETTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:this\s*\.\s*)?[A-Za-z_$][\w$]*\s*=\s*[A-Za-z_$][\w$]*\s*;$")
        .expect("static regex must compile")
});
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("static regex must compile")
});

/// Applies the eligibility rules in order, stopping at the first exclusion.
#[derive(Debug, Clone)]
pub struct UnitFilter<'a> {
    config: &'a Config,
    placeholders: PlaceholderMatcher,
}

impl<'a> UnitFilter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            placeholders: config.placeholder_matcher(),
        }
    }

    /// Returns the reason `unit` is excluded, or `None` if it is eligible.
    ///
    /// Rules, in order:
    /// 1. non-public units are excluded;
    /// 2. methods and constructors shorter than the minimum line count are
    ///    excluded unless their existing doc contains a placeholder marker;
    /// 3. classes in files shorter than the minimum file line count are
    ///    excluded (their members are still evaluated);
    /// 4. pure accessors and mutators are excluded regardless of length.
    pub fn exclusion(&self, unit: &DocumentableUnit, file_lines: usize) -> Option<SkipReason> {
        let thresholds = &self.config.thresholds;

        if !unit.is_public() {
            return Some(SkipReason::NotPublic);
        }

        match unit.kind {
            UnitKind::Method | UnitKind::Constructor => {
                if unit.line_count() < thresholds.min_method_lines
                    && !self.has_placeholder_doc(unit)
                {
                    return Some(SkipReason::BelowMinLines);
                }
            }
            UnitKind::Class => {
                if file_lines < thresholds.min_file_lines {
                    return Some(SkipReason::FileTooSmall);
                }
            }
        }

        if unit.kind == UnitKind::Method && is_accessor(&unit.body_text) {
            return Some(SkipReason::Accessor);
        }

        None
    }

    /// Returns the eligible units, preserving order.
    pub fn filter<'u>(
        &self,
        units: &'u [DocumentableUnit],
        file_lines: usize,
    ) -> Vec<&'u DocumentableUnit> {
        units
            .iter()
            .filter(|unit| self.exclusion(unit, file_lines).is_none())
            .collect()
    }

    fn has_placeholder_doc(&self, unit: &DocumentableUnit) -> bool {
        unit.existing_doc_text()
            .is_some_and(|doc| self.placeholders.find(doc).is_some())
    }
}

/// Returns `true` for a body that is exactly one field read or one field
/// assignment, with no branching.
///
/// ```
/// use docgate_pipeline::is_accessor;
///
/// assert!(is_accessor("{ return this.name; }"));
/// assert!(is_accessor("{\n    this.name = name;\n}"));
/// assert!(!is_accessor("{ return name == null ? \"\" : name; }"));
/// assert!(!is_accessor("{ if (x) { return a; } return b; }"));
/// ```
pub fn is_accessor(body: &str) -> bool {
    let body = body.trim();
    let Some(inner) = body.strip_prefix('{').and_then(|b| b.strip_suffix('}')) else {
        return false;
    };
    let stripped = COMMENT_RE.replace_all(inner, "");
    let statement = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    GETTER_RE.is_match(&statement) || SETTER_RE.is_match(&statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{class_unit, method_unit};

    #[test]
    fn test_non_public_dropped_first() {
        let config = Config::default();
        let filter = UnitFilter::new(&config);
        let unit = method_unit("helper", 40).with_modifiers(["private"]);
        assert_eq!(filter.exclusion(&unit, 200), Some(SkipReason::NotPublic));
    }

    #[test]
    fn test_short_method_dropped() {
        let config = Config::default();
        let filter = UnitFilter::new(&config);
        let unit = method_unit("tiny", 4);
        assert_eq!(filter.exclusion(&unit, 200), Some(SkipReason::BelowMinLines));
        assert_eq!(filter.exclusion(&method_unit("big", 10), 200), None);
    }

    #[test]
    fn test_short_method_with_placeholder_doc_is_kept_for_checks() {
        let config = Config::default();
        let filter = UnitFilter::new(&config);
        let unit = method_unit("tiny", 4).with_existing_doc(
            "/** TODO: write docs */",
            docgate_core::Span::new(0, 23, 1, 1),
        );
        assert_eq!(filter.exclusion(&unit, 200), None);
    }

    #[test]
    fn test_class_in_small_file_dropped() {
        let config = Config::default();
        let filter = UnitFilter::new(&config);
        let class = class_unit("Small");
        assert_eq!(filter.exclusion(&class, 29), Some(SkipReason::FileTooSmall));
        assert_eq!(filter.exclusion(&class, 30), None);
    }

    #[test]
    fn test_long_accessor_dropped() {
        let config = Config::default();
        let filter = UnitFilter::new(&config);
        let getter = method_unit("getName", 12).with_body("{\n\n\n    return this.name;\n\n\n}");
        assert_eq!(filter.exclusion(&getter, 200), Some(SkipReason::Accessor));
    }

    #[test]
    fn test_constructor_assignment_is_not_accessor() {
        let config = Config::default();
        let filter = UnitFilter::new(&config);
        let mut ctor = method_unit("Store", 12).with_body("{ this.name = name; }");
        ctor.kind = UnitKind::Constructor;
        assert_eq!(filter.exclusion(&ctor, 200), None);
    }

    #[test]
    fn test_accessor_detection_ignores_comments() {
        assert!(is_accessor("{\n  // cached\n  return count;\n}"));
        assert!(!is_accessor("{ count++; return count; }"));
        assert!(!is_accessor("{ this.a = b; this.c = d; }"));
        assert!(!is_accessor("{ return compute(); }"));
        assert!(!is_accessor(""));
    }

    #[test]
    fn test_filter_preserves_order() {
        let config = Config::default();
        let filter = UnitFilter::new(&config);
        let units = vec![
            method_unit("a", 20),
            method_unit("b", 2),
            method_unit("c", 20),
        ];
        let kept: Vec<&str> = filter
            .filter(&units, 200)
            .iter()
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(kept, vec!["a", "c"]);
    }
}
