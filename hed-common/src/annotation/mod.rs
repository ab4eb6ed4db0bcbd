//! HED annotation model
//!
//! An annotation is the proposer's grouping of tags for one event, written
//! in HED's parenthesized notation:
//!
//! ```text
//! (Foreground-view, (Square)), (Background-view, ((Human, Body), Outdoors, Urban))
//! ```
//!
//! The grouping expresses semantic co-occurrence and is unrelated to the
//! schema's is-a tree, so it gets its own recursive type.

mod parser;

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Deepest group nesting accepted from text or code
///
/// Parsing, validation and reduction recurse once per level, so deeper
/// input is rejected as malformed before any of them runs.
pub const MAX_NESTING: usize = 64;

/// One item of an annotation: a tag reference or a parenthesized group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationGroup {
    /// Reference to a schema tag by name
    Tag(String),
    /// Ordered group of items
    Group(Vec<AnnotationGroup>),
}

impl AnnotationGroup {
    pub fn tag(name: impl Into<String>) -> Self {
        AnnotationGroup::Tag(name.into())
    }

    pub fn group(items: Vec<AnnotationGroup>) -> Self {
        AnnotationGroup::Group(items)
    }

    /// Nesting depth: 0 for a tag, 1 + deepest child for a group
    pub fn depth(&self) -> usize {
        match self {
            AnnotationGroup::Tag(_) => 0,
            AnnotationGroup::Group(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            AnnotationGroup::Tag(name) => out.push(name),
            AnnotationGroup::Group(items) => {
                for item in items {
                    item.collect_leaves(out);
                }
            }
        }
    }

    /// `level` is the nesting depth of `self` when it is a group
    fn check_structure(&self, level: usize) -> Result<()> {
        match self {
            AnnotationGroup::Tag(name) => {
                if name.trim().is_empty() {
                    return Err(Error::MalformedAnnotation("empty tag".to_string()));
                }
                if name.contains(['(', ')', ',']) {
                    return Err(Error::MalformedAnnotation(format!(
                        "tag '{}' contains a grouping character",
                        name
                    )));
                }
                Ok(())
            }
            AnnotationGroup::Group(items) => {
                if items.is_empty() {
                    return Err(Error::MalformedAnnotation("empty group".to_string()));
                }
                if level > MAX_NESTING {
                    return Err(Error::MalformedAnnotation(format!(
                        "nesting deeper than {} groups",
                        MAX_NESTING
                    )));
                }
                items.iter().try_for_each(|item| item.check_structure(level + 1))
            }
        }
    }
}

impl fmt::Display for AnnotationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationGroup::Tag(name) => f.write_str(name),
            AnnotationGroup::Group(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                f.write_str(")")
            }
        }
    }
}

/// A complete annotation: the top-level sequence of items
///
/// The top level is written without surrounding parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    items: Vec<AnnotationGroup>,
}

impl Annotation {
    pub fn new(items: Vec<AnnotationGroup>) -> Self {
        Self { items }
    }

    /// Parse the parenthesized text notation
    ///
    /// Fails with [`Error::MalformedAnnotation`] on empty input, empty
    /// groups, empty tags and unbalanced parentheses.
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text)
    }

    pub fn items(&self) -> &[AnnotationGroup] {
        &self.items
    }

    pub fn into_items(self) -> Vec<AnnotationGroup> {
        self.items
    }

    /// Tag names in document order, repeats included
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for item in &self.items {
            item.collect_leaves(&mut out);
        }
        out
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Deepest group nesting (0 when every item is a bare tag)
    pub fn depth(&self) -> usize {
        self.items.iter().map(AnnotationGroup::depth).max().unwrap_or(0)
    }

    /// Reject values that could not have come from valid text
    ///
    /// Parsed annotations always pass; this guards annotations assembled in
    /// code.
    pub fn validate_structure(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::MalformedAnnotation("empty annotation".to_string()));
        }
        self.items.iter().try_for_each(|item| item.check_structure(1))
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_items(f, &self.items)
    }
}

impl FromStr for Annotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[AnnotationGroup]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use AnnotationGroup::{Group, Tag};

    #[test]
    fn test_depth_and_leaves() {
        let annotation = Annotation::new(vec![
            Group(vec![Tag("Foreground-view".into()), Group(vec![Tag("Square".into())])]),
            Tag("Blue".into()),
        ]);

        assert_eq!(annotation.depth(), 2);
        assert_eq!(annotation.leaves(), vec!["Foreground-view", "Square", "Blue"]);
        assert_eq!(annotation.leaf_count(), 3);
    }

    #[test]
    fn test_display_matches_notation() {
        let annotation = Annotation::new(vec![
            Group(vec![Tag("Foreground-view".into()), Group(vec![Tag("Square".into())])]),
            Group(vec![
                Tag("Background-view".into()),
                Group(vec![Group(vec![Tag("Human".into()), Tag("Body".into())]), Tag("Outdoors".into())]),
            ]),
        ]);

        assert_eq!(
            annotation.to_string(),
            "(Foreground-view, (Square)), (Background-view, ((Human, Body), Outdoors))"
        );
    }

    #[test]
    fn test_validate_structure_rejects_empty_group() {
        let annotation = Annotation::new(vec![Tag("Square".into()), Group(vec![])]);
        assert!(matches!(
            annotation.validate_structure(),
            Err(Error::MalformedAnnotation(_))
        ));
    }

    #[test]
    fn test_validate_structure_rejects_blank_tag() {
        let annotation = Annotation::new(vec![Group(vec![Tag("  ".into())])]);
        assert!(matches!(
            annotation.validate_structure(),
            Err(Error::MalformedAnnotation(_))
        ));
    }

    fn wrap(levels: usize) -> AnnotationGroup {
        (0..levels).fold(Tag("Square".into()), |inner, _| Group(vec![inner]))
    }

    #[test]
    fn test_validate_structure_bounds_nesting() {
        assert!(Annotation::new(vec![wrap(MAX_NESTING)]).validate_structure().is_ok());
        assert!(matches!(
            Annotation::new(vec![wrap(MAX_NESTING + 1)]).validate_structure(),
            Err(Error::MalformedAnnotation(_))
        ));
    }

    #[test]
    fn test_validate_structure_rejects_empty_annotation() {
        assert!(Annotation::new(vec![]).validate_structure().is_err());
    }

    #[test]
    fn test_validate_structure_accepts_well_formed() {
        let annotation = Annotation::parse("(Foreground-view, (Square)), Blue").unwrap();
        assert!(annotation.validate_structure().is_ok());
    }
}
