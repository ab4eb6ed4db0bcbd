//! Redundant-tag reduction
//!
//! In HED a tag implies every one of its ancestors, so an annotation that
//! carries both `2D-shape` and `Square` says `2D-shape` twice. The reducer
//! removes every tag that is a strict ancestor of another tag present
//! anywhere in the same annotation, keeping the proposer's grouping.
//!
//! Grouping rules applied while rebuilding:
//! - a group emptied by removals is dropped from its parent
//! - a group that lost members and is left with a single member is
//!   replaced by that member
//! - groups that lost nothing keep their exact shape
//! - the top-level sequence is never collapsed
//!
//! Tags in the caller's [`ExemptTags`] set are never removed.

use crate::{Annotation, AnnotationGroup, Result, Schema};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Tag names the reducer must never drop (top-level event types such as
/// `Sensory-presentation`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemptTags(BTreeSet<String>);

impl ExemptTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExemptTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Result of a reduction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Minimal equivalent annotation
    pub annotation: Annotation,
    /// Removed tag occurrences in document order
    pub removed: Vec<String>,
}

/// Removes tags implied by more specific tags in the same annotation
///
/// Borrows an immutable schema, so any number of reducers can run at once
/// over one shared schema.
pub struct RedundancyReducer<'a> {
    schema: &'a Schema,
    exempt: &'a ExemptTags,
}

impl<'a> RedundancyReducer<'a> {
    pub fn new(schema: &'a Schema, exempt: &'a ExemptTags) -> Self {
        Self { schema, exempt }
    }

    /// Reduce an annotation to its minimal equivalent form
    ///
    /// Fails with `UnknownTag` for the first leaf (in document order) that
    /// the schema does not define, and with `MalformedAnnotation` for empty
    /// groups or blank tags.
    pub fn reduce(&self, annotation: &Annotation) -> Result<Annotation> {
        self.reduce_detailed(annotation).map(|r| r.annotation)
    }

    /// Like [`reduce`](Self::reduce), also reporting what was removed
    pub fn reduce_detailed(&self, annotation: &Annotation) -> Result<Reduction> {
        let redundant = self.redundant_tags(annotation)?;

        let mut removed = Vec::new();
        let (items, _) = rebuild(annotation.items(), &redundant, &mut removed);

        if !removed.is_empty() {
            debug!(removed = ?removed, "Removed redundant tags");
        }

        Ok(Reduction {
            annotation: Annotation::new(items),
            removed,
        })
    }

    /// Names of present tags implied by another present tag and not exempt
    pub fn redundant_tags<'b>(&self, annotation: &'b Annotation) -> Result<HashSet<&'b str>> {
        annotation.validate_structure()?;

        let leaves = annotation.leaves();
        let mut present = HashSet::with_capacity(leaves.len());
        for &name in &leaves {
            present.insert(self.schema.id_of(name)?);
        }

        // Each distinct leaf walks its parent chain once: O(T x D)
        let mut implied = HashSet::new();
        for &id in &present {
            for ancestor in self.schema.ancestor_ids(id) {
                if present.contains(&ancestor) {
                    implied.insert(ancestor);
                }
            }
        }

        Ok(leaves
            .into_iter()
            .filter(|name| !self.exempt.contains(name))
            .filter(|name| {
                self.schema
                    .id_of(name)
                    .map(|id| implied.contains(&id))
                    .unwrap_or(false)
            })
            .collect())
    }
}

/// Reduce `annotation` against `schema`, never dropping `exempt` tags
pub fn reduce(schema: &Schema, annotation: &Annotation, exempt: &ExemptTags) -> Result<Annotation> {
    RedundancyReducer::new(schema, exempt).reduce(annotation)
}

/// Rebuild a sequence without redundant tags
///
/// Returns the surviving items and whether the sequence lost any direct
/// member.
fn rebuild(
    items: &[AnnotationGroup],
    redundant: &HashSet<&str>,
    removed: &mut Vec<String>,
) -> (Vec<AnnotationGroup>, bool) {
    let mut kept = Vec::with_capacity(items.len());
    let mut lost = false;

    for item in items {
        match item {
            AnnotationGroup::Tag(name) => {
                if redundant.contains(name.as_str()) {
                    removed.push(name.clone());
                    lost = true;
                } else {
                    kept.push(item.clone());
                }
            }
            AnnotationGroup::Group(children) => {
                let (mut survivors, shrank) = rebuild(children, redundant, removed);
                if survivors.is_empty() {
                    lost = true;
                } else if shrank && survivors.len() == 1 {
                    kept.extend(survivors.pop());
                } else {
                    kept.push(AnnotationGroup::Group(survivors));
                }
            }
        }
    }

    (kept, lost)
}
