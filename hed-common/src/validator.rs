//! Tag validation against the schema vocabulary
//!
//! Proposers sometimes invent tags, use long-form paths or append values
//! (`Duration/3 s`). The validator checks every leaf against the schema and
//! asks a [`FallbackStrategy`] for a replacement when a name is unknown.
//! Validation runs before reduction; the reducer itself never guesses.

use crate::{Annotation, AnnotationGroup, Error, Result, Schema};
use tracing::{debug, info};

/// Produces a replacement for a tag name the schema does not define
///
/// Closures of the form `Fn(&Schema, &str) -> Option<String>` implement this
/// trait, so callers can plug in their own policy.
pub trait FallbackStrategy: Send + Sync {
    /// Suggest a known tag to use instead of `tag`, or `None`
    fn replacement(&self, schema: &Schema, tag: &str) -> Option<String>;
}

impl<F> FallbackStrategy for F
where
    F: Fn(&Schema, &str) -> Option<String> + Send + Sync,
{
    fn replacement(&self, schema: &Schema, tag: &str) -> Option<String> {
        self(schema, tag)
    }
}

/// Never substitutes; unknown tags are errors
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackStrategy for NoFallback {
    fn replacement(&self, _schema: &Schema, _tag: &str) -> Option<String> {
        None
    }
}

/// Deepest known component of a slash path
///
/// `Item/Object/2D-shape/Squarish` becomes `2D-shape`; `Duration/3 s`
/// becomes `Duration`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestKnownPrefix;

impl FallbackStrategy for LongestKnownPrefix {
    fn replacement(&self, schema: &Schema, tag: &str) -> Option<String> {
        deepest_known_component(schema, tag).map(str::to_string)
    }
}

/// Most similar tag name by normalized Levenshtein similarity
///
/// When the tag is a path with a known component, only that component's
/// children are candidates (nearest sibling); otherwise the whole
/// vocabulary is searched. Comparison is case-insensitive and ties go to
/// the candidate that comes first in the schema.
#[derive(Debug, Clone, Copy)]
pub struct NearestByName {
    /// Minimum similarity in `0.0..=1.0` for a candidate to be accepted
    pub min_similarity: f64,
}

impl Default for NearestByName {
    fn default() -> Self {
        Self { min_similarity: 0.8 }
    }
}

impl FallbackStrategy for NearestByName {
    fn replacement(&self, schema: &Schema, tag: &str) -> Option<String> {
        let leaf = tag.rsplit('/').next().unwrap_or(tag).trim().to_lowercase();
        if leaf.is_empty() {
            return None;
        }

        let siblings: Vec<&str> = deepest_known_component(schema, tag)
            .and_then(|parent| schema.get(parent))
            .map(|node| schema.children_of(node).map(|c| c.name()).collect())
            .unwrap_or_default();

        let candidates: Vec<&str> = if siblings.is_empty() {
            schema.vocabulary().collect()
        } else {
            siblings
        };

        let mut best: Option<(&str, f64)> = None;
        for candidate in candidates {
            let score = strsim::normalized_levenshtein(&leaf, &candidate.to_lowercase());
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }

        best.filter(|&(_, score)| score >= self.min_similarity)
            .map(|(name, score)| {
                debug!(tag = %tag, candidate = %name, score, "Nearest tag by name");
                name.to_string()
            })
    }
}

/// Tries each strategy in order and takes the first answer
#[derive(Default)]
pub struct Chain(Vec<Box<dyn FallbackStrategy>>);

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, strategy: impl FallbackStrategy + 'static) -> Self {
        self.0.push(Box::new(strategy));
        self
    }
}

impl FallbackStrategy for Chain {
    fn replacement(&self, schema: &Schema, tag: &str) -> Option<String> {
        self.0.iter().find_map(|s| s.replacement(schema, tag))
    }
}

fn deepest_known_component<'s>(schema: &'s Schema, tag: &str) -> Option<&'s str> {
    tag.rsplit('/')
        .map(str::trim)
        .find_map(|part| schema.get(part))
        .map(|node| node.name())
}

/// One unknown tag and what replaced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub original: String,
    pub replacement: String,
}

/// Annotation whose every leaf is a schema tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub annotation: Annotation,
    pub substitutions: Vec<Substitution>,
}

/// Checks tag names against a schema, substituting through a fallback
pub struct TagValidator<'a> {
    schema: &'a Schema,
    fallback: &'a dyn FallbackStrategy,
}

impl<'a> TagValidator<'a> {
    pub fn new(schema: &'a Schema, fallback: &'a dyn FallbackStrategy) -> Self {
        Self { schema, fallback }
    }

    pub fn is_known(&self, tag: &str) -> bool {
        self.schema.contains(tag)
    }

    /// Known tags map to themselves; unknown tags to the fallback's answer
    ///
    /// A replacement the schema does not define counts as no replacement.
    pub fn resolve(&self, tag: &str) -> Result<String> {
        if self.is_known(tag) {
            return Ok(tag.to_string());
        }

        match self.fallback.replacement(self.schema, tag) {
            Some(replacement) if self.is_known(&replacement) => Ok(replacement),
            _ => Err(Error::UnknownTag(tag.to_string())),
        }
    }

    /// Rewrite every leaf to a known tag, keeping the grouping
    pub fn validate_annotation(&self, annotation: &Annotation) -> Result<Validated> {
        annotation.validate_structure()?;

        let mut substitutions = Vec::new();
        let items = annotation
            .items()
            .iter()
            .map(|item| self.validate_item(item, &mut substitutions))
            .collect::<Result<Vec<_>>>()?;

        Ok(Validated {
            annotation: Annotation::new(items),
            substitutions,
        })
    }

    fn validate_item(
        &self,
        item: &AnnotationGroup,
        substitutions: &mut Vec<Substitution>,
    ) -> Result<AnnotationGroup> {
        match item {
            AnnotationGroup::Tag(name) => {
                let resolved = self.resolve(name)?;
                if &resolved != name {
                    info!(original = %name, replacement = %resolved, "Substituted unknown tag");
                    substitutions.push(Substitution {
                        original: name.clone(),
                        replacement: resolved.clone(),
                    });
                }
                Ok(AnnotationGroup::Tag(resolved))
            }
            AnnotationGroup::Group(children) => children
                .iter()
                .map(|child| self.validate_item(child, substitutions))
                .collect::<Result<Vec<_>>>()
                .map(AnnotationGroup::Group),
        }
    }
}
