//! Tagging pipeline
//!
//! description -> propose -> extract -> parse -> validate -> reduce -> render
//!
//! Everything after the proposer is deterministic, so `reduce_text` runs the
//! same tail of the pipeline for annotations supplied directly by a caller.

use hed_common::{
    Annotation, ExemptTags, FallbackStrategy, RedundancyReducer, Schema, Substitution,
    TagValidator,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::extract::extract_annotation;
use super::llm_client::{ProposerError, TagProposer};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("Description is empty")]
    EmptyDescription,

    #[error("Tag proposer failed: {0}")]
    Proposer(#[from] ProposerError),

    #[error("No annotation found in the proposer reply")]
    NoAnnotation,

    #[error(transparent)]
    Hed(#[from] hed_common::Error),
}

/// Unknown tag replaced during validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionInfo {
    pub original: String,
    pub replacement: String,
}

impl From<Substitution> for SubstitutionInfo {
    fn from(s: Substitution) -> Self {
        Self {
            original: s.original,
            replacement: s.replacement,
        }
    }
}

/// Validated and reduced annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReduceOutcome {
    /// Rendered minimal annotation
    pub annotation: String,
    pub substitutions: Vec<SubstitutionInfo>,
    /// Redundant tag occurrences removed, in document order
    pub removed: Vec<String>,
}

/// Full pipeline result for one description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagOutcome {
    /// The proposer's whole reply
    pub explanation: String,
    /// Annotation text as extracted from the reply
    pub proposed: String,
    pub annotation: String,
    pub substitutions: Vec<SubstitutionInfo>,
    pub removed: Vec<String>,
}

/// Schema-bound tagging service shared across requests
pub struct TaggingService {
    schema: Arc<Schema>,
    proposer: Arc<dyn TagProposer>,
    exempt: ExemptTags,
    fallback: Box<dyn FallbackStrategy>,
}

impl TaggingService {
    pub fn new(
        schema: Arc<Schema>,
        proposer: Arc<dyn TagProposer>,
        exempt: ExemptTags,
        fallback: Box<dyn FallbackStrategy>,
    ) -> Self {
        for tag in exempt.iter().filter(|t| !schema.contains(t)) {
            warn!(tag = %tag, "Exempt tag is not defined in the schema");
        }

        Self {
            schema,
            proposer,
            exempt,
            fallback,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn exempt(&self) -> &ExemptTags {
        &self.exempt
    }

    pub fn model(&self) -> &str {
        self.proposer.model()
    }

    /// Validate and reduce an annotation without consulting the proposer
    pub fn reduce_text(&self, text: &str) -> Result<ReduceOutcome, TaggingError> {
        let annotation = Annotation::parse(text)?;

        let validator = TagValidator::new(&self.schema, self.fallback.as_ref());
        let validated = validator.validate_annotation(&annotation)?;

        let reducer = RedundancyReducer::new(&self.schema, &self.exempt);
        let reduction = reducer.reduce_detailed(&validated.annotation)?;

        Ok(ReduceOutcome {
            annotation: reduction.annotation.to_string(),
            substitutions: validated.substitutions.into_iter().map(Into::into).collect(),
            removed: reduction.removed,
        })
    }

    /// Run the whole pipeline for one event description
    pub async fn tag(&self, description: &str) -> Result<TagOutcome, TaggingError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TaggingError::EmptyDescription);
        }

        let proposal = self.proposer.propose(description).await?;
        let proposed = extract_annotation(&proposal.reply).ok_or(TaggingError::NoAnnotation)?;
        debug!(proposed = %proposed, "Extracted proposed annotation");

        let reduced = self.reduce_text(&proposed)?;
        info!(
            annotation = %reduced.annotation,
            removed = reduced.removed.len(),
            "Tagged description"
        );

        Ok(TagOutcome {
            explanation: proposal.reply,
            proposed,
            annotation: reduced.annotation,
            substitutions: reduced.substitutions,
            removed: reduced.removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_client::Proposal;
    use async_trait::async_trait;
    use hed_common::validator::LongestKnownPrefix;
    use hed_common::SchemaBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProposer {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TagProposer for StaticProposer {
        fn model(&self) -> &str {
            "static"
        }

        async fn propose(&self, _description: &str) -> Result<Proposal, ProposerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Proposal {
                reply: self.reply.to_string(),
            })
        }
    }

    fn schema() -> Arc<Schema> {
        let mut builder = SchemaBuilder::new();
        builder.add_path(&["Item", "Object", "Geometric-object", "2D-shape", "Square"]).unwrap();
        builder.add_path(&["Property", "Sensory-property", "Visual-attribute", "Color", "Blue"]).unwrap();
        builder.add_path(&["Property", "Spatial-property", "Foreground-view"]).unwrap();
        Arc::new(builder.build())
    }

    fn service(reply: &'static str) -> (TaggingService, Arc<StaticProposer>) {
        let proposer = Arc::new(StaticProposer {
            reply,
            calls: AtomicUsize::new(0),
        });
        let service = TaggingService::new(
            schema(),
            proposer.clone(),
            ExemptTags::new(),
            Box::new(LongestKnownPrefix),
        );
        (service, proposer)
    }

    #[tokio::test]
    async fn test_tag_runs_pipeline() {
        let (service, _) = service(
            "Square and Blue describe the stimulus.\n\
             Annotation: (Foreground-view, (2D-shape, Square, Color/Blue, Visual-attribute))",
        );

        let outcome = service.tag("A blue square in the foreground").await.unwrap();

        assert_eq!(outcome.annotation, "(Foreground-view, (Square, Blue))");
        assert_eq!(
            outcome.proposed,
            "(Foreground-view, (2D-shape, Square, Color/Blue, Visual-attribute))"
        );
        assert_eq!(outcome.removed, vec!["2D-shape", "Visual-attribute"]);
        assert_eq!(
            outcome.substitutions,
            vec![SubstitutionInfo {
                original: "Color/Blue".to_string(),
                replacement: "Blue".to_string(),
            }]
        );
        assert!(outcome.explanation.starts_with("Square and Blue"));
    }

    #[tokio::test]
    async fn test_blank_description_skips_proposer() {
        let (service, proposer) = service("Annotation: Square");

        assert!(matches!(
            service.tag("   ").await,
            Err(TaggingError::EmptyDescription)
        ));
        assert_eq!(proposer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reply_without_annotation() {
        let (service, _) = service("I am not sure which tags apply.");

        assert!(matches!(
            service.tag("Something happened").await,
            Err(TaggingError::NoAnnotation)
        ));
    }

    #[tokio::test]
    async fn test_unknown_tag_from_proposer() {
        let (service, _) = service("Annotation: (Square, Triangle)");

        match service.tag("Two shapes").await {
            Err(TaggingError::Hed(hed_common::Error::UnknownTag(tag))) => {
                assert_eq!(tag, "Triangle")
            }
            other => panic!("expected UnknownTag, got {:?}", other),
        }
    }

    #[test]
    fn test_reduce_text_is_deterministic() {
        let (service, proposer) = service("unused");

        let first = service.reduce_text("Square, 2D-shape, Item").unwrap();
        let second = service.reduce_text("Square, 2D-shape, Item").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.annotation, "Square");
        assert_eq!(first.removed, vec!["2D-shape", "Item"]);
        assert_eq!(proposer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reduce_text_rejects_malformed() {
        let (service, _) = service("unused");

        assert!(matches!(
            service.reduce_text("(Square,"),
            Err(TaggingError::Hed(hed_common::Error::MalformedAnnotation(_)))
        ));
    }
}
