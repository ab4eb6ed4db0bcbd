//! # HED Common Library
//!
//! Shared code for the HED tag assistant:
//! - HED schema tree (loaded from the HED XML document)
//! - Annotation model and its parenthesized text notation
//! - Redundant-tag reduction
//! - Tag validation with pluggable fallback strategies
//! - Configuration loading

pub mod annotation;
pub mod config;
pub mod error;
pub mod reducer;
pub mod schema;
pub mod validator;

pub use annotation::{Annotation, AnnotationGroup, MAX_NESTING};
pub use error::{Error, Result};
pub use reducer::{ExemptTags, Reduction, RedundancyReducer};
pub use schema::{Schema, SchemaBuilder, SchemaNode};
pub use validator::{FallbackStrategy, Substitution, TagValidator};
