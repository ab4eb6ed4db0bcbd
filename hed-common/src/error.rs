//! Common error types for the HED tag assistant

use thiserror::Error;

/// Common result type for HED operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the HED crates
#[derive(Error, Debug)]
pub enum Error {
    /// Annotation references a tag name the schema does not define
    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    /// Annotation grouping structure is not well-formed
    #[error("Malformed annotation: {0}")]
    MalformedAnnotation(String),

    /// HED XML document could not be turned into a schema tree
    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    /// Two schema nodes share the same name
    #[error("Duplicate tag in schema: {0}")]
    DuplicateTag(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
