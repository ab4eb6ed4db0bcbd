//! Services for hed-bot
//!
//! HTTP clients for the schema document and the language model, prompt
//! assembly, reply parsing and the tagging pipeline built on top of them.

pub mod extract;
pub mod llm_client;
pub mod prompt;
pub mod schema_client;
pub mod tagging;

pub use extract::extract_annotation;
pub use llm_client::{OpenAiProposer, OpenAiSettings, Proposal, ProposerError, TagProposer};
pub use prompt::PromptBuilder;
pub use schema_client::{SchemaClient, SchemaDocument, SchemaFetchError};
pub use tagging::{ReduceOutcome, SubstitutionInfo, TagOutcome, TaggingError, TaggingService};
