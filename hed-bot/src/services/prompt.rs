//! Prompt assembly for the tag proposer

use hed_common::config::PromptContext;
use hed_common::Schema;

/// Example annotation shown to the model
pub const EXAMPLE_ANNOTATION: &str =
    "(Foreground-view, (Square)), (Background-view, ((Human, Body), Outdoors, Urban))";

/// Marker the model is asked to put in front of its final annotation
pub const ANNOTATION_MARKER: &str = "Annotation:";

/// Builds the system and user prompts sent to the proposer
///
/// The schema context is rendered once at construction; every request only
/// formats the user prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
}

impl PromptBuilder {
    /// `xml` is only read for [`PromptContext::Xml`]
    pub fn new(schema: &Schema, context: PromptContext, xml: &str) -> Self {
        let (label, body) = match context {
            PromptContext::Outline => (
                "the HED schema as an indented outline (children are indented under their parent, with descriptions)",
                schema.outline(true),
            ),
            PromptContext::Xml => ("the HED schema provided in the XML", xml.to_string()),
        };

        let system = format!(
            "You are a Hierarchical Event Descriptor (HED) schema expert.\n\
             You have access to {label}:\n\
             {body}\n\
             You take a tagging request and analyze it to find the most relevant HED tags. \
             You will then give a summary of the tag names you found relevant, along with explanations \
             for why you chose those tags.\n\
             Use only tag names that appear in the schema, written in short form (the last path component).\n\
             You will then give an example of a complete HED annotation using the tags you found. \
             An example of a HED annotation is: {EXAMPLE_ANNOTATION}\n\
             End your answer with a single line of the form\n\
             {ANNOTATION_MARKER} <annotation>"
        );

        Self { system }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    pub fn user_prompt(&self, description: &str) -> String {
        format!("Tagging request: {}\n\n{}", description.trim(), ANNOTATION_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hed_common::SchemaBuilder;

    fn schema() -> Schema {
        let mut builder = SchemaBuilder::new();
        builder.add_top_level("Item", Some("An independently existing thing.")).unwrap();
        builder.add_child("Item", "Object", None).unwrap();
        builder.build()
    }

    #[test]
    fn test_outline_context() {
        let prompt = PromptBuilder::new(&schema(), PromptContext::Outline, "<HED/>");
        let system = prompt.system_prompt();

        assert!(system.contains("Item: An independently existing thing.\n  Object\n"));
        assert!(system.contains(EXAMPLE_ANNOTATION));
        assert!(!system.contains("<HED/>"));
    }

    #[test]
    fn test_xml_context() {
        let prompt = PromptBuilder::new(&schema(), PromptContext::Xml, "<HED version=\"8.3.0\"/>");
        assert!(prompt.system_prompt().contains("<HED version=\"8.3.0\"/>"));
    }

    #[test]
    fn test_user_prompt_ends_with_marker() {
        let prompt = PromptBuilder::new(&schema(), PromptContext::Outline, "");
        let user = prompt.user_prompt("  A red square appears on screen.  ");

        assert_eq!(
            user,
            "Tagging request: A red square appears on screen.\n\nAnnotation:"
        );
    }
}
