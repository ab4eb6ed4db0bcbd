//! HED schema tree
//!
//! The schema is an is-a hierarchy: every tag implies all of its ancestors.
//! Nodes live in an arena owned by [`Schema`]; parent and child links are
//! arena indices, so the tree owns every node and a node's parent link is a
//! plain back-reference.
//!
//! The HED document has several top-level categories (`Event`, `Item`,
//! `Property`, ...). They hang off an implicit unnamed root, which makes the
//! whole schema a single rooted tree. Top-level categories are depth 0 and
//! have no ancestors.
//!
//! A [`Schema`] is built once (from the HED XML document or a
//! [`SchemaBuilder`]) and is immutable afterwards, so it can be shared
//! behind an `Arc` by any number of concurrent readers.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

/// Placeholder node name HED uses for value-taking tags (`Duration/#`)
const VALUE_PLACEHOLDER: &str = "#";

/// One concept in the HED hierarchy
#[derive(Debug, Clone)]
pub struct SchemaNode {
    name: String,
    description: Option<String>,
    /// `None` for top-level categories (children of the implicit root)
    parent: Option<usize>,
    children: Vec<usize>,
}

impl SchemaNode {
    /// Unique tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description, if the schema provides one
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True for HED top-level categories
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Immutable HED schema tree with name lookup and ancestor queries
#[derive(Debug, Clone)]
pub struct Schema {
    version: Option<String>,
    nodes: Vec<SchemaNode>,
    top_level: Vec<usize>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Parse a HED XML schema document
    ///
    /// Expects the standard layout: a root `<HED version="...">` element with
    /// a `<schema>` child holding nested `<node>` elements. Each node has a
    /// direct `<name>` child and an optional direct `<description>` child.
    /// Value placeholder nodes (`#`) are not tags and are skipped.
    pub fn from_hed_xml(xml: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| Error::SchemaParse(e.to_string()))?;

        let root = doc.root_element();
        let schema_element = root
            .children()
            .find(|n| n.has_tag_name("schema"))
            .ok_or_else(|| Error::SchemaParse("missing <schema> element".to_string()))?;

        let mut builder = SchemaBuilder::new();
        if let Some(version) = root.attribute("version") {
            builder = builder.version(version);
        }

        for node in schema_element.children().filter(|n| n.has_tag_name("node")) {
            load_xml_node(&mut builder, None, node)?;
        }

        let schema = builder.build();
        if schema.is_empty() {
            return Err(Error::SchemaParse("schema contains no tags".to_string()));
        }

        info!(
            version = schema.version().unwrap_or("unknown"),
            tags = schema.len(),
            top_level = schema.top_level.len(),
            "Loaded HED schema"
        );

        Ok(schema)
    }

    /// Read and parse a HED XML schema file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::from_hed_xml(&xml)
    }

    /// Schema version from the document's `version` attribute
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Number of tags in the schema
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a tag by name
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.index.get(name).map(|&id| &self.nodes[id])
    }

    /// True when `name` is a tag of this schema
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// HED top-level categories in document order
    pub fn top_level(&self) -> impl Iterator<Item = &SchemaNode> {
        self.top_level.iter().map(|&id| &self.nodes[id])
    }

    /// Parent of a node, `None` for top-level categories
    pub fn parent_of(&self, node: &SchemaNode) -> Option<&SchemaNode> {
        node.parent.map(|id| &self.nodes[id])
    }

    /// Children of a node in document order
    pub fn children_of<'a>(&'a self, node: &'a SchemaNode) -> impl Iterator<Item = &'a SchemaNode> {
        node.children.iter().map(|&id| &self.nodes[id])
    }

    /// Ancestor names of `name`, nearest first, excluding the implicit root
    ///
    /// Walks parent links, so the cost is the depth of the tag.
    pub fn ancestors(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.id_of(name)?;
        Ok(self.ancestor_ids(id).map(|a| self.nodes[a].name.as_str()).collect())
    }

    /// True when `ancestor` is a strict ancestor of `descendant`
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let ancestor_id = self.id_of(ancestor)?;
        let descendant_id = self.id_of(descendant)?;
        Ok(self.ancestor_ids(descendant_id).any(|a| a == ancestor_id))
    }

    /// Depth below the implicit root (top-level categories are depth 0)
    pub fn depth(&self, name: &str) -> Result<usize> {
        let id = self.id_of(name)?;
        Ok(self.ancestor_ids(id).count())
    }

    /// All tag names in document order
    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// `(description, name)` pairs for every tag, empty description when absent
    pub fn description_tag_pairs(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .map(|n| (n.description.as_deref().unwrap_or(""), n.name.as_str()))
            .collect()
    }

    /// Indented outline of the whole tree, two spaces per level
    ///
    /// Used as compact schema context for the tag proposer.
    pub fn outline(&self, with_descriptions: bool) -> String {
        let mut out = String::new();
        let mut stack: Vec<(usize, usize)> =
            self.top_level.iter().rev().map(|&id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&node.name);
            if with_descriptions {
                if let Some(description) = &node.description {
                    let _ = write!(out, ": {}", description);
                }
            }
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
        }

        out
    }

    pub(crate) fn id_of(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownTag(name.to_string()))
    }

    pub(crate) fn ancestor_ids(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.nodes[id].parent, move |&p| self.nodes[p].parent)
    }
}

fn load_xml_node(
    builder: &mut SchemaBuilder,
    parent: Option<usize>,
    element: roxmltree::Node<'_, '_>,
) -> Result<()> {
    let name = element
        .children()
        .find(|n| n.has_tag_name("name"))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            let under = parent
                .map(|p| builder.nodes[p].name.clone())
                .unwrap_or_else(|| "<schema>".to_string());
            Error::SchemaParse(format!("<node> without <name> under {}", under))
        })?;

    if name == VALUE_PLACEHOLDER {
        debug!(parent = ?parent.map(|p| builder.nodes[p].name.as_str()), "Skipping value placeholder node");
        return Ok(());
    }

    let description = element
        .children()
        .find(|n| n.has_tag_name("description"))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let id = builder.insert(parent, name, description)?;

    for child in element.children().filter(|n| n.has_tag_name("node")) {
        load_xml_node(builder, Some(id), child)?;
    }

    Ok(())
}

/// Incremental constructor for [`Schema`]
///
/// # Examples
///
/// ```
/// use hed_common::SchemaBuilder;
///
/// let mut builder = SchemaBuilder::new();
/// builder.add_path(&["Item", "Object", "Geometric-object", "2D-shape", "Square"]).unwrap();
/// let schema = builder.build();
///
/// assert!(schema.is_ancestor("2D-shape", "Square").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    version: Option<String>,
    nodes: Vec<SchemaNode>,
    top_level: Vec<usize>,
    index: HashMap<String, usize>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schema version string
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a top-level category
    pub fn add_top_level(&mut self, name: &str, description: Option<&str>) -> Result<()> {
        self.insert(None, name, description).map(|_| ())
    }

    /// Add `name` as the last child of the existing tag `parent`
    pub fn add_child(&mut self, parent: &str, name: &str, description: Option<&str>) -> Result<()> {
        let parent_id = self
            .index
            .get(parent)
            .copied()
            .ok_or_else(|| Error::UnknownTag(parent.to_string()))?;
        self.insert(Some(parent_id), name, description).map(|_| ())
    }

    /// Add a chain of tags from a top-level category downwards
    ///
    /// Tags already present are reused when they sit at the same position;
    /// a name that exists under a different parent is a duplicate.
    pub fn add_path(&mut self, path: &[&str]) -> Result<()> {
        let mut parent: Option<usize> = None;
        for &name in path {
            let id = match self.index.get(name) {
                Some(&existing) if self.nodes[existing].parent == parent => existing,
                Some(_) => return Err(Error::DuplicateTag(name.to_string())),
                None => self.insert(parent, name, None)?,
            };
            parent = Some(id);
        }
        Ok(())
    }

    /// Finish building; the schema is immutable from here on
    pub fn build(self) -> Schema {
        Schema {
            version: self.version,
            nodes: self.nodes,
            top_level: self.top_level,
            index: self.index,
        }
    }

    fn insert(&mut self, parent: Option<usize>, name: &str, description: Option<&str>) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::SchemaParse("empty tag name".to_string()));
        }
        if self.index.contains_key(name) {
            return Err(Error::DuplicateTag(name.to_string()));
        }

        let id = self.nodes.len();
        self.nodes.push(SchemaNode {
            name: name.to_string(),
            description: description.map(str::to_string),
            parent,
            children: Vec::new(),
        });
        self.index.insert(name.to_string(), id);

        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.top_level.push(id),
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<HED version="8.3.0">
  <prologue>Sample prologue</prologue>
  <schema>
    <node>
      <name>Event</name>
      <description>Something that happens at a given time.</description>
      <node>
        <name>Sensory-event</name>
        <description>Something perceivable by an agent.</description>
      </node>
    </node>
    <node>
      <name>Item</name>
      <node>
        <name>Object</name>
        <node>
          <name>Geometric-object</name>
          <node>
            <name>2D-shape</name>
            <node>
              <name>Square</name>
              <description>A square shape.</description>
            </node>
          </node>
        </node>
      </node>
    </node>
    <node>
      <name>Property</name>
      <node>
        <name>Duration</name>
        <node>
          <name>#</name>
          <attribute><name>takesValue</name></attribute>
        </node>
      </node>
    </node>
  </schema>
  <unitClassDefinitions/>
</HED>"#;

    #[test]
    fn test_parse_hed_xml() {
        let schema = Schema::from_hed_xml(SAMPLE_XML).unwrap();

        assert_eq!(schema.version(), Some("8.3.0"));
        assert_eq!(schema.len(), 9);
        assert!(schema.contains("Square"));
        assert!(!schema.contains("#"), "value placeholders are not tags");

        let square = schema.get("Square").unwrap();
        assert_eq!(square.description(), Some("A square shape."));
        assert_eq!(schema.get("Item").unwrap().description(), None);

        let top: Vec<&str> = schema.top_level().map(|n| n.name()).collect();
        assert_eq!(top, vec!["Event", "Item", "Property"]);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let schema = Schema::from_hed_xml(SAMPLE_XML).unwrap();

        assert_eq!(
            schema.ancestors("Square").unwrap(),
            vec!["2D-shape", "Geometric-object", "Object", "Item"]
        );
        assert!(schema.ancestors("Item").unwrap().is_empty());
        assert_eq!(schema.depth("Square").unwrap(), 4);
        assert_eq!(schema.depth("Event").unwrap(), 0);
    }

    #[test]
    fn test_is_ancestor_is_strict() {
        let schema = Schema::from_hed_xml(SAMPLE_XML).unwrap();

        assert!(schema.is_ancestor("Item", "Square").unwrap());
        assert!(!schema.is_ancestor("Square", "Item").unwrap());
        assert!(!schema.is_ancestor("Square", "Square").unwrap());
        assert!(!schema.is_ancestor("Event", "Square").unwrap());
    }

    #[test]
    fn test_unknown_tag_in_queries() {
        let schema = Schema::from_hed_xml(SAMPLE_XML).unwrap();

        match schema.ancestors("Foo-bar") {
            Err(Error::UnknownTag(name)) => assert_eq!(name, "Foo-bar"),
            other => panic!("expected UnknownTag, got {:?}", other),
        }
    }

    #[test]
    fn test_node_without_name_is_rejected() {
        let xml = r#"<HED><schema><node><description>nameless</description></node></schema></HED>"#;
        assert!(matches!(Schema::from_hed_xml(xml), Err(Error::SchemaParse(_))));
    }

    #[test]
    fn test_missing_schema_element_is_rejected() {
        let xml = r#"<HED version="8.3.0"><prologue/></HED>"#;
        assert!(matches!(Schema::from_hed_xml(xml), Err(Error::SchemaParse(_))));
    }

    #[test]
    fn test_invalid_xml_is_rejected() {
        assert!(matches!(Schema::from_hed_xml("<HED><schema>"), Err(Error::SchemaParse(_))));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let xml = r#"<HED><schema>
            <node><name>Item</name><node><name>Square</name></node></node>
            <node><name>Property</name><node><name>Square</name></node></node>
        </schema></HED>"#;
        match Schema::from_hed_xml(xml) {
            Err(Error::DuplicateTag(name)) => assert_eq!(name, "Square"),
            other => panic!("expected DuplicateTag, got {:?}", other),
        }
    }

    #[test]
    fn test_outline_indents_by_depth() {
        let mut builder = SchemaBuilder::new();
        builder.add_path(&["Item", "Object"]).unwrap();
        builder.add_top_level("Event", Some("Something that happens.")).unwrap();
        let schema = builder.build();

        assert_eq!(schema.outline(false), "Item\n  Object\nEvent\n");
        assert_eq!(
            schema.outline(true),
            "Item\n  Object\nEvent: Something that happens.\n"
        );
    }

    #[test]
    fn test_builder_add_path_reuses_prefix() {
        let mut builder = SchemaBuilder::new();
        builder.add_path(&["Item", "Object", "Man-made-object"]).unwrap();
        builder.add_path(&["Item", "Object", "Natural-object"]).unwrap();
        let schema = builder.build();

        assert_eq!(schema.len(), 4);
        let object = schema.get("Object").unwrap();
        let children: Vec<&str> = schema.children_of(object).map(|n| n.name()).collect();
        assert_eq!(children, vec!["Man-made-object", "Natural-object"]);
        assert_eq!(schema.parent_of(object).map(|n| n.name()), Some("Item"));
    }

    #[test]
    fn test_builder_add_path_detects_misplaced_name() {
        let mut builder = SchemaBuilder::new();
        builder.add_path(&["Item", "Object"]).unwrap();
        assert!(matches!(
            builder.add_path(&["Property", "Object"]),
            Err(Error::DuplicateTag(_))
        ));
    }

    #[test]
    fn test_description_tag_pairs() {
        let schema = Schema::from_hed_xml(SAMPLE_XML).unwrap();
        let pairs = schema.description_tag_pairs();

        assert_eq!(pairs.len(), schema.len());
        assert_eq!(pairs[0], ("Something that happens at a given time.", "Event"));
        assert!(pairs.contains(&("", "Object")));
    }
}
