//! # Record Module
//!
//! In-memory record tree that the enrichment writes into: a logical structure of
//! nested nodes, each carrying typed metadata fields, persons and groups. Nodes
//! are addressed by their child-index path so they can be visited mutably one at
//! a time while the tree stays owned by its `Document`.
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

pub mod schema;
pub mod store;

pub use schema::Schema;
pub use store::JsonRecordStore;
pub use store::MemoryRecordStore;
pub use store::RecordStore;

/// Authority used for every reference created by the enrichment
pub const DEFAULT_AUTHORITY: &str = "gnd";
pub const DEFAULT_AUTHORITY_URI: &str = "http://d-nb.info/gnd/";

#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("Type '{kind}' is not allowed in '{container}'")]
    NotAllowed { kind: String, container: String },

    #[error("No node at '{0}'")]
    NodeNotFound(String),
}

/// Reference to an entry of an external authority file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AuthorityRef {
    pub authority: String,
    pub uri: String,
    pub identifier: String,
}

impl AuthorityRef {
    pub fn gnd(identifier: &str) -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_owned(),
            uri: DEFAULT_AUTHORITY_URI.to_owned(),
            identifier: identifier.to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Field {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<AuthorityRef>,
}

impl Field {
    pub fn new(kind: &str, value: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            value: value.to_owned(),
            authority: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Person {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<AuthorityRef>,
}

/// Typed bundle of fields and persons held by a node.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Group {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub persons: Vec<Person>,
}

impl Group {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.persons.is_empty()
    }
}

/// One structural unit of the logical tree, e.g. a volume or a chapter.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, kind: &str, value: &str) -> Self {
        self.fields.push(Field::new(kind, value));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Adds a group unless the schema rejects its type for this node.
    pub fn add_group(&mut self, schema: &Schema, group: Group) -> Result<(), RecordError> {
        schema.check_group(&self.kind, &group.kind)?;
        self.groups.push(group);
        Ok(())
    }
}

/// Read and write access to the metadata of a node or group.
pub trait MetadataHolder {
    /// Type name used for schema allow-lists
    fn container_type(&self) -> &str;

    fn fields(&self) -> &[Field];

    fn fields_mut(&mut self) -> &mut Vec<Field>;

    fn persons_mut(&mut self) -> &mut Vec<Person>;

    /// Values of all fields of the given type, in insertion order.
    fn values(&self, kind: &str) -> Vec<&str> {
        self.fields()
            .iter()
            .filter(|field| field.kind == kind)
            .map(|field| field.value.as_str())
            .collect()
    }

    fn first_field_mut(&mut self, kind: &str) -> Option<&mut Field> {
        self.fields_mut().iter_mut().find(|field| field.kind == kind)
    }

    fn add_field(&mut self, schema: &Schema, field: Field) -> Result<(), RecordError> {
        schema.check_metadata(self.container_type(), &field.kind)?;
        self.fields_mut().push(field);
        Ok(())
    }

    fn add_person(&mut self, schema: &Schema, person: Person) -> Result<(), RecordError> {
        schema.check_person(self.container_type(), &person.kind)?;
        self.persons_mut().push(person);
        Ok(())
    }
}

impl MetadataHolder for Node {
    fn container_type(&self) -> &str {
        &self.kind
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }

    fn persons_mut(&mut self) -> &mut Vec<Person> {
        &mut self.persons
    }
}

impl MetadataHolder for Group {
    fn container_type(&self) -> &str {
        &self.kind
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }

    fn persons_mut(&mut self) -> &mut Vec<Person> {
        &mut self.persons
    }
}

/// Child-index path from the logical root; the empty path is the root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Vec<usize>);

impl NodeId {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }
}

impl From<Vec<usize>> for NodeId {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// A record with its logical structure tree.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub logical: Node,
}

impl Document {
    pub fn new(logical: Node) -> Self {
        Self { logical }
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        id.0.iter().try_fold(&self.logical, |node, index| node.children.get(*index))
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        id.0.iter().try_fold(&mut self.logical, |node, index| node.children.get_mut(*index))
    }

    /// The root, when the schema declares its type as an anchor.
    pub fn anchor(&self, schema: &Schema) -> Option<NodeId> {
        schema.is_anchor(&self.logical.kind).then(NodeId::root)
    }

    /// The top logical element: the first child of an anchor root, otherwise the root.
    pub fn top_logical(&self, schema: &Schema) -> NodeId {
        match self.anchor(schema) {
            Some(anchor) if !self.logical.children.is_empty() => anchor.child(0),
            _ => NodeId::root(),
        }
    }

    /// All nodes below `id` in depth-first pre-order, `id` itself excluded.
    pub fn descendants(&self, id: &NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        if let Some(node) = self.node(id) {
            collect_descendants(node, id, &mut found);
        }
        found
    }
}

fn collect_descendants(node: &Node, id: &NodeId, found: &mut Vec<NodeId>) {
    for (index, child) in node.children.iter().enumerate() {
        let child_id = id.child(index);
        found.push(child_id.clone());
        collect_descendants(child, &child_id, found);
    }
}
