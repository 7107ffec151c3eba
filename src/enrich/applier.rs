use crate::config::FieldMapping;
use crate::config::GroupMapping;
use crate::config::GroupTarget;
use crate::config::Mapping;
use crate::config::NameSource;
use crate::config::PersonMapping;
use crate::record::AuthorityRef;
use crate::record::Document;
use crate::record::Field;
use crate::record::Group;
use crate::record::MetadataHolder;
use crate::record::Node;
use crate::record::NodeId;
use crate::record::Person;
use crate::record::RecordError;
use crate::record::Schema;
use crate::table::HeaderIndex;
use crate::table::Row;
use tracing::debug;
use tracing::warn;

/// Writes the values of one table row onto a matched node.
pub struct Applier<'a> {
    header: &'a HeaderIndex,
    schema: &'a Schema,
}

impl<'a> Applier<'a> {
    pub fn new(header: &'a HeaderIndex, schema: &'a Schema) -> Self {
        Self { header, schema }
    }

    /// Applies every mapping in order. Gaps in the data or the schema are logged
    /// and skipped; only a node id that is not in the document is an error.
    pub fn apply(&self, document: &mut Document, id: &NodeId, row: &Row, mappings: &[Mapping]) -> Result<(), RecordError> {
        for mapping in mappings {
            match mapping {
                Mapping::Field(field) => self.apply_field(node_at(document, id)?, row, field),
                Mapping::Person(person) => self.apply_person(node_at(document, id)?, row, person),
                Mapping::Group(group) => self.apply_group(document, id, row, group)?,
            }
        }
        Ok(())
    }

    fn value<'r>(&self, row: &'r Row, label: &str) -> Option<&'r str> {
        let value = row.lookup(self.header, label);
        if value.is_none() {
            debug!("No value under header '{}'", label);
        }
        value
    }

    fn authority(&self, row: &Row, label: Option<&str>) -> Option<AuthorityRef> {
        label
            .and_then(|label| self.value(row, label))
            .filter(|identifier| !identifier.trim().is_empty())
            .map(AuthorityRef::gnd)
    }

    /// Overwrites the first existing field of the type, or adds a non-blank value.
    fn apply_field<H: MetadataHolder>(&self, holder: &mut H, row: &Row, mapping: &FieldMapping) {
        let Some(value) = self.value(row, &mapping.header) else {
            return;
        };
        if let Some(existing) = holder.first_field_mut(&mapping.field) {
            existing.value = value.to_owned();
            return;
        }
        if value.trim().is_empty() {
            return;
        }
        let field = Field {
            authority: self.authority(row, mapping.authority_header.as_deref()),
            ..Field::new(&mapping.field, value)
        };
        if let Err(error) = holder.add_field(self.schema, field) {
            warn!("Skip field '{}': {}", mapping.field, error);
        }
    }

    /// Always appends a new person, even with empty name parts.
    fn apply_person<H: MetadataHolder>(&self, holder: &mut H, row: &Row, mapping: &PersonMapping) {
        if mapping.field.trim().is_empty() {
            return;
        }
        let (given_name, family_name) = match &mapping.source {
            NameSource::Combined {
                header,
                separator,
                given_name_first,
            } => split_name(self.value(row, header).unwrap_or_default(), separator, *given_name_first),
            NameSource::Split {
                given_name_header,
                family_name_header,
            } => (
                self.optional_value(row, given_name_header.as_deref()),
                self.optional_value(row, family_name_header.as_deref()),
            ),
        };
        let person = Person {
            kind: mapping.field.to_owned(),
            given_name,
            family_name,
            authority: self.authority(row, mapping.authority_header.as_deref()),
        };
        if let Err(error) = holder.add_person(self.schema, person) {
            warn!("Skip person '{}': {}", mapping.field, error);
        }
    }

    fn optional_value(&self, row: &Row, label: Option<&str>) -> String {
        label
            .and_then(|label| self.value(row, label))
            .unwrap_or_default()
            .to_owned()
    }

    fn apply_group(&self, document: &mut Document, id: &NodeId, row: &Row, mapping: &GroupMapping) -> Result<(), RecordError> {
        let target = match mapping.target {
            GroupTarget::Child => Some(id.clone()),
            GroupTarget::Logical => Some(document.top_logical(self.schema)),
            GroupTarget::Anchor => document.anchor(self.schema),
        };
        match target {
            Some(target) => self.apply_group_to(node_at(document, &target)?, row, mapping),
            None => debug!("No anchor for group '{}'", mapping.group),
        }
        Ok(())
    }

    /// Fills the first group of the type on `node`, creating it when something was filled in.
    fn apply_group_to(&self, node: &mut Node, row: &Row, mapping: &GroupMapping) {
        if let Some(group) = node.groups.iter_mut().find(|group| group.kind == mapping.group) {
            self.fill_group(group, row, mapping);
            return;
        }
        let mut group = Group::new(&mapping.group);
        self.fill_group(&mut group, row, mapping);
        if group.is_empty() {
            return;
        }
        if let Err(error) = node.add_group(self.schema, group) {
            warn!("Skip group '{}': {}", mapping.group, error);
        }
    }

    fn fill_group(&self, group: &mut Group, row: &Row, mapping: &GroupMapping) {
        for field in &mapping.fields {
            self.apply_field(group, row, field);
        }
        for person in &mapping.persons {
            self.apply_person(group, row, person);
        }
    }
}

fn node_at<'d>(document: &'d mut Document, id: &NodeId) -> Result<&'d mut Node, RecordError> {
    document
        .node_mut(id)
        .ok_or_else(|| RecordError::NodeNotFound(id.to_string()))
}

/// Splits a combined name at the last separator into (given name, family name).
///
/// With the given name first, the separator stays at the start of the family
/// name and neither part is trimmed. With the family name first, both parts are
/// trimmed. Without a separator the whole value is the family name.
pub fn split_name(name: &str, separator: &str, given_name_first: bool) -> (String, String) {
    if name.trim().is_empty() {
        return (String::new(), String::new());
    }
    match name.rfind(separator) {
        Some(index) if given_name_first => (name[..index].to_owned(), name[index..].to_owned()),
        Some(index) => (
            name[index + separator.len()..].trim().to_owned(),
            name[..index].trim().to_owned(),
        ),
        None => (String::new(), name.to_owned()),
    }
}
