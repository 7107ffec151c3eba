//! # Mapping Configuration
//!
//! Declarative description of how spreadsheet columns map onto record fields,
//! loaded from the plugin configuration XML. A configuration file either has a
//! single `<config>` root or a `<config_plugin>` root holding several `<config>`
//! blocks that are selected by `<project>` and `<step>` (with `*` as wildcard).
use crate::error::EnrichError;
use crate::helpers::xml::XmlElement;
use crate::helpers::xml::XmlReader;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_FIRST_LINE: usize = 1;
const DEFAULT_ROW_HEADER: usize = 1;
const DEFAULT_ROW_DATA_START: usize = 2;
const DEFAULT_ROW_DATA_END: usize = 20000;
const DEFAULT_SEPARATOR: &str = " ";
const WILDCARD: &str = "*";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing element <{0}>")]
    MissingElement(String),

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Invalid value '{value}' for '{name}'")]
    InvalidValue { name: String, value: String },

    #[error("No <config> block matches project '{project}' and step '{step}'")]
    NoMatchingBlock { project: String, step: String },
}

/// One plain metadata field to populate.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMapping {
    /// Target field type in the record schema
    pub field: String,
    /// Header label of the source column
    pub header: String,
    /// Header label of the column holding an authority identifier
    pub authority_header: Option<String>,
}

/// Where the name parts of a person come from.
#[derive(Clone, Debug, PartialEq)]
pub enum NameSource {
    /// One column holding both parts, divided at the last separator
    Combined {
        header: String,
        separator: String,
        given_name_first: bool,
    },
    /// Separate columns for given and family name
    Split {
        given_name_header: Option<String>,
        family_name_header: Option<String>,
    },
}

/// One person entry to append.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonMapping {
    /// Target person type in the record schema
    pub field: String,
    pub source: NameSource,
    pub authority_header: Option<String>,
}

/// Which nodes receive a group, relative to the matched node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GroupTarget {
    /// The matched node itself
    Child,
    /// The top logical element of the document
    Logical,
    /// The anchor element, when the document has one
    Anchor,
}

impl FromStr for GroupTarget {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "child" => Ok(Self::Child),
            "logical" => Ok(Self::Logical),
            "anchor" => Ok(Self::Anchor),
            _ => Err(ConfigError::InvalidValue {
                name: "docType".to_owned(),
                value: value.to_owned(),
            }),
        }
    }
}

/// A sub-record populated beneath the target nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupMapping {
    /// Target group type in the record schema
    pub group: String,
    pub target: GroupTarget,
    pub fields: Vec<FieldMapping>,
    pub persons: Vec<PersonMapping>,
}

/// A single configured mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum Mapping {
    Field(FieldMapping),
    Person(PersonMapping),
    Group(GroupMapping),
}

/// Complete configuration of one enrichment run.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingConfig {
    /// Kept for compatibility with existing configuration files; not used for matching
    pub first_line: usize,
    /// Record field holding each node's identifier
    pub identifier_field: String,
    /// Header label of the spreadsheet column holding the identifier
    pub identifier_header: String,
    /// Physical row (1-based) holding the header labels
    pub header_row: usize,
    /// First physical data row (1-based)
    pub data_row_start: usize,
    /// Last physical data row (1-based, inclusive)
    pub data_row_end: usize,
    /// Field mappings first, then person mappings, then groups
    pub mappings: Vec<Mapping>,
}

/// Chooses a `<config>` block from a `<config_plugin>` file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigSelector {
    pub project: Option<String>,
    pub step: Option<String>,
}

impl ConfigSelector {
    pub fn new(project: Option<String>, step: Option<String>) -> Self {
        Self { project, step }
    }

    /// Lower is better; `None` when the block does not apply at all.
    fn rank(&self, block: &XmlElement) -> Option<u8> {
        let project = selector_match(block, "project", self.project.as_deref())?;
        let step = selector_match(block, "step", self.step.as_deref())?;
        Some(match (project, step) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        })
    }
}

/// `Some(true)` on an exact match, `Some(false)` on a wildcard, `None` otherwise.
/// A block without any selector element of that name behaves like a wildcard.
fn selector_match(block: &XmlElement, name: &str, wanted: Option<&str>) -> Option<bool> {
    let values: Vec<&str> = block.children_named(name).map(|child| child.text.trim()).collect();
    if values.is_empty() {
        return Some(false);
    }
    if let Some(wanted) = wanted {
        if values.contains(&wanted) {
            return Some(true);
        }
    }
    values.contains(&WILDCARD).then_some(false)
}

impl MappingConfig {
    /// Loads the configuration file and selects the block for this project and step.
    pub fn load<P: AsRef<Path>>(path: P, selector: &ConfigSelector) -> Result<MappingConfig, EnrichError> {
        let mut reader = XmlReader::new(BufReader::new(File::open(path)?));
        let root = XmlElement::parse(&mut reader)?;
        Ok(Self::from_root(&root, selector)?)
    }

    pub fn from_xml(xml: &str, selector: &ConfigSelector) -> Result<MappingConfig, EnrichError> {
        let mut reader = XmlReader::new(Cursor::new(xml.as_bytes()));
        let root = XmlElement::parse(&mut reader)?;
        Ok(Self::from_root(&root, selector)?)
    }

    fn from_root(root: &XmlElement, selector: &ConfigSelector) -> Result<MappingConfig, ConfigError> {
        if root.name == "config" {
            return Self::from_block(root);
        }
        let block = root
            .children_named("config")
            .filter_map(|block| selector.rank(block).map(|rank| (rank, block)))
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, block)| block)
            .ok_or_else(|| ConfigError::NoMatchingBlock {
                project: selector.project.clone().unwrap_or_default(),
                step: selector.step.clone().unwrap_or_default(),
            })?;
        Self::from_block(block)
    }

    fn from_block(block: &XmlElement) -> Result<MappingConfig, ConfigError> {
        let header_row = parse_number(block, "rowHeader", DEFAULT_ROW_HEADER)?;
        if header_row == 0 {
            return Err(ConfigError::InvalidValue {
                name: "rowHeader".to_owned(),
                value: "0".to_owned(),
            });
        }

        let mut mappings = Vec::new();
        for element in block.children_named("metadata") {
            mappings.push(Mapping::Field(parse_field(element)?));
        }
        for element in block.children_named("person") {
            mappings.push(Mapping::Person(parse_person(element)?));
        }
        for element in block.children_named("group") {
            mappings.push(Mapping::Group(parse_group(element)?));
        }

        Ok(MappingConfig {
            first_line: parse_number(block, "firstLine", DEFAULT_FIRST_LINE)?,
            identifier_field: required_text(block, "docstructIdentifier")?,
            identifier_header: required_text(block, "excelIdentifierColumn")?,
            header_row,
            data_row_start: parse_number(block, "rowDataStart", DEFAULT_ROW_DATA_START)?,
            data_row_end: parse_number(block, "rowDataEnd", DEFAULT_ROW_DATA_END)?,
            mappings,
        })
    }

    /// Number of physical rows the table reader ever needs to look at.
    pub fn row_limit(&self) -> usize {
        self.header_row.max(self.data_row_end)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter().filter_map(|mapping| match mapping {
            Mapping::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn persons(&self) -> impl Iterator<Item = &PersonMapping> {
        self.mappings.iter().filter_map(|mapping| match mapping {
            Mapping::Person(person) => Some(person),
            _ => None,
        })
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupMapping> {
        self.mappings.iter().filter_map(|mapping| match mapping {
            Mapping::Group(group) => Some(group),
            _ => None,
        })
    }
}

fn parse_field(element: &XmlElement) -> Result<FieldMapping, ConfigError> {
    Ok(FieldMapping {
        field: required_attribute(element, "ugh")?,
        header: required_attribute(element, "headerName")?,
        authority_header: element.attribute("normdataHeaderName").map(str::to_owned),
    })
}

fn parse_person(element: &XmlElement) -> Result<PersonMapping, ConfigError> {
    let split_name = element.child("splitName");
    let combined = split_name
        .map(|split| parse_bool("splitName", &split.text))
        .transpose()?
        .unwrap_or(false);
    let source = if combined {
        let given_name_first = split_name
            .and_then(|split| split.attribute("firstNameIsFirstPart"))
            .map(|value| parse_bool("firstNameIsFirstPart", value))
            .transpose()?
            .unwrap_or(false);
        NameSource::Combined {
            header: optional_text(element, "nameFieldHeader")
                .ok_or_else(|| ConfigError::MissingElement("nameFieldHeader".to_owned()))?,
            separator: element
                .child_text("splitChar")
                .filter(|separator| !separator.is_empty())
                .unwrap_or(DEFAULT_SEPARATOR)
                .to_owned(),
            given_name_first,
        }
    } else {
        NameSource::Split {
            given_name_header: optional_text(element, "firstnameFieldHeader"),
            family_name_header: optional_text(element, "lastnameFieldHeader"),
        }
    };
    Ok(PersonMapping {
        field: required_attribute(element, "ugh")?,
        source,
        authority_header: element.attribute("normdataHeaderName").map(str::to_owned),
    })
}

fn parse_group(element: &XmlElement) -> Result<GroupMapping, ConfigError> {
    Ok(GroupMapping {
        group: required_attribute(element, "ugh")?,
        target: element.attribute("docType").unwrap_or("child").parse()?,
        fields: element.children_named("metadata").map(parse_field).collect::<Result<_, _>>()?,
        persons: element.children_named("person").map(parse_person).collect::<Result<_, _>>()?,
    })
}

fn required_attribute(element: &XmlElement, name: &str) -> Result<String, ConfigError> {
    element
        .attribute(name)
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::MissingAttribute {
            element: element.name.to_owned(),
            attribute: name.to_owned(),
        })
}

/// Trimmed text of a child element; empty text counts as absent.
fn optional_text(element: &XmlElement, name: &str) -> Option<String> {
    element
        .child_text(name)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn required_text(element: &XmlElement, name: &str) -> Result<String, ConfigError> {
    optional_text(element, name).ok_or_else(|| ConfigError::MissingElement(name.to_owned()))
}

fn parse_number(element: &XmlElement, name: &str, default: usize) -> Result<usize, ConfigError> {
    match optional_text(element, name) {
        Some(text) => text.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_owned(),
            value: text,
        }),
        None => Ok(default),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<config_plugin>
    <config>
        <project>*</project>
        <step>*</step>
        <docstructIdentifier>CatalogIDDigital</docstructIdentifier>
        <excelIdentifierColumn>identifier</excelIdentifierColumn>
    </config>
    <config>
        <project>Manuscripts</project>
        <step>*</step>
        <firstLine>3</firstLine>
        <docstructIdentifier>CatalogIDDigital</docstructIdentifier>
        <excelIdentifierColumn> identifier </excelIdentifierColumn>
        <rowHeader>2</rowHeader>
        <rowDataStart>4</rowDataStart>
        <rowDataEnd>500</rowDataEnd>
        <metadata ugh="TitleDocMain" headerName="title" normdataHeaderName="title gnd"/>
        <metadata ugh="DocLanguage" headerName="language"/>
        <person ugh="Author" normdataHeaderName="author gnd">
            <nameFieldHeader>author</nameFieldHeader>
            <splitChar>,</splitChar>
            <splitName firstNameIsFirstPart="true">true</splitName>
        </person>
        <person ugh="Editor">
            <firstnameFieldHeader>editor first</firstnameFieldHeader>
            <lastnameFieldHeader>editor last</lastnameFieldHeader>
        </person>
        <group ugh="Provenance" docType="logical">
            <metadata ugh="ProvenanceLocation" headerName="place"/>
            <person ugh="ProvenanceOwner">
                <nameFieldHeader>owner</nameFieldHeader>
                <splitName>yes</splitName>
            </person>
        </group>
    </config>
    <config>
        <project>Manuscripts</project>
        <step>Enrich from table</step>
        <docstructIdentifier>ExactIdentifier</docstructIdentifier>
        <excelIdentifierColumn>identifier</excelIdentifierColumn>
    </config>
</config_plugin>"#;

    fn selector(project: &str, step: &str) -> ConfigSelector {
        ConfigSelector::new(Some(project.to_owned()), Some(step.to_owned()))
    }

    #[test]
    fn parses_full_block() {
        let config = MappingConfig::from_xml(SAMPLE, &selector("Manuscripts", "Other step")).unwrap();
        assert_eq!(config.first_line, 3);
        assert_eq!(config.identifier_field, "CatalogIDDigital");
        assert_eq!(config.identifier_header, "identifier");
        assert_eq!((config.header_row, config.data_row_start, config.data_row_end), (2, 4, 500));
        assert_eq!(config.row_limit(), 500);

        let fields: Vec<_> = config.fields().collect();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].authority_header.as_deref(), Some("title gnd"));
        assert_eq!(fields[1].authority_header, None);

        let persons: Vec<_> = config.persons().collect();
        assert_eq!(persons[0].source, NameSource::Combined {
            header: "author".to_owned(),
            separator: ",".to_owned(),
            given_name_first: true,
        });
        assert_eq!(persons[1].source, NameSource::Split {
            given_name_header: Some("editor first".to_owned()),
            family_name_header: Some("editor last".to_owned()),
        });

        let groups: Vec<_> = config.groups().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].target, GroupTarget::Logical);
        assert_eq!(groups[0].fields[0].field, "ProvenanceLocation");
        assert_eq!(groups[0].persons[0].source, NameSource::Combined {
            header: "owner".to_owned(),
            separator: " ".to_owned(),
            given_name_first: false,
        });
    }

    #[test]
    fn nested_group_mappings_stay_in_group() {
        let config = MappingConfig::from_xml(SAMPLE, &selector("Manuscripts", "Other step")).unwrap();
        assert!(config.fields().all(|field| field.field != "ProvenanceLocation"));
        assert!(config.persons().all(|person| person.field != "ProvenanceOwner"));
        assert!(matches!(config.mappings[0], Mapping::Field(_)));
        assert!(matches!(config.mappings.last(), Some(Mapping::Group(_))));
    }

    #[test]
    fn selects_most_specific_block() {
        let exact = MappingConfig::from_xml(SAMPLE, &selector("Manuscripts", "Enrich from table")).unwrap();
        assert_eq!(exact.identifier_field, "ExactIdentifier");

        let fallback = MappingConfig::from_xml(SAMPLE, &selector("Prints", "Enrich from table")).unwrap();
        assert_eq!(fallback.header_row, DEFAULT_ROW_HEADER);
        assert_eq!(fallback.data_row_start, DEFAULT_ROW_DATA_START);
        assert_eq!(fallback.data_row_end, DEFAULT_ROW_DATA_END);
        assert!(fallback.mappings.is_empty());
    }

    #[test]
    fn no_matching_block() {
        let xml = "<config_plugin><config><project>A</project><step>B</step></config></config_plugin>";
        let error = MappingConfig::from_xml(xml, &selector("C", "B")).unwrap_err();
        assert!(matches!(error, EnrichError::ConfigError(ConfigError::NoMatchingBlock { .. })));
    }

    #[test]
    fn bare_config_root() {
        let xml = r#"<config>
            <docstructIdentifier>id</docstructIdentifier>
            <excelIdentifierColumn>ID</excelIdentifierColumn>
            <person ugh="Author"><nameFieldHeader>name</nameFieldHeader><splitName>true</splitName><splitChar> </splitChar></person>
        </config>"#;
        let config = MappingConfig::from_xml(xml, &ConfigSelector::default()).unwrap();
        let person = config.persons().next().unwrap();
        assert_eq!(person.source, NameSource::Combined {
            header: "name".to_owned(),
            separator: " ".to_owned(),
            given_name_first: false,
        });
    }

    #[test]
    fn rejects_invalid_configuration() {
        let cases = [
            ("<config><excelIdentifierColumn>ID</excelIdentifierColumn></config>", "docstructIdentifier"),
            ("<config><docstructIdentifier>id</docstructIdentifier><excelIdentifierColumn>ID</excelIdentifierColumn><rowHeader>x</rowHeader></config>", "rowHeader"),
            ("<config><docstructIdentifier>id</docstructIdentifier><excelIdentifierColumn>ID</excelIdentifierColumn><rowHeader>0</rowHeader></config>", "rowHeader"),
            ("<config><docstructIdentifier>id</docstructIdentifier><excelIdentifierColumn>ID</excelIdentifierColumn><metadata headerName=\"t\"/></config>", "ugh"),
            ("<config><docstructIdentifier>id</docstructIdentifier><excelIdentifierColumn>ID</excelIdentifierColumn><group ugh=\"G\" docType=\"physical\"/></config>", "docType"),
            ("<config><docstructIdentifier>id</docstructIdentifier><excelIdentifierColumn>ID</excelIdentifierColumn><person ugh=\"A\"><splitName>true</splitName></person></config>", "nameFieldHeader"),
        ];
        for (xml, name) in cases {
            let error = MappingConfig::from_xml(xml, &ConfigSelector::default()).unwrap_err();
            assert!(error.to_string().contains(name), "{name}: {error}");
        }
    }

    #[test]
    fn boolean_values() {
        assert!(parse_bool("b", "TRUE").unwrap());
        assert!(parse_bool("b", " on ").unwrap());
        assert!(!parse_bool("b", "no").unwrap());
        assert!(parse_bool("b", "maybe").is_err());
    }
}
