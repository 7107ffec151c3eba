use crate::error::EnrichError;
use crate::record::RecordError;
use serde::Deserialize;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Type rules of the record tree.
///
/// Every list is optional: an absent list accepts any name. `allowed` restricts
/// which field, person and group types a given container type may hold;
/// containers without an entry accept every known type.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Schema {
    pub metadata_types: Option<HashSet<String>>,
    pub person_types: Option<HashSet<String>>,
    pub group_types: Option<HashSet<String>>,
    pub anchor_types: HashSet<String>,
    pub allowed: HashMap<String, HashSet<String>>,
}

impl Schema {
    /// Accepts every type and declares no anchors.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Schema, EnrichError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn is_anchor(&self, kind: &str) -> bool {
        self.anchor_types.contains(kind)
    }

    pub fn check_metadata(&self, container: &str, kind: &str) -> Result<(), RecordError> {
        check(self.metadata_types.as_ref(), kind)?;
        self.check_allowed(container, kind)
    }

    pub fn check_person(&self, container: &str, kind: &str) -> Result<(), RecordError> {
        check(self.person_types.as_ref(), kind)?;
        self.check_allowed(container, kind)
    }

    pub fn check_group(&self, container: &str, kind: &str) -> Result<(), RecordError> {
        check(self.group_types.as_ref(), kind)?;
        self.check_allowed(container, kind)
    }

    fn check_allowed(&self, container: &str, kind: &str) -> Result<(), RecordError> {
        match self.allowed.get(container) {
            Some(allowed) if !allowed.contains(kind) => Err(RecordError::NotAllowed {
                kind: kind.to_owned(),
                container: container.to_owned(),
            }),
            _ => Ok(()),
        }
    }
}

fn check(known: Option<&HashSet<String>>, kind: &str) -> Result<(), RecordError> {
    match known {
        Some(known) if !known.contains(kind) => Err(RecordError::UnknownType(kind.to_owned())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn permissive_accepts_everything() {
        let schema = Schema::permissive();
        assert!(schema.check_metadata("Anything", "Whatever").is_ok());
        assert!(schema.check_person("Anything", "Whatever").is_ok());
        assert!(schema.check_group("Anything", "Whatever").is_ok());
        assert!(!schema.is_anchor("Periodical"));
    }

    #[test]
    fn loads_rules_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{
            "metadata_types": ["TitleDocMain", "DocLanguage"],
            "person_types": ["Author"],
            "group_types": ["Provenance"],
            "anchor_types": ["Periodical"],
            "allowed": {{"Provenance": ["DocLanguage"]}}
        }}"#).unwrap();
        let schema = Schema::load(file.path()).unwrap();

        assert!(schema.is_anchor("Periodical"));
        assert!(schema.check_metadata("Monograph", "TitleDocMain").is_ok());
        assert_eq!(
            schema.check_metadata("Monograph", "Shelfmark"),
            Err(RecordError::UnknownType("Shelfmark".to_owned()))
        );
        assert!(schema.check_metadata("Provenance", "DocLanguage").is_ok());
        assert!(matches!(
            schema.check_metadata("Provenance", "TitleDocMain"),
            Err(RecordError::NotAllowed { .. })
        ));
        assert!(schema.check_person("Monograph", "Editor").is_err());
        assert!(schema.check_group("Monograph", "Provenance").is_ok());
    }

    #[test]
    fn malformed_schema_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2").unwrap();
        assert!(matches!(Schema::load(file.path()), Err(EnrichError::JsonError(_))));
    }
}
