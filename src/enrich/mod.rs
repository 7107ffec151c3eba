//! # Enrichment
//!
//! Runs one enrichment: load the mapping configuration and the record tree,
//! read the spreadsheet into a table, match table rows to nodes by identifier,
//! apply the mappings and persist the tree. Persistence only happens when every
//! earlier stage succeeded.
use crate::config::ConfigSelector;
use crate::config::MappingConfig;
use crate::error::EnrichError;
use crate::error::ResultMessage;
use crate::helpers::reader::is_spreadsheet_file;
use crate::helpers::reader::resolve_location;
use crate::record::RecordStore;
use crate::record::Schema;
use crate::table::read_table;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

pub mod applier;
pub mod matcher;

pub use applier::split_name;
pub use applier::Applier;
pub use matcher::match_nodes;
pub use matcher::Match;
pub use matcher::Matching;

/// States of an enrichment run, in execution order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    LoadConfig,
    LoadRecordTree,
    ResolveInputFile,
    ReadTable,
    Match,
    Apply,
    PersistRecordTree,
    Done,
    Failed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::LoadConfig => "LOAD_CONFIG",
            Stage::LoadRecordTree => "LOAD_RECORD_TREE",
            Stage::ResolveInputFile => "RESOLVE_INPUT_FILE",
            Stage::ReadTable => "READ_TABLE",
            Stage::Match => "MATCH",
            Stage::Apply => "APPLY",
            Stage::PersistRecordTree => "PERSIST_RECORD_TREE",
            Stage::Done => "DONE",
            Stage::Failed => "FAILED",
        })
    }
}

/// Counters of a successful run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnrichReport {
    pub table_rows: usize,
    pub nodes_examined: usize,
    pub nodes_matched: usize,
    pub nodes_without_identifier: usize,
    pub nodes_without_row: usize,
}

/// Terminal state of a run. The cause of a failure is logged, not returned.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Done(EnrichReport),
    /// `stage` is the stage that failed
    Failed { stage: Stage },
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }
}

/// Where the mapping configuration comes from.
#[derive(Clone, Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Loaded(MappingConfig),
}

/// One enrichment of one record from one spreadsheet.
pub struct EnrichmentJob<S: RecordStore> {
    config: ConfigSource,
    selector: ConfigSelector,
    store: S,
    schema: Schema,
    /// Spreadsheet path or `file://` URL
    input: String,
}

impl<S: RecordStore> EnrichmentJob<S> {
    pub fn new(config: ConfigSource, store: S, input: &str) -> Self {
        Self {
            config,
            selector: ConfigSelector::default(),
            store,
            schema: Schema::permissive(),
            input: input.to_owned(),
        }
    }

    pub fn with_selector(mut self, selector: ConfigSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn run(&mut self) -> Outcome {
        let mut stage = Stage::LoadConfig;
        match self.execute(&mut stage) {
            Ok(report) => {
                info!(
                    "Enriched {} of {} nodes from {} table rows",
                    report.nodes_matched, report.nodes_examined, report.table_rows
                );
                Outcome::Done(report)
            }
            Err(e) => {
                if e.is_lookup_failure() {
                    error!("{}", e);
                } else {
                    error!("Enrichment failed in {}: {}", stage, e);
                }
                let failed = stage;
                enter(&mut stage, Stage::Failed);
                Outcome::Failed { stage: failed }
            }
        }
    }

    fn execute(&mut self, stage: &mut Stage) -> Result<EnrichReport, EnrichError> {
        let config = match &self.config {
            ConfigSource::File(path) => MappingConfig::load(path, &self.selector)
                .with_prefix(&format!("Failed to load configuration '{}'", path.display()))?,
            ConfigSource::Loaded(config) => config.clone(),
        };

        enter(stage, Stage::LoadRecordTree);
        let mut document = self.store.load().with_prefix("Failed to load record tree")?;

        enter(stage, Stage::ResolveInputFile);
        let path = resolve_location(&self.input)?;
        if !is_spreadsheet_file(&path.to_string_lossy()) {
            warn!("Input '{}' does not look like an .xlsx workbook", path.display());
        }

        enter(stage, Stage::ReadTable);
        let (header, table) = read_table(&path, &config)
            .with_prefix(&format!("Failed to read '{}'", path.display()))?;

        enter(stage, Stage::Match);
        let nodes = document.descendants(&document.top_logical(&self.schema));
        let matching = match_nodes(&document, &nodes, &config.identifier_field, &table);

        enter(stage, Stage::Apply);
        let applier = Applier::new(&header, &self.schema);
        for found in &matching.matches {
            debug!("Apply row '{}' to node {}", found.identifier, found.node);
            applier.apply(&mut document, &found.node, found.row, &config.mappings)?;
        }

        enter(stage, Stage::PersistRecordTree);
        self.store.save(&document).with_prefix("Failed to save record tree")?;

        enter(stage, Stage::Done);
        Ok(EnrichReport {
            table_rows: table.len(),
            nodes_examined: nodes.len(),
            nodes_matched: matching.matches.len(),
            nodes_without_identifier: matching.without_identifier,
            nodes_without_row: matching.without_row,
        })
    }
}

fn enter(stage: &mut Stage, next: Stage) {
    debug!("{} -> {}", stage, next);
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSelector;
    use crate::record::Document;
    use crate::record::JsonRecordStore;
    use crate::record::MemoryRecordStore;
    use crate::record::MetadataHolder;
    use crate::record::Node;
    use crate::spreadsheet::fixture::WorkbookFixture;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"<config_plugin>
        <config>
            <project>*</project>
            <step>*</step>
            <docstructIdentifier>CatalogIDDigital</docstructIdentifier>
            <excelIdentifierColumn>identifier</excelIdentifierColumn>
            <rowHeader>1</rowHeader>
            <rowDataStart>2</rowDataStart>
            <rowDataEnd>20</rowDataEnd>
            <metadata ugh="TitleDocMain" headerName="title"/>
            <metadata ugh="DocLanguage" headerName="language"/>
            <person ugh="Author">
                <nameFieldHeader>author</nameFieldHeader>
                <splitName>true</splitName>
                <splitChar> </splitChar>
            </person>
        </config>
    </config_plugin>"#;

    fn workbook() -> NamedTempFile {
        let fixture = WorkbookFixture::new()
            .text_row(1, &["identifier", "title", "language", "author"])
            .text_row(2, &["ID1", "Only a title"])
            .text_row(3, &["ID2", "Updated title"])
            .text_row(4, &["ID3", "Full entry", "ger", "Doe John"])
            .text_row(5, &["ID4", "Not in the tree"]);
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        fixture.write_to(file.path());
        file
    }

    fn config() -> ConfigSource {
        ConfigSource::Loaded(MappingConfig::from_xml(CONFIG, &ConfigSelector::default()).unwrap())
    }

    fn chapter(identifier: &str) -> Node {
        Node::new("Chapter").with_field("CatalogIDDigital", identifier)
    }

    fn document() -> Document {
        Document::new(
            Node::new("Monograph")
                .with_child(chapter("ID9"))
                .with_child(chapter("ID1"))
                .with_child(chapter("ID2").with_field("TitleDocMain", "Old title"))
                .with_child(chapter("ID3"))
                .with_child(Node::new("Chapter")),
        )
    }

    #[test]
    fn enriches_matched_nodes() {
        let workbook = workbook();
        let input = workbook.path().to_string_lossy().into_owned();
        let mut job = EnrichmentJob::new(config(), MemoryRecordStore::new(document()), &input);

        let outcome = job.run();
        assert_eq!(outcome, Outcome::Done(EnrichReport {
            table_rows: 4,
            nodes_examined: 5,
            nodes_matched: 3,
            nodes_without_identifier: 1,
            nodes_without_row: 1,
        }));

        let store = job.into_store();
        assert_eq!(store.saves, 1);
        let chapters = &store.document.logical.children;

        assert_eq!(chapters[0].fields.len(), 1);
        assert!(chapters[0].persons.is_empty());

        assert_eq!(chapters[1].fields.len(), 2);
        assert_eq!(chapters[1].values("TitleDocMain"), vec!["Only a title"]);

        assert_eq!(chapters[2].fields.len(), 2);
        assert_eq!(chapters[2].values("TitleDocMain"), vec!["Updated title"]);

        assert_eq!(chapters[3].values("TitleDocMain"), vec!["Full entry"]);
        assert_eq!(chapters[3].values("DocLanguage"), vec!["ger"]);
        assert_eq!(chapters[3].persons.len(), 1);
        assert_eq!(chapters[3].persons[0].given_name, "John");
        assert_eq!(chapters[3].persons[0].family_name, "Doe");
    }

    #[test]
    fn configuration_and_records_from_files() {
        let workbook = workbook();
        let directory = tempfile::tempdir().unwrap();
        let config_path = directory.path().join("plugin_enrichment.xml");
        std::fs::write(&config_path, CONFIG).unwrap();
        let records_path = directory.path().join("meta.json");
        JsonRecordStore::new(&records_path).save(&document()).unwrap();

        let input = url::Url::from_file_path(workbook.path()).unwrap().to_string();
        let mut job = EnrichmentJob::new(ConfigSource::File(config_path), JsonRecordStore::new(&records_path), &input)
            .with_selector(ConfigSelector::new(Some("Manuscripts".to_owned()), None));
        assert!(job.run().is_done());

        let saved = JsonRecordStore::new(&records_path).load().unwrap();
        assert_eq!(saved.logical.children[3].values("DocLanguage"), vec!["ger"]);
    }

    #[test]
    fn anchor_documents_start_below_the_anchor() {
        let workbook = workbook();
        let input = workbook.path().to_string_lossy().into_owned();
        let document = Document::new(
            Node::new("Periodical")
                .with_field("CatalogIDDigital", "ID1")
                .with_child(Node::new("PeriodicalVolume").with_child(chapter("ID3"))),
        );
        let schema: Schema = serde_json::from_str(r#"{"anchor_types": ["Periodical"]}"#).unwrap();
        let mut job = EnrichmentJob::new(config(), MemoryRecordStore::new(document), &input).with_schema(schema);

        let Outcome::Done(report) = job.run() else {
            panic!("run failed");
        };
        assert_eq!(report.nodes_examined, 1);
        let logical = &job.store().document.logical;
        assert!(logical.values("TitleDocMain").is_empty());
        assert_eq!(logical.children[0].children[0].values("TitleDocMain"), vec!["Full entry"]);
    }

    #[test]
    fn missing_input_fails_without_saving() {
        let mut job = EnrichmentJob::new(config(), MemoryRecordStore::new(document()), "/does/not/exist.xlsx");
        assert_eq!(job.run(), Outcome::Failed { stage: Stage::ResolveInputFile });
        assert_eq!(job.store().saves, 0);
        assert_eq!(job.store().document, document());
    }

    #[test]
    fn unreadable_input_fails_without_saving() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        std::fs::write(file.path(), "identifier;title").unwrap();
        let input = file.path().to_string_lossy().into_owned();
        let mut job = EnrichmentJob::new(config(), MemoryRecordStore::new(document()), &input);
        assert_eq!(job.run(), Outcome::Failed { stage: Stage::ReadTable });
        assert_eq!(job.store().saves, 0);
    }

    #[test]
    fn configuration_errors_fail_first() {
        let directory = tempfile::tempdir().unwrap();
        let records_path = directory.path().join("meta.json");
        JsonRecordStore::new(&records_path).save(&document()).unwrap();
        let before = std::fs::read_to_string(&records_path).unwrap();

        let mut job = EnrichmentJob::new(
            ConfigSource::File(directory.path().join("missing.xml")),
            JsonRecordStore::new(&records_path),
            "unused.xlsx",
        );
        assert_eq!(job.run(), Outcome::Failed { stage: Stage::LoadConfig });
        assert_eq!(std::fs::read_to_string(&records_path).unwrap(), before);
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::PersistRecordTree.to_string(), "PERSIST_RECORD_TREE");
        assert_eq!(Stage::Failed.to_string(), "FAILED");
    }
}
