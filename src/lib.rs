//! # Spreadsheet Record Enrichment
//!
//! Enriches structured bibliographic records with values taken from an Excel
//! workbook. Rows are paired with record nodes through a shared identifier and
//! a declarative column mapping writes plain fields, persons and groups onto the
//! matched nodes.
//!
//! ## Features
//!
//! - **Direct `.xlsx` reading**: workbooks are parsed from their ZIP/XML parts,
//!   tolerating a leading byte order mark
//! - **Configurable layout**: header row and data row range are set per configuration
//! - **Canonical cell values**: numbers, booleans, text and cached formula results
//!   are rendered to stable strings
//! - **Update semantics**: existing fields are overwritten in place, never duplicated
//! - **Person names**: combined name columns are split at the last separator
//! - **All or nothing**: the record tree is only written when every stage succeeded
//!
//! ## Example
//!
//! ```no_run
//! use rusty_enrich::{ConfigSource, EnrichmentJob, JsonRecordStore};
//!
//! let mut job = EnrichmentJob::new(
//!     ConfigSource::File("plugin_enrichment.xml".into()),
//!     JsonRecordStore::new("meta.json"),
//!     "import/volume.xlsx",
//! );
//! assert!(job.run().is_done());
//! ```
pub mod config;
pub mod enrich;
pub mod error;
mod helpers;
pub mod record;
pub mod spreadsheet;
pub mod table;

pub use config::ConfigSelector;
pub use config::MappingConfig;
pub use enrich::ConfigSource;
pub use enrich::EnrichReport;
pub use enrich::EnrichmentJob;
pub use enrich::Outcome;
pub use enrich::Stage;
pub use error::EnrichError;
pub use helpers::reader::is_spreadsheet_file;
pub use record::JsonRecordStore;
pub use record::MemoryRecordStore;
pub use record::Schema;
