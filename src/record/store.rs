use crate::error::EnrichError;
use crate::record::Document;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Loads and persists the record tree of one run.
pub trait RecordStore {
    fn load(&mut self) -> Result<Document, EnrichError>;

    fn save(&mut self, document: &Document) -> Result<(), EnrichError>;
}

/// Record tree stored as a JSON file.
///
/// Saving writes a sibling temporary file first and renames it over the target,
/// so a failed write leaves the previous content in place. The temporary file is
/// removed when the save fails.
#[derive(Clone, Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temporary_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecordStore for JsonRecordStore {
    fn load(&mut self) -> Result<Document, EnrichError> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn save(&mut self, document: &Document) -> Result<(), EnrichError> {
        let temporary = self.temporary_path();
        let result = write_json(&temporary, document)
            .and_then(|()| fs::rename(&temporary, &self.path).map_err(EnrichError::from));
        if result.is_err() {
            let _ = fs::remove_file(&temporary);
        }
        result
    }
}

fn write_json(path: &Path, document: &Document) -> Result<(), EnrichError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.flush()?;
    Ok(())
}

/// Record tree kept in memory, for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordStore {
    pub document: Document,
    /// Number of successful saves
    pub saves: usize,
}

impl MemoryRecordStore {
    pub fn new(document: Document) -> Self {
        Self { document, saves: 0 }
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&mut self) -> Result<Document, EnrichError> {
        Ok(self.document.clone())
    }

    fn save(&mut self, document: &Document) -> Result<(), EnrichError> {
        self.document = document.clone();
        self.saves += 1;
        Ok(())
    }
}
