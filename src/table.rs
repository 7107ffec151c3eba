use crate::config::MappingConfig;
use crate::error::EnrichError;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::SheetRow;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::XlsxWorkbook;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use tracing::warn;

/// Header labels of the configured header row, mapped to their column index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Builds the index from a header row; a repeated label keeps its last column.
    fn from_row(row: &SheetRow) -> Self {
        let mut columns = HashMap::new();
        for cell in &row.cells {
            columns.insert(cell.raw_text().to_owned(), cell.col);
        }
        Self { columns }
    }

    /// Exact, case-sensitive label lookup.
    pub fn column(&self, label: &str) -> Option<usize> {
        self.columns.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Normalized values of one data row, indexed by column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    fn from_sheet_row(row: &SheetRow) -> Self {
        let values = (0..row.width())
            .map(|col| row.get(col).map(|cell| cell.to_string()).unwrap_or_default())
            .collect();
        Self { values }
    }

    /// Value at `col`; `None` when the row ends before that column.
    pub fn get(&self, col: usize) -> Option<&str> {
        self.values.get(col).map(String::as_str)
    }

    /// Value of the column labelled `label`, if both the label and the cell exist.
    pub fn lookup(&self, header: &HeaderIndex, label: &str) -> Option<&str> {
        header.column(label).and_then(|col| self.get(col))
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Data rows keyed by the value of their identifier column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    rows: HashMap<String, Row>,
}

impl Table {
    pub fn get(&self, identifier: &str) -> Option<&Row> {
        self.rows.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a row, replacing any earlier row with the same identifier.
    pub fn insert(&mut self, identifier: String, row: Row) -> Option<Row> {
        self.rows.insert(identifier, row)
    }
}

/// Reads the first sheet of the workbook at `path` into a header index and a table.
///
/// The workbook is read into memory and its file closed before rows are examined.
pub fn read_table(path: &Path, config: &MappingConfig) -> Result<(HeaderIndex, Table), EnrichError> {
    let mut workbook = XlsxWorkbook::open(path)?;
    debug!("Workbook '{}' has sheets {:?}, reading the first", workbook.name, workbook.sheet_names());
    let sheet = workbook.read_first_sheet(Some(config.row_limit()))?;
    build_table(&sheet, config)
}

/// Locates the header and data rows of `sheet` by physical position.
///
/// # Arguments
/// * `sheet` - Physical rows in document order
/// * `config` - Header row and inclusive data row range, all 1-based
///
/// # Returns
/// The header index and the table, or `MissingHeaderRow` when the sheet is too short
pub fn build_table(sheet: &Sheet, config: &MappingConfig) -> Result<(HeaderIndex, Table), EnrichError> {
    let header_row = config
        .header_row
        .checked_sub(1)
        .and_then(|index| sheet.rows.get(index))
        .ok_or_else(|| SpreadsheetError::MissingHeaderRow {
            file_name: sheet.file_name.to_owned(),
            row: config.header_row,
        })?;
    let header = HeaderIndex::from_row(header_row);
    debug!("Found {} header labels in row {}", header.len(), config.header_row);

    let identifier_column = header.column(&config.identifier_header);
    if identifier_column.is_none() {
        warn!("Identifier column '{}' not found in header row", config.identifier_header);
    }

    // data rows never overlap the header row
    let first = config.data_row_start.max(config.header_row + 1);
    let mut table = Table::default();
    for (index, sheet_row) in sheet.rows.iter().enumerate() {
        let number = index + 1;
        if number < first || sheet_row.is_empty() {
            continue;
        }
        if number > config.data_row_end {
            break;
        }
        let row = Row::from_sheet_row(sheet_row);
        let identifier = identifier_column
            .and_then(|col| row.get(col))
            .unwrap_or_default()
            .to_owned();
        if table.get(&identifier).is_some() {
            let origin = identifier_column
                .and_then(|col| sheet_row.get(col))
                .map(|cell| cell.reference())
                .unwrap_or_else(|| format!("row {number}"));
            warn!("{} replaces an earlier row with identifier '{}'", origin, identifier);
        }
        table.insert(identifier, row);
    }
    debug!("Read {} table rows from '{}'", table.len(), sheet.file_name);
    Ok((header, table))
}
