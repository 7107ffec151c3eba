//! # Spreadsheet Module
//!
//! Reads Excel 2007+ workbooks (`.xlsx`) straight from their ZIP/XML parts and
//! exposes the first worksheet as physical rows of typed cells. Each cell can be
//! rendered to its canonical string form through `Display`.
use thiserror::Error;

pub mod cell;
pub(crate) mod reference;
pub mod sheet;
pub mod xlsx;

#[cfg(test)]
pub(crate) mod fixture;

pub use cell::Cell;
pub use cell::CellType;
pub use cell::FormulaResult;
pub use sheet::Sheet;
pub use sheet::SheetRow;
pub use xlsx::XlsxWorkbook;

/// Errors raised while opening a workbook or locating its rows.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A part required by the workbook structure is missing from the archive
    #[error("Missing part '{0}' in workbook")]
    FileError(String),

    #[error("Workbook '{0}' contains no worksheet")]
    EmptyWorkbook(String),

    /// OLE compound documents: password protected or legacy binary workbooks
    #[error("Workbook '{0}' is password protected or not an Office Open XML file")]
    UnsupportedContainer(String),

    #[error("Cell '{reference}' in '{file_name}' is beyond the last worksheet column")]
    ColumnOutOfRange { file_name: String, reference: String },

    /// Fewer physical rows than the configured header row
    #[error("Missing header row {row} in '{file_name}'")]
    MissingHeaderRow { file_name: String, row: usize },
}
