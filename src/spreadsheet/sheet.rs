use crate::spreadsheet::cell::Cell;

/// A physical row of a worksheet, i.e. one `<row>` element in document order.
///
/// Rows that are absent from the file are never represented, so the position
/// of a `SheetRow` in a sheet is its physical index, not its row number.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetRow {
    /// Row index (0-based) as declared by the workbook
    pub row: usize,
    /// Cells in document order, blanks included
    pub cells: Vec<Cell>,
}

impl SheetRow {
    pub fn new(row: usize) -> Self {
        Self { row, cells: Vec::new() }
    }

    /// Returns true if the row element holds no cell elements at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of columns spanned by the row: last populated column index + 1.
    pub fn width(&self) -> usize {
        self.cells.iter().map(|cell| cell.col + 1).max().unwrap_or(0)
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.iter().rev().find(|cell| cell.col == col)
    }
}

/// Represents the first worksheet of a workbook as a sequence of physical rows.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    /// Source file name
    pub file_name: String,
    /// Sheet name
    pub name: String,
    pub rows: Vec<SheetRow>,
}
