use crate::spreadsheet::reference::index_to_reference;
use std::fmt::Display;

/// Kind of value cached for a formula cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FormulaResult {
    Number,
    Text,
    Boolean,
    Error,
}

/// Types of cell data found in a worksheet.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum CellType {
    /// Cell element present but without a value
    #[default]
    Blank,
    /// Boolean values, stored as "1"/"0"
    Boolean,
    /// Numeric values (including dates, which are serial numbers)
    Number,
    /// Shared or inline string, already resolved to its text
    Text,
    /// Error values such as "#N/A"
    Error,
    /// Formula with its last computed result
    Formula(FormulaResult),
}

impl CellType {
    /// Maps the `t` attribute of a `<c>` element to a cell type.
    pub(crate) fn from_attribute(t: Option<&str>, is_formula: bool) -> Self {
        if is_formula {
            return Self::Formula(match t {
                Some("str") | Some("s") | Some("inlineStr") => FormulaResult::Text,
                Some("b") => FormulaResult::Boolean,
                Some("e") => FormulaResult::Error,
                _ => FormulaResult::Number,
            });
        }
        match t {
            Some("s") | Some("inlineStr") | Some("str") | Some("d") => Self::Text,
            Some("b") => Self::Boolean,
            Some("e") => Self::Error,
            _ => Self::Number,
        }
    }
}

/// Represents a single cell in a worksheet with position, type, and raw value.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Cell data type
    pub kind: CellType,
    /// Raw cell content as stored in the workbook
    pub value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Raw text of the cell, without any normalization. Used for header labels.
    pub fn raw_text(&self) -> &str {
        &self.value
    }
}

/// Canonical string form of a cell, as stored in a table row.
///
/// Never fails: malformed numbers and unsupported kinds render as an empty string.
impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            CellType::Boolean => f.write_str(if is_true(&self.value) { "true" } else { "false" }),
            CellType::Number => match self.value.trim().parse::<f64>() {
                Ok(number) => f.write_str(&format_number(number)),
                Err(_) => Ok(()),
            },
            CellType::Formula(FormulaResult::Number) => match self.value.trim().parse::<f64>() {
                Ok(number) => write!(f, "{}", number.trunc() as i64),
                Err(_) => Ok(()),
            },
            CellType::Text | CellType::Formula(FormulaResult::Text) => f.write_str(&self.value),
            CellType::Blank
            | CellType::Error
            | CellType::Formula(FormulaResult::Boolean)
            | CellType::Formula(FormulaResult::Error) => Ok(()),
        }
    }
}

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Renders a number without a fractional part when it is integral,
/// otherwise with the shortest decimal representation that round-trips.
pub(crate) fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        (number as i64).to_string()
    } else {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> String {
        Cell { row: 0, col: 0, kind, value: value.to_owned() }.to_string()
    }

    #[test]
    fn boolean_cells() {
        assert_eq!(cell(CellType::Boolean, "1"), "true");
        assert_eq!(cell(CellType::Boolean, "0"), "false");
        assert_eq!(cell(CellType::Boolean, "TRUE"), "true");
    }

    #[test]
    fn integral_numbers_have_no_decimal_point() {
        assert_eq!(cell(CellType::Number, "42"), "42");
        assert_eq!(cell(CellType::Number, "42.0"), "42");
        assert_eq!(cell(CellType::Number, "-7"), "-7");
        assert_eq!(cell(CellType::Number, "1E+3"), "1000");
        assert_eq!(cell(CellType::Number, "12345678901"), "12345678901");
    }

    #[test]
    fn fractional_numbers_keep_their_digits() {
        assert_eq!(cell(CellType::Number, "3.5"), "3.5");
        assert_eq!(cell(CellType::Number, "0.1"), "0.1");
        assert_eq!(cell(CellType::Number, "2.0000000000000004"), "2.0000000000000004");
    }

    #[test]
    fn malformed_number_is_empty() {
        assert_eq!(cell(CellType::Number, "n/a"), "");
        assert_eq!(cell(CellType::Number, ""), "");
    }

    #[test]
    fn formula_results() {
        assert_eq!(cell(CellType::Formula(FormulaResult::Number), "7.9"), "7");
        assert_eq!(cell(CellType::Formula(FormulaResult::Number), "-7.9"), "-7");
        assert_eq!(cell(CellType::Formula(FormulaResult::Text), "joined"), "joined");
        assert_eq!(cell(CellType::Formula(FormulaResult::Boolean), "1"), "");
        assert_eq!(cell(CellType::Formula(FormulaResult::Error), "#DIV/0!"), "");
    }

    #[test]
    fn text_blank_and_error_cells() {
        assert_eq!(cell(CellType::Text, " padded "), " padded ");
        assert_eq!(cell(CellType::Blank, ""), "");
        assert_eq!(cell(CellType::Error, "#N/A"), "");
    }

    #[test]
    fn cell_type_from_attribute() {
        assert_eq!(CellType::from_attribute(None, false), CellType::Number);
        assert_eq!(CellType::from_attribute(Some("n"), false), CellType::Number);
        assert_eq!(CellType::from_attribute(Some("s"), false), CellType::Text);
        assert_eq!(CellType::from_attribute(Some("b"), false), CellType::Boolean);
        assert_eq!(CellType::from_attribute(Some("e"), false), CellType::Error);
        assert_eq!(CellType::from_attribute(None, true), CellType::Formula(FormulaResult::Number));
        assert_eq!(CellType::from_attribute(Some("str"), true), CellType::Formula(FormulaResult::Text));
    }
}
