use crate::error::EnrichError;
use crate::helpers::reader::open_without_bom;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::MAX_COLUMNS;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::sheet::SheetRow;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";         // Shared string table item
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";             // Phonetic text for Asian languages
const TAG_TEXT: &[u8] = b"t";                        // Text content within strings
const TAG_SHEET: &[u8] = b"sheet";                   // Worksheet definition
const TAG_ROW: &[u8] = b"row";                       // Row in worksheet
const TAG_CELL: &[u8] = b"c";                        // Cell in worksheet
const TAG_FORMULA: &[u8] = b"f";                     // Formula of a cell
const TAG_INLINE_STRING: &[u8] = b"is";              // Inline string value
const TAG_VALUE: &[u8] = b"v";                       // Cell value content

/// Signature of an OLE compound file, used by encrypted and legacy workbooks
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

type WorkbookReader = Cursor<Vec<u8>>;

/// Represents an Excel XLSX workbook held in memory
pub struct XlsxWorkbook {
    /// File name of the workbook
    pub name: String,
    /// ZIP archive containing the XLSX file contents
    zip: ZipArchive<WorkbookReader>,
    /// List of worksheets with (name, zip_path) pairs, in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxWorkbook {
    /// Opens an XLSX file, tolerating a byte order mark in front of the archive.
    ///
    /// The file is read completely and closed before this returns.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<XlsxWorkbook, EnrichError> {
        let name = path.as_ref().display().to_string();
        let reader = open_without_bom(path)?;
        Self::from_reader(&name, reader)
    }

    pub(crate) fn from_reader(name: &str, reader: WorkbookReader) -> Result<XlsxWorkbook, EnrichError> {
        if reader.get_ref().starts_with(&COMPOUND_FILE_SIGNATURE) {
            Err(SpreadsheetError::UnsupportedContainer(name.to_owned()))?;
        }
        let mut zip = ZipArchive::new(reader)?;
        let sheets = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(name.to_owned()))?;
        }
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            sheets,
        })
    }

    /// Returns the worksheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Loads the shared string table. Rich text runs are concatenated, phonetic runs dropped.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, EnrichError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
                shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
            }
        });
        Ok(shared_strings)
    }

    /// Reads the first worksheet as physical rows.
    ///
    /// # Arguments
    /// * `row_limit` - Stop after this many physical rows, or read everything when `None`
    ///
    /// # Returns
    /// The sheet with its rows in document order
    pub fn read_first_sheet(&mut self, row_limit: Option<usize>) -> Result<Sheet, EnrichError> {
        let shared_strings = self.load_shared_strings()?;
        let (sheet_name, zip_path) = self.sheets[0].clone();
        let mut sheet = Sheet {
            file_name: self.name.to_owned(),
            name: sheet_name,
            rows: Vec::new(),
        };
        let mut reader = self.zip.xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;

        let mut pending = None::<PendingCell>;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                if row_limit.map(|limit| sheet.rows.len() >= limit).unwrap_or(false) {
                    break;
                }
                let row = event.parse_attribute_value::<usize>("r")?
                    .and_then(|number| number.checked_sub(1))
                    .unwrap_or_else(|| sheet.rows.last().map(|last| last.row + 1).unwrap_or(0));
                sheet.rows.push(SheetRow::new(row));
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                if sheet.rows.is_empty() {
                    sheet.rows.push(SheetRow::new(0));
                }
                let current = sheet.rows.last().map(|last| {
                    (last.row, last.cells.last().map(|cell| cell.col + 1).unwrap_or(0))
                }).unwrap_or_default();
                let (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or(current);
                if col >= MAX_COLUMNS {
                    Err(SpreadsheetError::ColumnOutOfRange {
                        file_name: sheet.file_name.to_owned(),
                        reference: index_to_reference(row, col),
                    })?;
                }
                pending = Some(PendingCell {
                    row,
                    col,
                    kind: event.get_attribute_value("t")?.map(Cow::into_owned),
                    is_formula: false,
                    value: String::new(),
                });
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_FORMULA => {
                if let Some(cell) = pending.as_mut() {
                    cell.is_formula = true;
                }
                read_string_value(&mut reader, TAG_FORMULA, true)?;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_INLINE_STRING => {
                let value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                if let Some(cell) = pending.as_mut() {
                    cell.value = value;
                }
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_VALUE => {
                let value = read_string_value(&mut reader, TAG_VALUE, true)?;
                if let Some(cell) = pending.as_mut() {
                    cell.value = value;
                }
            }
            Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                if let Some((cell, row)) = pending.take().zip(sheet.rows.last_mut()) {
                    row.cells.push(cell.resolve(&shared_strings));
                }
            }
        });
        Ok(sheet)
    }
}

/// Cell being assembled while its child elements are streamed
struct PendingCell {
    row: usize,
    col: usize,
    /// Raw `t` attribute
    kind: Option<String>,
    is_formula: bool,
    value: String,
}

impl PendingCell {
    fn resolve(self, shared_strings: &[String]) -> Cell {
        let mut kind = CellType::from_attribute(self.kind.as_deref(), self.is_formula);
        let value = match self.kind.as_deref() {
            Some("s") if !self.is_formula => self.value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared_strings.get(index))
                .cloned()
                .unwrap_or_default(),
            _ => self.value,
        };
        if value.is_empty() && !self.is_formula {
            kind = CellType::Blank;
        }
        Cell {
            row: self.row,
            col: self.col,
            kind,
            value,
        }
    }
}

/// Loads worksheet names and their archive paths from the workbook part, in workbook order.
fn load_workbook(zip: &mut ZipArchive<WorkbookReader>) -> Result<Vec<(String, String)>, EnrichError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.into_owned(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Loads worksheet relationships, mapping relationship ids to archive paths.
fn load_relationships<R: Read + std::io::Seek>(zip: &mut ZipArchive<R>, path: &str) -> Result<HashMap<String, String>, EnrichError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.into_owned(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the archive
fn to_zip_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// # Arguments
/// * `reader` - XML reader positioned just after the opening tag
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether character data counts without an enclosing `<t>`
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, WorkbookReader>>>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, EnrichError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = is_text_content,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
