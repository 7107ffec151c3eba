//! Builds small XLSX workbooks in memory for tests.

use crate::spreadsheet::reference::index_to_reference;
use std::io::Cursor;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MAIN_NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Workbook with a "Data" sheet under test and an "Ignored" second sheet.
#[derive(Clone, Debug, Default)]
pub(crate) struct WorkbookFixture {
    rows: Vec<String>,
    shared_strings: Vec<String>,
    with_bom: bool,
}

impl WorkbookFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends row `number` (1-based) of inline strings; empty strings leave the cell out.
    pub(crate) fn text_row(mut self, number: usize, values: &[&str]) -> Self {
        let cells: String = values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_empty())
            .map(|(col, value)| {
                format!(
                    r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    index_to_reference(number - 1, col),
                    escape(value)
                )
            })
            .collect();
        self.rows.push(format!(r#"<row r="{number}">{cells}</row>"#));
        self
    }

    /// Appends a literal `<row>` element.
    pub(crate) fn raw_row(mut self, xml: &str) -> Self {
        self.rows.push(xml.to_owned());
        self
    }

    pub(crate) fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Prefixes the archive with a UTF-8 byte order mark.
    pub(crate) fn with_bom(mut self) -> Self {
        self.with_bom = true;
        self
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut entry = |name: &str, content: String| {
            writer.start_file(name, SimpleFileOptions::default()).expect("start zip entry");
            writer.write_all(content.as_bytes()).expect("write zip entry");
        };

        entry("[Content_Types].xml", r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_owned());
        entry("xl/workbook.xml", format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN_NAMESPACE}" xmlns:r="{RELATIONSHIP_NAMESPACE}"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/><sheet name="Ignored" sheetId="2" r:id="rId2"/></sheets></workbook>"#
        ));
        entry("xl/_rels/workbook.xml.rels", format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{RELATIONSHIP_NAMESPACE}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{RELATIONSHIP_NAMESPACE}/worksheet" Target="/xl/worksheets/sheet2.xml"/><Relationship Id="rId3" Type="{RELATIONSHIP_NAMESPACE}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#
        ));
        entry("xl/worksheets/sheet1.xml", format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NAMESPACE}"><sheetData>{}</sheetData></worksheet>"#,
            self.rows.concat()
        ));
        entry("xl/worksheets/sheet2.xml", format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NAMESPACE}"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>ignored</t></is></c></row></sheetData></worksheet>"#
        ));
        if !self.shared_strings.is_empty() {
            let items: String = self.shared_strings
                .iter()
                .map(|s| format!("<si><t>{}</t></si>", escape(s)))
                .collect();
            entry("xl/sharedStrings.xml", format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{MAIN_NAMESPACE}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
                self.shared_strings.len()
            ));
        }

        let archive = writer.finish().expect("finish zip").into_inner();
        if self.with_bom {
            [b"\xEF\xBB\xBF".to_vec(), archive].concat()
        } else {
            archive
        }
    }

    pub(crate) fn write_to(&self, path: &Path) {
        std::fs::write(path, self.to_bytes()).expect("write workbook fixture");
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
