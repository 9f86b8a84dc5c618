//! Generated worksheets
//!
//! Builds a plain worksheet part from rows of values. Used for sheets that
//! have no template behind them, such as batch summaries.

use crate::cell::{CellRef, CellValue};
use crate::error::XlsxResult;
use crate::package::{CONTENT_TYPES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART, XlsxPackage};
use crate::xml::{MAIN_NS, REL_NS, cell_xml};
use std::collections::BTreeMap;

/// Row-by-row worksheet builder
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    rows: Vec<Vec<Option<CellValue>>>,
    widths: BTreeMap<u32, f64>,
    frozen_rows: u32,
}

impl SheetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; `None` leaves the cell blank
    pub fn row<I, V>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Option<CellValue>>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Set a column width (zero-based column, Excel character units)
    pub fn column_width(&mut self, col: u32, width: f64) -> &mut Self {
        self.widths.insert(col, width);
        self
    }

    /// Keep the first `rows` rows visible while scrolling
    pub fn freeze_rows(&mut self, rows: u32) -> &mut Self {
        self.frozen_rows = rows;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render the worksheet part
    pub fn build(&self) -> Vec<u8> {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<worksheet xmlns="{MAIN_NS}">"#));

        if self.frozen_rows > 0 {
            let top_left = CellRef::new(0, self.frozen_rows + 1);
            xml.push_str(&format!(
                r#"<sheetViews><sheetView workbookViewId="0"><pane ySplit="{}" topLeftCell="{}" activePane="bottomLeft" state="frozen"/></sheetView></sheetViews>"#,
                self.frozen_rows, top_left
            ));
        }

        if !self.widths.is_empty() {
            xml.push_str("<cols>");
            for (col, width) in &self.widths {
                let n = col + 1;
                xml.push_str(&format!(
                    r#"<col min="{n}" max="{n}" width="{width}" customWidth="1"/>"#
                ));
            }
            xml.push_str("</cols>");
        }

        xml.push_str("<sheetData>");
        for (idx, cells) in self.rows.iter().enumerate() {
            let row_num = idx as u32 + 1;
            xml.push_str(&format!(r#"<row r="{row_num}">"#));
            for (col, value) in cells.iter().enumerate() {
                let Some(value) = value else { continue };
                if matches!(value, CellValue::Text(t) if t.is_empty()) {
                    continue;
                }
                xml.push_str(&cell_xml("", CellRef::new(col as u32, row_num), value, None));
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData>");
        xml.push_str(
            r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
        );
        xml.push_str("</worksheet>");
        xml.into_bytes()
    }
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

impl XlsxPackage {
    /// A fresh workbook holding one worksheet
    pub fn new_workbook(sheet_name: &str, sheet_xml: Vec<u8>) -> XlsxResult<Self> {
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets/></workbook>"#
        );

        let mut pkg = XlsxPackage::default();
        pkg.set_part(CONTENT_TYPES_PART, CONTENT_TYPES_XML.as_bytes().to_vec());
        pkg.set_part("_rels/.rels", ROOT_RELS_XML.as_bytes().to_vec());
        pkg.set_part(WORKBOOK_PART, workbook.into_bytes());
        pkg.set_part(WORKBOOK_RELS_PART, WORKBOOK_RELS_XML.as_bytes().to_vec());
        pkg.set_part("xl/styles.xml", STYLES_XML.as_bytes().to_vec());
        pkg.append_sheet(sheet_name, sheet_xml)?;
        Ok(pkg)
    }
}
