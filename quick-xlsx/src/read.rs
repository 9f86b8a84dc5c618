//! Read-back of worksheet values
//!
//! Used to inspect exported workbooks and template layouts. Formatting is
//! ignored; only literal values are returned.

use crate::cell::{CellRef, CellValue};
use crate::error::XlsxResult;
use crate::package::XlsxPackage;
use std::collections::BTreeMap;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

impl XlsxPackage {
    /// All non-empty cell values of a worksheet, keyed by address
    pub fn read_sheet_values(&self, sheet_name: &str) -> XlsxResult<BTreeMap<CellRef, CellValue>> {
        let sheet = self.sheet(sheet_name)?;
        let shared = self.shared_strings()?;
        let xml = String::from_utf8(self.required_part(&sheet.part)?.to_vec())?;
        let doc = roxmltree::Document::parse(&xml)?;

        let mut values = BTreeMap::new();
        for c in doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "c")
        {
            let Some(cell) = c.attribute("r").and_then(|r| CellRef::parse(r).ok()) else {
                continue;
            };
            if let Some(value) = cell_node_value(c, &shared) {
                values.insert(cell, value);
            }
        }
        Ok(values)
    }

    /// Single cell convenience over [`XlsxPackage::read_sheet_values`]
    pub fn cell_value(&self, sheet_name: &str, cell: CellRef) -> XlsxResult<Option<CellValue>> {
        Ok(self.read_sheet_values(sheet_name)?.remove(&cell))
    }

    fn shared_strings(&self) -> XlsxResult<Vec<String>> {
        let Some(bytes) = self.part(SHARED_STRINGS_PART) else {
            return Ok(Vec::new());
        };
        let xml = String::from_utf8(bytes.to_vec())?;
        let doc = roxmltree::Document::parse(&xml)?;
        Ok(doc
            .root_element()
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "si")
            .map(text_of)
            .collect())
    }
}

/// Concatenated `<t>` text below a node, skipping phonetic runs
fn text_of(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "t")
        .filter(|n| {
            !n.ancestors()
                .any(|a| a.is_element() && a.tag_name().name() == "rPh")
        })
        .filter_map(|n| n.text())
        .collect()
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
}

fn cell_node_value(c: roxmltree::Node<'_, '_>, shared: &[String]) -> Option<CellValue> {
    match c.attribute("t") {
        Some("inlineStr") => {
            let is = c
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "is")?;
            Some(CellValue::Text(text_of(is)))
        }
        Some("s") => {
            let idx: usize = child_text(c, "v")?.trim().parse().ok()?;
            shared.get(idx).cloned().map(CellValue::Text)
        }
        Some("b") => Some(CellValue::Bool(child_text(c, "v")?.trim() == "1")),
        Some("str") | Some("e") => Some(CellValue::Text(child_text(c, "v")?.to_string())),
        _ => child_text(c, "v")?
            .trim()
            .parse::<f64>()
            .ok()
            .map(CellValue::Number),
    }
}
