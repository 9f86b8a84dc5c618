//! In-memory xlsx package
//!
//! The package is a map of part name → bytes. Parts we do not touch are
//! written back byte-for-byte, which is what keeps template formatting,
//! drawings and print setup intact.

use crate::error::{XlsxError, XlsxResult};
use crate::xml::REL_NS;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use tracing::{debug, instrument};
use zip::write::FileOptions;

pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// A worksheet as listed in `xl/workbook.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    /// Tab label
    pub name: String,
    /// `sheetId` attribute
    pub sheet_id: u32,
    /// Relationship id inside `workbook.xml.rels`
    pub rel_id: String,
    /// Resolved part name, e.g. `xl/worksheets/sheet1.xml`
    pub part: String,
}

/// Xlsx package (zip container held in memory)
#[derive(Debug, Clone, Default)]
pub struct XlsxPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl XlsxPackage {
    /// Load a package from xlsx bytes
    #[instrument(skip(bytes), fields(len = bytes.len()))]
    pub fn from_bytes(bytes: &[u8]) -> XlsxResult<Self> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = BTreeMap::new();
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if !file.is_file() {
                continue;
            }
            let name = file.name().to_string();
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }

        if !parts.contains_key(WORKBOOK_PART) {
            return Err(XlsxError::MissingPart(WORKBOOK_PART.to_string()));
        }

        debug!(parts = parts.len(), "Loaded xlsx package");
        Ok(Self { parts })
    }

    /// Serialize the package back into xlsx bytes
    pub fn to_bytes(&self) -> XlsxResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            let options =
                FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

            // Content types first, as Office writes it
            if let Some(bytes) = self.parts.get(CONTENT_TYPES_PART) {
                zip.start_file(CONTENT_TYPES_PART, options)?;
                zip.write_all(bytes)?;
            }
            for (name, bytes) in &self.parts {
                if name == CONTENT_TYPES_PART {
                    continue;
                }
                zip.start_file(name.as_str(), options)?;
                zip.write_all(bytes)?;
            }
            zip.finish()?;
        }
        Ok(buffer.into_inner())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = name.strip_prefix('/').unwrap_or(name);
        self.parts.get(name).map(Vec::as_slice)
    }

    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        let name = name.strip_prefix('/').map(str::to_string).unwrap_or(name);
        self.parts.insert(name, bytes);
    }

    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name.strip_prefix('/').unwrap_or(name))
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub(crate) fn required_part(&self, name: &str) -> XlsxResult<&[u8]> {
        self.part(name)
            .ok_or_else(|| XlsxError::MissingPart(name.to_string()))
    }

    /// Worksheets in tab order
    pub fn sheets(&self) -> XlsxResult<Vec<SheetInfo>> {
        let workbook = String::from_utf8(self.required_part(WORKBOOK_PART)?.to_vec())?;
        let targets = self.workbook_relationships()?;

        let doc = roxmltree::Document::parse(&workbook)?;
        let mut sheets = Vec::new();
        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "sheet")
        {
            let Some(name) = node.attribute("name") else {
                continue;
            };
            let Some(rel_id) = node.attribute((REL_NS, "id")) else {
                continue;
            };
            let sheet_id = node
                .attribute("sheetId")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let Some(target) = targets.get(rel_id) else {
                return Err(XlsxError::Invalid(format!(
                    "sheet '{}' has no relationship target",
                    name
                )));
            };
            sheets.push(SheetInfo {
                name: name.to_string(),
                sheet_id,
                rel_id: rel_id.to_string(),
                part: resolve_target("xl", target),
            });
        }
        Ok(sheets)
    }

    /// Look up a worksheet by tab label
    pub fn sheet(&self, name: &str) -> XlsxResult<SheetInfo> {
        self.sheets()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| XlsxError::UnknownSheet(name.to_string()))
    }

    /// The first worksheet in tab order (the one templates are authored on)
    pub fn first_sheet(&self) -> XlsxResult<SheetInfo> {
        self.sheets()?
            .into_iter()
            .next()
            .ok_or_else(|| XlsxError::Invalid("workbook has no worksheets".to_string()))
    }

    /// Relationship id → target, from `xl/_rels/workbook.xml.rels`
    pub(crate) fn workbook_relationships(&self) -> XlsxResult<HashMap<String, String>> {
        let rels = String::from_utf8(self.required_part(WORKBOOK_RELS_PART)?.to_vec())?;
        let doc = roxmltree::Document::parse(&rels)?;
        Ok(doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
            .filter_map(|n| {
                Some((
                    n.attribute("Id")?.to_string(),
                    n.attribute("Target")?.to_string(),
                ))
            })
            .collect())
    }
}

/// Resolve a relationship target against the directory of its source part
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Sheet-level relationships part for a worksheet part
pub(crate) fn sheet_rels_part(sheet_part: &str) -> String {
    match sheet_part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{sheet_part}.rels"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
    }

    #[test]
    fn test_sheet_rels_part() {
        assert_eq!(
            sheet_rels_part("xl/worksheets/sheet3.xml"),
            "xl/worksheets/_rels/sheet3.xml.rels"
        );
    }

    #[test]
    fn test_rejects_zip_without_workbook() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            zip.start_file("hello.txt", FileOptions::<()>::default())
                .unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        let err = XlsxPackage::from_bytes(&buffer.into_inner()).unwrap_err();
        assert!(matches!(err, XlsxError::MissingPart(_)));
    }
}
