//! Workbook structure edits: rename, duplicate and append worksheets
//!
//! Edits touch `xl/workbook.xml`, `xl/_rels/workbook.xml.rels` and
//! `[Content_Types].xml` only where needed; every other byte of those parts
//! is preserved.

use crate::error::{XlsxError, XlsxResult};
use crate::package::{
    CONTENT_TYPES_PART, SheetInfo, WORKBOOK_PART, WORKBOOK_RELS_PART, XlsxPackage, resolve_target,
    sheet_rels_part,
};
use crate::xml::{
    REL_NS, WORKSHEET_CONTENT_TYPE, WORKSHEET_REL_TYPE, attr_value, escape_text, local_name,
    prefix_of,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::{debug, instrument};

const DRAWING_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
const DRAWING_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";

/// Sheet-level relationship types a copied sheet may share with its source
const SHAREABLE_REL_TYPES: [&str; 2] = [
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/printerSettings",
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink",
];

/// Sheet elements whose targets cannot be shared between two sheets
const UNSHAREABLE_ELEMENTS: [&[u8]; 6] = [
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"picture",
    b"tableParts",
    b"oleObjects",
    b"controls",
];

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

impl XlsxPackage {
    /// Change a worksheet's tab label
    ///
    /// Defined names that reference the old label (print areas, titles) are
    /// rewritten to the new one.
    #[instrument(skip(self))]
    pub fn rename_sheet(&mut self, from: &str, to: &str) -> XlsxResult<()> {
        if from == to {
            return Ok(());
        }
        self.sheet(from)?;
        self.ensure_name_free(to)?;

        let original = self.required_part(WORKBOOK_PART)?;
        let updated = rewrite_workbook_sheet_name(original, from, to)?;
        self.set_part(WORKBOOK_PART, updated);
        Ok(())
    }

    /// Copy a worksheet (cells, styles, layout) under a new label
    ///
    /// The copy is appended as the last tab. Drawings are cloned; tables,
    /// comments and embedded objects are not carried over.
    #[instrument(skip(self))]
    pub fn duplicate_sheet(&mut self, source: &str, new_name: &str) -> XlsxResult<SheetInfo> {
        let source = self.sheet(source)?;
        self.ensure_name_free(new_name)?;

        let sheet_xml = self.required_part(&source.part)?.to_vec();
        let sheet_xml = strip_elements(&sheet_xml, &UNSHAREABLE_ELEMENTS)?;
        let sheet_xml = String::from_utf8(sheet_xml)?
            .replace(r#" tabSelected="1""#, "")
            .into_bytes();

        let info = self.append_sheet(new_name, sheet_xml)?;

        let source_rels = sheet_rels_part(&source.part);
        if let Some(bytes) = self.part(&source_rels) {
            let rels = parse_relationships(bytes)?;
            let mut copied = Vec::with_capacity(rels.len());
            for rel in rels {
                if rel.external || SHAREABLE_REL_TYPES.contains(&rel.rel_type.as_str()) {
                    copied.push(rel);
                } else if rel.rel_type == DRAWING_REL_TYPE {
                    let target = self.clone_drawing(&source.part, &rel.target)?;
                    copied.push(Relationship { target, ..rel });
                }
            }
            if !copied.is_empty() {
                self.set_part(
                    sheet_rels_part(&info.part),
                    render_relationships(&copied).into_bytes(),
                );
            }
        }

        debug!(from = %source.name, to = %new_name, part = %info.part, "Duplicated worksheet");
        Ok(info)
    }

    /// Add a worksheet part and register it as the last tab
    #[instrument(skip(self, sheet_xml), fields(len = sheet_xml.len()))]
    pub fn append_sheet(&mut self, name: &str, sheet_xml: Vec<u8>) -> XlsxResult<SheetInfo> {
        self.ensure_name_free(name)?;

        let sheets = self.sheets()?;
        let sheet_id = sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;
        let part = self.next_free_part("xl/worksheets/sheet", ".xml");
        let target = part.strip_prefix("xl/").unwrap_or(&part).to_string();

        let rel_id = self.add_workbook_relationship(WORKSHEET_REL_TYPE, &target)?;
        self.add_content_type_override(&part, WORKSHEET_CONTENT_TYPE)?;

        let workbook = self.required_part(WORKBOOK_PART)?;
        let updated = insert_workbook_sheet(workbook, name, sheet_id, &rel_id)?;
        self.set_part(WORKBOOK_PART, updated);
        self.set_part(part.clone(), sheet_xml);

        Ok(SheetInfo {
            name: name.to_string(),
            sheet_id,
            rel_id,
            part,
        })
    }

    fn ensure_name_free(&self, name: &str) -> XlsxResult<()> {
        let lower = name.to_lowercase();
        if self
            .sheets()?
            .iter()
            .any(|s| s.name.to_lowercase() == lower)
        {
            return Err(XlsxError::DuplicateSheet(name.to_string()));
        }
        Ok(())
    }

    /// `{stem}{n}{ext}` with the smallest n >= 1 not present in the package
    fn next_free_part(&self, stem: &str, ext: &str) -> String {
        (1u32..)
            .map(|n| format!("{stem}{n}{ext}"))
            .find(|candidate| !self.has_part(candidate))
            .unwrap_or_else(|| format!("{stem}{ext}"))
    }

    fn add_workbook_relationship(&mut self, rel_type: &str, target: &str) -> XlsxResult<String> {
        let existing = self.workbook_relationships()?;
        let next = existing
            .keys()
            .filter_map(|id| id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let rel_id = format!("rId{next}");

        let rels = String::from_utf8(self.required_part(WORKBOOK_RELS_PART)?.to_vec())?;
        let entry = format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            rel_id,
            rel_type,
            escape_text(target)
        );
        let updated = insert_before_root_end(&rels, &entry)?;
        self.set_part(WORKBOOK_RELS_PART, updated.into_bytes());
        Ok(rel_id)
    }

    fn add_content_type_override(&mut self, part: &str, content_type: &str) -> XlsxResult<()> {
        let types = String::from_utf8(self.required_part(CONTENT_TYPES_PART)?.to_vec())?;
        let part_name = format!("/{part}");
        if types.contains(&format!(r#"PartName="{part_name}""#)) {
            return Ok(());
        }
        let entry = format!(r#"<Override PartName="{part_name}" ContentType="{content_type}"/>"#);
        let updated = insert_before_root_end(&types, &entry)?;
        self.set_part(CONTENT_TYPES_PART, updated.into_bytes());
        Ok(())
    }

    fn content_type_override(&self, part: &str) -> XlsxResult<Option<String>> {
        let types = String::from_utf8(self.required_part(CONTENT_TYPES_PART)?.to_vec())?;
        let doc = roxmltree::Document::parse(&types)?;
        let part_name = format!("/{part}");
        Ok(doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "Override")
            .find(|n| n.attribute("PartName") == Some(part_name.as_str()))
            .and_then(|n| n.attribute("ContentType"))
            .map(str::to_string))
    }

    /// Clone a drawing part (and its relationships) for a copied sheet.
    /// Returns the new target relative to the worksheets directory.
    fn clone_drawing(&mut self, sheet_part: &str, target: &str) -> XlsxResult<String> {
        let sheet_dir = sheet_part.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let source = resolve_target(sheet_dir, target);
        let bytes = self.required_part(&source)?.to_vec();

        let clone = self.next_free_part("xl/drawings/drawing", ".xml");
        let content_type = self
            .content_type_override(&source)?
            .unwrap_or_else(|| DRAWING_CONTENT_TYPE.to_string());
        self.add_content_type_override(&clone, &content_type)?;

        if let Some(rels) = self.part(&sheet_rels_part(&source)).map(<[u8]>::to_vec) {
            self.set_part(sheet_rels_part(&clone), rels);
        }
        self.set_part(clone.clone(), bytes);

        let file = clone.rsplit_once('/').map(|(_, f)| f).unwrap_or(&clone);
        Ok(format!("../drawings/{file}"))
    }
}

fn parse_relationships(bytes: &[u8]) -> XlsxResult<Vec<Relationship>> {
    let xml = String::from_utf8(bytes.to_vec())?;
    let doc = roxmltree::Document::parse(&xml)?;
    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                rel_type: n.attribute("Type")?.to_string(),
                target: n.attribute("Target")?.to_string(),
                external: n.attribute("TargetMode") == Some("External"),
            })
        })
        .collect())
}

fn render_relationships(rels: &[Relationship]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for rel in rels {
        out.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}""#,
            escape_text(&rel.id),
            escape_text(&rel.rel_type),
            escape_text(&rel.target)
        ));
        if rel.external {
            out.push_str(r#" TargetMode="External""#);
        }
        out.push_str("/>");
    }
    out.push_str("</Relationships>");
    out
}

/// Insert `fragment` right before the closing tag of the document element
fn insert_before_root_end(xml: &str, fragment: &str) -> XlsxResult<String> {
    let idx = xml
        .rfind("</")
        .ok_or_else(|| XlsxError::Invalid("document has no closing root tag".to_string()))?;
    let mut out = String::with_capacity(xml.len() + fragment.len());
    out.push_str(&xml[..idx]);
    out.push_str(fragment);
    out.push_str(&xml[idx..]);
    Ok(out)
}

/// Prefix (with colon) the workbook binds to the relationships namespace
fn relationship_prefix(workbook: &[u8]) -> XlsxResult<Option<String>> {
    let xml = String::from_utf8(workbook.to_vec())?;
    let doc = roxmltree::Document::parse(&xml)?;
    Ok(doc
        .root_element()
        .namespaces()
        .find(|ns| ns.uri() == REL_NS)
        .and_then(|ns| ns.name())
        .map(|name| format!("{name}:")))
}

fn insert_workbook_sheet(
    workbook: &[u8],
    name: &str,
    sheet_id: u32,
    rel_id: &str,
) -> XlsxResult<Vec<u8>> {
    let rel_attr = match relationship_prefix(workbook)? {
        Some(prefix) => format!(r#"{prefix}id="{rel_id}""#),
        None => format!(r#"xmlns:r="{REL_NS}" r:id="{rel_id}""#),
    };

    let mut reader = Reader::from_reader(workbook);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(workbook.len() + 128));
    let mut buf = Vec::new();
    let mut inserted = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::End(e) if local_name(e.name().as_ref()) == b"sheets" => {
                let prefix = prefix_of(e.name().as_ref());
                let entry = format!(
                    r#"<{prefix}sheet name="{}" sheetId="{sheet_id}" {rel_attr}/>"#,
                    escape_text(name)
                );
                writer.get_mut().extend_from_slice(entry.as_bytes());
                writer.write_event(Event::End(e.into_owned()))?;
                inserted = true;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheets" => {
                let prefix = prefix_of(e.name().as_ref());
                let start = e.into_owned();
                writer.write_event(Event::Start(start))?;
                let entry = format!(
                    r#"<{prefix}sheet name="{}" sheetId="{sheet_id}" {rel_attr}/></{prefix}sheets>"#,
                    escape_text(name)
                );
                writer.get_mut().extend_from_slice(entry.as_bytes());
                inserted = true;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    if !inserted {
        return Err(XlsxError::Invalid(
            "workbook.xml has no <sheets> element".to_string(),
        ));
    }
    Ok(writer.into_inner())
}

fn rewrite_workbook_sheet_name(workbook: &[u8], from: &str, to: &str) -> XlsxResult<Vec<u8>> {
    let mut reader = Reader::from_reader(workbook);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(workbook.len() + 32));
    let mut buf = Vec::new();
    let mut in_defined_name = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheet" => {
                let renamed = rename_attr(&e, from, to)?;
                writer.write_event(Event::Empty(renamed))?;
            }
            Event::Start(e) if local_name(e.name().as_ref()) == b"sheet" => {
                let renamed = rename_attr(&e, from, to)?;
                writer.write_event(Event::Start(renamed))?;
            }
            Event::Start(e) if local_name(e.name().as_ref()) == b"definedName" => {
                in_defined_name = true;
                writer.write_event(Event::Start(e.into_owned()))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"definedName" => {
                in_defined_name = false;
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Event::Text(t) if in_defined_name => {
                let formula = t.unescape()?.into_owned();
                let rewritten = rewrite_sheet_references(&formula, from, to);
                writer
                    .get_mut()
                    .extend_from_slice(escape_text(&rewritten).as_bytes());
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

fn rename_attr(element: &BytesStart<'_>, from: &str, to: &str) -> XlsxResult<BytesStart<'static>> {
    if attr_value(element, b"name")?.as_deref() != Some(from) {
        return Ok(element.to_owned().into_owned());
    }

    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut renamed = BytesStart::new(name);
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"name" {
            renamed.push_attribute(("name", to));
        } else {
            let value = attr.unescape_value()?.into_owned();
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            renamed.push_attribute((key.as_str(), value.as_str()));
        }
    }
    Ok(renamed)
}

/// Rewrite `Old!A1` and `'Old'!A1` sheet references inside a formula
///
/// Only whole sheet-name tokens are rewritten. String literals and external
/// references (`[1]Old!A1`) are left alone.
fn rewrite_sheet_references(formula: &str, from: &str, to: &str) -> String {
    let target = format!("'{}'!", to.replace('\'', "''"));
    let chars: Vec<char> = formula.chars().collect();
    let external = |start: usize| start > 0 && chars[start - 1] == ']';
    let mut out = String::with_capacity(formula.len() + target.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' => {
                let end = quoted_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '\'' => {
                let end = quoted_end(&chars, i);
                let quoted: String = chars[i..end].iter().collect();
                if chars.get(end) == Some(&'!')
                    && unquote_sheet(&quoted).as_deref() == Some(from)
                    && !external(i)
                {
                    out.push_str(&target);
                    i = end + 1;
                } else {
                    out.push_str(&quoted);
                    i = end;
                }
            }
            c if is_sheet_name_char(c) => {
                let start = i;
                while i < chars.len() && is_sheet_name_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'!') && word == from && !external(start) {
                    out.push_str(&target);
                    i += 1;
                } else {
                    out.push_str(&word);
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Index just past the closing quote; a doubled quote is an escape
fn quoted_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn unquote_sheet(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

fn is_sheet_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Drop elements (with their subtrees) whose local name is listed
fn strip_elements(xml: &[u8], names: &[&[u8]]) -> XlsxResult<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if skip_depth > 0 || names.contains(&local_name(e.name().as_ref())) {
                    skip_depth += 1;
                } else {
                    writer.write_event(Event::Start(e.into_owned()))?;
                }
            }
            Event::Empty(e) => {
                if skip_depth == 0 && !names.contains(&local_name(e.name().as_ref())) {
                    writer.write_event(Event::Empty(e.into_owned()))?;
                }
            }
            Event::End(e) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else {
                    writer.write_event(Event::End(e.into_owned()))?;
                }
            }
            Event::Eof => break,
            ev => {
                if skip_depth == 0 {
                    writer.write_event(ev.into_owned())?;
                }
            }
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}
