//! Small XML helpers shared by the patch and generate paths

use crate::cell::{CellRef, CellValue};
use quick_xml::events::BytesStart;

pub(crate) const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const WORKSHEET_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub(crate) const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Strip a namespace prefix (`x:row` → `row`)
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Namespace prefix of a qualified name including the colon (`x:row` → `x:`)
pub(crate) fn prefix_of(name: &[u8]) -> String {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => String::from_utf8_lossy(&name[..=idx]).into_owned(),
        None => String::new(),
    }
}

/// Read one attribute (by local name) as an owned string
pub(crate) fn attr_value(
    element: &BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>, crate::XlsxError> {
    for attr in element.attributes() {
        let attr = attr?;
        if local_name(attr.key.as_ref()) == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Escape text content, dropping characters XML 1.0 cannot carry
pub(crate) fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

fn needs_space_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

/// Render a `<c>` element. Strings are always written inline.
pub(crate) fn cell_xml(
    prefix: &str,
    cell: CellRef,
    value: &CellValue,
    style: Option<&str>,
) -> String {
    let mut out = format!(r#"<{prefix}c r="{}""#, cell.to_a1());
    if let Some(s) = style.filter(|s| !s.is_empty() && *s != "0") {
        out.push_str(&format!(r#" s="{}""#, escape_text(s)));
    }

    match value {
        CellValue::Text(text) => {
            out.push_str(&format!(r#" t="inlineStr"><{prefix}is><{prefix}t"#));
            if needs_space_preserve(text) {
                out.push_str(r#" xml:space="preserve""#);
            }
            out.push('>');
            out.push_str(&escape_text(text));
            out.push_str(&format!("</{prefix}t></{prefix}is></{prefix}c>"));
        }
        CellValue::Number(n) if n.is_finite() => {
            out.push_str(&format!("><{prefix}v>{n}</{prefix}v></{prefix}c>"));
        }
        CellValue::Number(_) => out.push_str("/>"),
        CellValue::Bool(b) => {
            let v = if *b { 1 } else { 0 };
            out.push_str(&format!(r#" t="b"><{prefix}v>{v}</{prefix}v></{prefix}c>"#));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_xml_inline_string_keeps_style() {
        let xml = cell_xml("", CellRef::new(1, 2), &CellValue::from("A&B"), Some("4"));
        assert_eq!(
            xml,
            r#"<c r="B2" s="4" t="inlineStr"><is><t>A&amp;B</t></is></c>"#
        );
    }

    #[test]
    fn test_cell_xml_number_and_prefix() {
        let xml = cell_xml("x:", CellRef::new(0, 7), &CellValue::Number(12.5), None);
        assert_eq!(xml, r#"<x:c r="A7"><x:v>12.5</x:v></x:c>"#);
    }

    #[test]
    fn test_escape_drops_control_chars() {
        assert_eq!(escape_text("a\u{1}b\tc"), "ab\tc");
    }
}
