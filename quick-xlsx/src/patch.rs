//! Part-preserving cell edits
//!
//! A worksheet is streamed through quick-xml once. Rows and cells that are
//! not patched are copied through untouched; patched cells are replaced in
//! place (keeping their `s` style attribute) and missing rows/cells are
//! inserted in row-major position.

use crate::cell::{CellRef, CellValue};
use crate::error::{XlsxError, XlsxResult};
use crate::package::XlsxPackage;
use crate::xml::{attr_value, cell_xml, local_name, prefix_of};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Cell edits for a single worksheet, ordered row-major
#[derive(Debug, Clone, Default)]
pub struct CellPatches {
    cells: BTreeMap<CellRef, CellValue>,
}

impl CellPatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for one cell
    pub fn set(&mut self, cell: CellRef, value: impl Into<CellValue>) {
        self.cells.insert(cell, value.into());
    }

    pub fn get(&self, cell: CellRef) -> Option<&CellValue> {
        self.cells.get(&cell)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &CellValue)> {
        self.cells.iter().map(|(cell, value)| (*cell, value))
    }

    fn by_row(&self) -> BTreeMap<u32, Vec<(CellRef, &CellValue)>> {
        let mut out: BTreeMap<u32, Vec<(CellRef, &CellValue)>> = BTreeMap::new();
        for (cell, value) in &self.cells {
            out.entry(cell.row).or_default().push((*cell, value));
        }
        out
    }
}

impl XlsxPackage {
    /// Apply cell edits to the named worksheet
    ///
    /// Overwriting a formula cell drops `xl/calcChain.xml` so Excel rebuilds
    /// the chain instead of reporting a corrupt workbook.
    #[instrument(skip(self, patches), fields(cells = patches.len()))]
    pub fn apply_cell_patches(
        &mut self,
        sheet_name: &str,
        patches: &CellPatches,
    ) -> XlsxResult<()> {
        if patches.is_empty() {
            return Ok(());
        }

        let sheet = self.sheet(sheet_name)?;
        let original = self.required_part(&sheet.part)?;
        let (updated, formula_removed) = patch_worksheet_xml(original, patches)?;
        self.set_part(sheet.part.clone(), updated);

        if formula_removed && self.remove_part(CALC_CHAIN_PART).is_some() {
            debug!(sheet = %sheet_name, "Formula overwritten, dropped calcChain");
        }
        Ok(())
    }
}

struct PatchState<'a> {
    rows: BTreeMap<u32, Vec<(CellRef, &'a CellValue)>>,
    pending: Vec<u32>,
    next: usize,
    formula_removed: bool,
}

impl<'a> PatchState<'a> {
    fn new(patches: &'a CellPatches) -> Self {
        let rows = patches.by_row();
        let pending = rows.keys().copied().collect();
        Self {
            rows,
            pending,
            next: 0,
            formula_removed: false,
        }
    }

    fn cells(&self, row: u32) -> &[(CellRef, &'a CellValue)] {
        self.rows.get(&row).map(Vec::as_slice).unwrap_or_default()
    }

    /// Write all pending rows strictly before `row` (or all of them when `None`)
    fn flush_rows_before(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        prefix: &str,
        row: Option<u32>,
    ) -> XlsxResult<()> {
        while self.next < self.pending.len() {
            let pending = self.pending[self.next];
            if row.is_some_and(|r| pending >= r) {
                break;
            }
            write_new_row(writer, prefix, pending, self.cells(pending))?;
            self.next += 1;
        }
        Ok(())
    }

    /// Consume the pending row if it equals `row`
    fn take_row(&mut self, row: u32) -> bool {
        if self.pending.get(self.next) == Some(&row) {
            self.next += 1;
            true
        } else {
            false
        }
    }
}

fn patch_worksheet_xml(original: &[u8], patches: &CellPatches) -> XlsxResult<(Vec<u8>, bool)> {
    let mut state = PatchState::new(patches);

    let mut reader = Reader::from_reader(original);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(original.len() + patches.len() * 64));

    let mut buf = Vec::new();
    let mut saw_sheet_data = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                let prefix = prefix_of(e.name().as_ref());
                writer.write_event(Event::Start(e.into_owned()))?;
                patch_sheet_data(&mut reader, &mut writer, &prefix, &mut state)?;
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                saw_sheet_data = true;
                let prefix = prefix_of(e.name().as_ref());
                let start = e.into_owned();
                let end = format!("{prefix}sheetData");
                writer.write_event(Event::Start(start))?;
                state.flush_rows_before(&mut writer, &prefix, None)?;
                writer.write_event(Event::End(BytesEnd::new(end.as_str())))?;
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"worksheet" => {
                if !saw_sheet_data {
                    let prefix = prefix_of(e.name().as_ref());
                    let name = format!("{prefix}sheetData");
                    writer.write_event(Event::Start(BytesStart::new(name.as_str())))?;
                    state.flush_rows_before(&mut writer, &prefix, None)?;
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
                writer.write_event(Event::End(e.into_owned()))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok((writer.into_inner(), state.formula_removed))
}

fn patch_sheet_data<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    state: &mut PatchState<'_>,
) -> XlsxResult<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_start = e.into_owned();
                let Some(row_num) = parse_row_number(&row_start)? else {
                    writer.write_event(Event::Start(row_start))?;
                    buf.clear();
                    continue;
                };

                state.flush_rows_before(writer, prefix, Some(row_num))?;
                writer.write_event(Event::Start(row_start))?;
                if state.take_row(row_num) {
                    let cells = state.cells(row_num).to_vec();
                    state.formula_removed |= patch_row(reader, writer, prefix, row_num, &cells)?;
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"row" => {
                let row_empty = e.into_owned();
                let Some(row_num) = parse_row_number(&row_empty)? else {
                    writer.write_event(Event::Empty(row_empty))?;
                    buf.clear();
                    continue;
                };

                state.flush_rows_before(writer, prefix, Some(row_num))?;
                if state.take_row(row_num) {
                    // `<row/>` becomes `<row>...</row>`
                    let end = String::from_utf8_lossy(row_empty.name().as_ref()).into_owned();
                    writer.write_event(Event::Start(row_empty))?;
                    for (cell, value) in state.cells(row_num) {
                        write_raw(writer, &cell_xml(prefix, *cell, value, None));
                    }
                    writer.write_event(Event::End(BytesEnd::new(end.as_str())))?;
                } else {
                    writer.write_event(Event::Empty(row_empty))?;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"sheetData" => {
                state.flush_rows_before(writer, prefix, None)?;
                writer.write_event(Event::End(e.into_owned()))?;
                break;
            }
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected EOF while patching sheetData".to_string(),
                ));
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }
    Ok(())
}

/// Merge patches into an existing row. Returns true if a formula was overwritten.
fn patch_row<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row_num: u32,
    patches: &[(CellRef, &CellValue)],
) -> XlsxResult<bool> {
    let mut buf = Vec::new();
    let mut idx = 0usize;
    let mut formula_removed = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == b"c" => {
                let cell_start = e.into_owned();
                let Some((cell, style)) = parse_cell(&cell_start, row_num)? else {
                    writer.write_event(Event::Start(cell_start))?;
                    buf.clear();
                    continue;
                };

                while idx < patches.len() && patches[idx].0.col < cell.col {
                    let (at, value) = patches[idx];
                    write_raw(writer, &cell_xml(prefix, at, value, None));
                    idx += 1;
                }

                if idx < patches.len() && patches[idx].0.col == cell.col {
                    let value = patches[idx].1;
                    idx += 1;
                    formula_removed |= skip_cell_body(reader)?;
                    write_raw(writer, &cell_xml(prefix, cell, value, style.as_deref()));
                } else {
                    writer.write_event(Event::Start(cell_start))?;
                }
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == b"c" => {
                let cell_empty = e.into_owned();
                let Some((cell, style)) = parse_cell(&cell_empty, row_num)? else {
                    writer.write_event(Event::Empty(cell_empty))?;
                    buf.clear();
                    continue;
                };

                while idx < patches.len() && patches[idx].0.col < cell.col {
                    let (at, value) = patches[idx];
                    write_raw(writer, &cell_xml(prefix, at, value, None));
                    idx += 1;
                }

                if idx < patches.len() && patches[idx].0.col == cell.col {
                    let value = patches[idx].1;
                    idx += 1;
                    write_raw(writer, &cell_xml(prefix, cell, value, style.as_deref()));
                } else {
                    writer.write_event(Event::Empty(cell_empty))?;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"row" => {
                for (at, value) in &patches[idx..] {
                    write_raw(writer, &cell_xml(prefix, *at, value, None));
                }
                writer.write_event(Event::End(e.into_owned()))?;
                break;
            }
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected EOF while patching row".to_string(),
                ));
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(formula_removed)
}

/// Consume a `<c>` body up to its end tag. Returns true if it held a formula.
fn skip_cell_body<R: std::io::BufRead>(reader: &mut Reader<R>) -> XlsxResult<bool> {
    let mut buf = Vec::new();
    let mut depth = 1usize;
    let mut had_formula = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(inner) => {
                if depth == 1 && local_name(inner.name().as_ref()) == b"f" {
                    had_formula = true;
                }
                depth += 1;
            }
            Event::Empty(inner) => {
                if depth == 1 && local_name(inner.name().as_ref()) == b"f" {
                    had_formula = true;
                }
            }
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(had_formula);
                }
            }
            Event::Eof => {
                return Err(XlsxError::Invalid(
                    "unexpected EOF while skipping patched cell".to_string(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn write_new_row(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row_num: u32,
    cells: &[(CellRef, &CellValue)],
) -> XlsxResult<()> {
    let name = format!("{prefix}row");
    let mut row = BytesStart::new(name.as_str());
    row.push_attribute(("r", row_num.to_string().as_str()));
    writer.write_event(Event::Start(row))?;
    for (cell, value) in cells {
        write_raw(writer, &cell_xml(prefix, *cell, value, None));
    }
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    Ok(())
}

fn write_raw(writer: &mut Writer<Vec<u8>>, xml: &str) {
    writer.get_mut().extend_from_slice(xml.as_bytes());
}

fn parse_row_number(row: &BytesStart<'_>) -> XlsxResult<Option<u32>> {
    Ok(attr_value(row, b"r")?.and_then(|v| v.parse().ok()))
}

/// Address and style of a `<c>` element, if it belongs to `row_num`
fn parse_cell(
    cell: &BytesStart<'_>,
    row_num: u32,
) -> XlsxResult<Option<(CellRef, Option<String>)>> {
    let Some(r) = attr_value(cell, b"r")? else {
        return Ok(None);
    };
    let Ok(cell_ref) = CellRef::parse(&r) else {
        return Ok(None);
    };
    if cell_ref.row != row_num {
        return Ok(None);
    }
    Ok(Some((cell_ref, attr_value(cell, b"s")?)))
}
