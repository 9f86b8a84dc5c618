use super::layout::{HeaderField, ItemField, TemplateLayout, validate};
use crate::core::{EngineError, EngineResult, Resource, ValidationErrors};
use crate::order_money::{calculate_line_total, to_f64};
use chrono::{Datelike, NaiveDate};
use quick_xlsx::{CellPatches, CellRef, CellValue, XlsxError, XlsxPackage};
use regex::{Captures, Regex};
use shared::models::{AppSettings, FinalizedOrder, OrderLine, RequiredFields, TemplateConfig};
use std::sync::LazyLock;

static DATE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"YYYY|YY|MM|DD|M|D").expect("date token regex is valid"));

/// Render a date with `YYYY`/`YY`/`MM`/`DD`/`M`/`D` tokens (`YYYY.MM.DD` → `2026.01.09`)
pub fn format_excel_date(date: NaiveDate, pattern: &str) -> String {
    if pattern.trim().is_empty() {
        return date.format("%Y-%m-%d").to_string();
    }
    DATE_TOKEN_RE
        .replace_all(pattern, |caps: &Captures| match &caps[0] {
            "YYYY" => format!("{:04}", date.year()),
            "YY" => format!("{:02}", date.year().rem_euclid(100)),
            "MM" => format!("{:02}", date.month()),
            "DD" => format!("{:02}", date.day()),
            "M" => date.month().to_string(),
            _ => date.day().to_string(),
        })
        .into_owned()
}

/// A template filled with one order, still in memory
#[derive(Debug, Clone)]
pub struct BoundDocument {
    pub package: XlsxPackage,
    pub sheet_name: String,
    pub cells_written: usize,
}

impl BoundDocument {
    pub fn to_bytes(&self) -> EngineResult<Vec<u8>> {
        Ok(self.package.to_bytes()?)
    }
}

/// Writes orders into spreadsheet templates
#[derive(Debug, Clone, Default)]
pub struct TemplateBinder {
    date_format: String,
    required_override: Option<RequiredFields>,
}

impl TemplateBinder {
    pub fn new(date_format: impl Into<String>, required_override: Option<RequiredFields>) -> Self {
        Self {
            date_format: date_format.into(),
            required_override,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(
            settings.excel_date_format.clone(),
            settings.template_validation,
        )
    }

    /// Mapping and capacity check for an order with `item_count` items
    pub fn validate(
        &self,
        template: &TemplateConfig,
        item_count: usize,
    ) -> Result<TemplateLayout, ValidationErrors> {
        validate(template, self.required_override.as_ref(), item_count)
    }

    /// Decode the template workbook
    ///
    /// A template without a file is `NotFound`; an undecodable one is a
    /// spreadsheet error.
    pub fn load(&self, template: &TemplateConfig) -> EngineResult<XlsxPackage> {
        let bytes = template
            .payload()
            .map_err(|e| {
                EngineError::Sheet(XlsxError::Invalid(format!(
                    "template {} payload is not base64: {e}",
                    template.id
                )))
            })?
            .filter(|b| !b.is_empty())
            .ok_or_else(|| EngineError::not_found(Resource::TemplatePayload, &template.id))?;
        Ok(XlsxPackage::from_bytes(&bytes)?)
    }

    /// Fill the template's first sheet with `order`
    pub fn bind(
        &self,
        template: &TemplateConfig,
        order: &FinalizedOrder,
    ) -> EngineResult<BoundDocument> {
        let mut package = self.load(template)?;
        let layout = self.validate(template, order.lines.len())?;

        let sheet = package.first_sheet()?;
        let patches = self.patches(&layout, order);
        package.apply_cell_patches(&sheet.name, &patches)?;

        tracing::debug!(
            template_id = %template.id,
            order_number = %order.order_number,
            cells = patches.len(),
            "Template bound"
        );
        Ok(BoundDocument {
            package,
            sheet_name: sheet.name,
            cells_written: patches.len(),
        })
    }

    /// Cell writes for one order; empty texts are skipped
    pub fn patches(&self, layout: &TemplateLayout, order: &FinalizedOrder) -> CellPatches {
        let mut patches = CellPatches::new();

        for (field, cell) in &layout.headers {
            if let Some(value) = self.header_value(*field, order) {
                patches.set(*cell, value);
            }
        }

        let mut lines: Vec<&OrderLine> = order.lines.iter().collect();
        lines.sort_by_key(|l| l.sort_value);

        for (i, line) in lines.into_iter().enumerate() {
            let row = layout.start_row + i as u32;
            for (field, col) in &layout.columns {
                if let Some(value) = item_value(*field, line) {
                    patches.set(CellRef::new(*col, row), value);
                }
            }
        }

        patches
    }

    fn header_value(&self, field: HeaderField, order: &FinalizedOrder) -> Option<CellValue> {
        let text = match field {
            HeaderField::CustomerName => order.customer.name.clone(),
            HeaderField::CustomerPhone => order.customer.phone.clone(),
            HeaderField::CustomerPlate => order.customer.license_plate.clone(),
            HeaderField::Date => format_excel_date(order.date, &self.date_format),
            HeaderField::OrderNumber => order.order_number.clone(),
            HeaderField::OrderRemark => order.note.clone().unwrap_or_default(),
            HeaderField::TotalAmount => return Some(CellValue::Number(order.total_amount)),
        };
        non_empty(text)
    }
}

fn item_value(field: ItemField, line: &OrderLine) -> Option<CellValue> {
    match field {
        ItemField::Name => non_empty(line.name.clone()),
        ItemField::Unit => non_empty(line.unit.clone()),
        ItemField::Quantity => Some(CellValue::Number(line.quantity)),
        ItemField::Price => Some(CellValue::Number(line.effective_price())),
        ItemField::Total => Some(CellValue::Number(to_f64(calculate_line_total(line)))),
        ItemField::Remark => line.note.clone().and_then(non_empty),
    }
}

fn non_empty(text: String) -> Option<CellValue> {
    if text.trim().is_empty() {
        None
    } else {
        Some(CellValue::Text(text))
    }
}
