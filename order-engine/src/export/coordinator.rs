use super::filename::{order_filename, sanitize_filename};
use crate::core::{EngineError, EngineResult, Resource, ValidationErrors, ValidationIssue};
use crate::order_money::{to_decimal, to_f64};
use crate::orders::traits::{DestinationPrompt, SettingsProvider, TemplateStore};
use crate::template::{TemplateBinder, format_excel_date};
use quick_xlsx::{CellValue, SheetBuilder, XlsxPackage, dedupe_sheet_name, sanitize_sheet_name};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{
    AppSettings, DEFAULT_FILENAME_PATTERN, FinalizedOrder, OrderStatus, TemplateConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Label of the generated batch summary sheet
pub const SUMMARY_SHEET_NAME: &str = "汇总";

const ORDER_SHEET_FALLBACK: &str = "订单";

/// A written export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub file_name: String,
    pub sheet_count: usize,
    /// Settings ask the caller to open the file afterwards
    pub auto_open: bool,
}

/// Single and batch export of finalized orders
///
/// Resolves the template, binds, names the file, asks for a destination
/// and writes. A cancelled prompt yields `Ok(None)`.
#[derive(Clone)]
pub struct ExportCoordinator {
    templates: Arc<dyn TemplateStore>,
    settings: Arc<dyn SettingsProvider>,
    prompt: Arc<dyn DestinationPrompt>,
}

impl ExportCoordinator {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        settings: Arc<dyn SettingsProvider>,
        prompt: Arc<dyn DestinationPrompt>,
    ) -> Self {
        Self {
            templates,
            settings,
            prompt,
        }
    }

    /// Template for an export
    ///
    /// An explicit id must exist. Otherwise the order's template, then the
    /// settings default, then the template flagged default; ids that no
    /// longer exist are skipped.
    pub fn resolve_template(
        &self,
        explicit: Option<&str>,
        order: Option<&FinalizedOrder>,
        settings: &AppSettings,
    ) -> EngineResult<TemplateConfig> {
        if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
            return self
                .templates
                .get_template(id)?
                .ok_or_else(|| EngineError::not_found(Resource::Template, id));
        }

        let candidates = [
            order.and_then(|o| o.template_id.as_deref()),
            Some(settings.default_template_id.as_str()),
        ];
        for id in candidates.into_iter().flatten().map(str::trim) {
            if id.is_empty() {
                continue;
            }
            match self.templates.get_template(id)? {
                Some(template) => return Ok(template),
                None => tracing::warn!(template_id = %id, "Template not found, falling back"),
            }
        }

        self.templates
            .default_template()?
            .ok_or_else(|| EngineError::not_found(Resource::Template, "default"))
    }

    /// Export one order through its template
    pub async fn export_order(
        &self,
        order: &FinalizedOrder,
        template_id: Option<&str>,
    ) -> EngineResult<Option<ExportOutcome>> {
        let settings = self.settings.settings()?;
        let template = self.resolve_template(template_id, Some(order), &settings)?;
        let binder = TemplateBinder::from_settings(&settings);

        let document = binder.bind(&template, order)?;
        let bytes = document.to_bytes()?;

        let file_name = order_filename(filename_pattern(&template, &settings), order);
        let Some(path) = self.destination(&file_name, &settings).await else {
            tracing::info!(order_number = %order.order_number, "Export cancelled");
            return Ok(None);
        };

        write_file(&path, &bytes).await?;
        tracing::info!(
            order_number = %order.order_number,
            template_id = %template.id,
            path = %path.display(),
            cells = document.cells_written,
            "Order exported"
        );
        Ok(Some(outcome(path, 1, &settings)))
    }

    /// Export several orders into one workbook
    ///
    /// One sheet per order, labelled by order number, plus a summary sheet.
    /// Every order is validated before anything is written.
    pub async fn export_orders_batch(
        &self,
        orders: &[FinalizedOrder],
    ) -> EngineResult<Option<ExportOutcome>> {
        if orders.is_empty() {
            return Err(ValidationIssue::EmptyBatch.into());
        }

        let settings = self.settings.settings()?;
        let template = self.resolve_template(None, None, &settings)?;
        let binder = TemplateBinder::from_settings(&settings);
        let mut package = binder.load(&template)?;

        let mut errors = ValidationErrors::new();
        let mut layouts = Vec::with_capacity(orders.len());
        for order in orders {
            match binder.validate(&template, order.lines.len()) {
                Ok(layout) => layouts.push(layout),
                Err(e) => errors.extend(e.for_order(&order.order_number)),
            }
        }
        errors.into_result()?;

        let labels = self.order_sheets(&mut package, orders)?;
        for ((order, layout), label) in orders.iter().zip(&layouts).zip(&labels) {
            let patches = binder.patches(layout, order);
            package.apply_cell_patches(label, &patches)?;
        }

        let taken: Vec<String> = package.sheets()?.into_iter().map(|s| s.name).collect();
        let summary_name = dedupe_sheet_name(SUMMARY_SHEET_NAME, &taken);
        package.append_sheet(&summary_name, summary_sheet(orders, &settings))?;

        let bytes = package.to_bytes()?;
        let sheet_count = package.sheets()?.len();

        let file_name = batch_filename(orders);
        let Some(path) = self.destination(&file_name, &settings).await else {
            tracing::info!(orders = orders.len(), "Batch export cancelled");
            return Ok(None);
        };

        write_file(&path, &bytes).await?;
        tracing::info!(
            orders = orders.len(),
            sheets = sheet_count,
            template_id = %template.id,
            path = %path.display(),
            "Orders exported"
        );
        Ok(Some(outcome(path, sheet_count, &settings)))
    }

    /// Turn the template's first sheet into one sheet per order
    ///
    /// The first sheet is renamed for the first order and copied, still
    /// blank, for the others. Returns the labels in order.
    fn order_sheets(
        &self,
        package: &mut XlsxPackage,
        orders: &[FinalizedOrder],
    ) -> EngineResult<Vec<String>> {
        let first = package.first_sheet()?;
        let mut taken: Vec<String> = package
            .sheets()?
            .into_iter()
            .map(|s| s.name)
            .filter(|name| *name != first.name)
            .collect();
        taken.push(SUMMARY_SHEET_NAME.to_string());

        let mut labels: Vec<String> = Vec::with_capacity(orders.len());
        for (i, order) in orders.iter().enumerate() {
            let base = sanitize_sheet_name(&order.order_number, ORDER_SHEET_FALLBACK);
            let label = dedupe_sheet_name(&base, &taken);
            if i == 0 {
                package.rename_sheet(&first.name, &label)?;
            } else {
                package.duplicate_sheet(&labels[0], &label)?;
            }
            taken.push(label.clone());
            labels.push(label);
        }
        Ok(labels)
    }

    async fn destination(&self, file_name: &str, settings: &AppSettings) -> Option<PathBuf> {
        let output_dir = settings.output_directory.trim();
        if settings.skip_save_dialog && !output_dir.is_empty() {
            return Some(Path::new(output_dir).join(file_name));
        }
        let default_dir = (!output_dir.is_empty()).then(|| Path::new(output_dir));
        self.prompt.choose(file_name, default_dir).await
    }
}

/// Template pattern, else the settings pattern, else the built-in one
fn filename_pattern<'a>(template: &'a TemplateConfig, settings: &'a AppSettings) -> &'a str {
    [
        template.filename_pattern.as_str(),
        settings.excel_filename_format.as_str(),
    ]
    .into_iter()
    .find(|p| !p.trim().is_empty())
    .unwrap_or(DEFAULT_FILENAME_PATTERN)
}

fn batch_filename(orders: &[FinalizedOrder]) -> String {
    let latest = orders.iter().map(|o| o.date).max();
    let date = latest
        .map(|d| d.format("%Y%m%d").to_string())
        .unwrap_or_default();
    sanitize_filename(&format!("订单汇总_{date}_{}单", orders.len()))
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Completed => "已完成",
        OrderStatus::Cancelled => "已取消",
    }
}

/// Summary worksheet: one row per order and a grand total
fn summary_sheet(orders: &[FinalizedOrder], settings: &AppSettings) -> Vec<u8> {
    let mut sheet = SheetBuilder::new();
    sheet
        .row(["单号", "日期", "客户", "金额", "状态"].map(|h| Some(CellValue::from(h))))
        .freeze_rows(1)
        .column_width(0, 18.0)
        .column_width(1, 14.0)
        .column_width(2, 16.0)
        .column_width(3, 12.0)
        .column_width(4, 10.0);

    let mut total = Decimal::ZERO;
    for order in orders {
        total += to_decimal(order.total_amount);
        sheet.row([
            Some(CellValue::from(order.order_number.as_str())),
            Some(CellValue::from(format_excel_date(
                order.date,
                &settings.excel_date_format,
            ))),
            Some(CellValue::from(order.customer.name.as_str())),
            Some(CellValue::Number(order.total_amount)),
            Some(CellValue::from(status_label(order.status))),
        ]);
    }
    sheet.row([
        Some(CellValue::from("合计")),
        None,
        None,
        Some(CellValue::Number(to_f64(total))),
        None,
    ]);
    sheet.build()
}

fn outcome(path: PathBuf, sheet_count: usize, settings: &AppSettings) -> ExportOutcome {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ExportOutcome {
        path,
        file_name,
        sheet_count,
        auto_open: settings.auto_open_excel,
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
