use super::*;
use crate::core::{EngineError, Resource, ValidationIssue};
use crate::orders::storage::OrderStorage;
use crate::orders::traits::DestinationPrompt;
use crate::template::tests::{sample_line, sample_order, sample_template};
use async_trait::async_trait;
use quick_xlsx::{CellRef, CellValue, XlsxPackage};
use shared::error::ErrorCode;
use shared::models::{AppSettings, OrderStatus, TemplateConfig};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Answers with a fixed directory and remembers what it was asked
struct RecordingPrompt {
    dir: PathBuf,
    asked: Mutex<Vec<(String, Option<PathBuf>)>>,
}

impl RecordingPrompt {
    fn new(dir: &Path) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.to_path_buf(),
            asked: Mutex::new(Vec::new()),
        })
    }

    fn asked(&self) -> Vec<(String, Option<PathBuf>)> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationPrompt for RecordingPrompt {
    async fn choose(&self, suggested_name: &str, default_dir: Option<&Path>) -> Option<PathBuf> {
        self.asked
            .lock()
            .unwrap()
            .push((suggested_name.to_string(), default_dir.map(Path::to_path_buf)));
        Some(self.dir.join(suggested_name))
    }
}

fn storage_with(template: TemplateConfig, settings: AppSettings) -> Arc<OrderStorage> {
    let storage = OrderStorage::open_in_memory().unwrap();
    storage.save_template(&template).unwrap();
    storage.save_settings(&settings).unwrap();
    Arc::new(storage)
}

fn coordinator(
    storage: &Arc<OrderStorage>,
    prompt: Arc<dyn DestinationPrompt>,
) -> ExportCoordinator {
    ExportCoordinator::new(storage.clone(), storage.clone(), prompt)
}

fn read_cell(path: &Path, sheet: &str, a1: &str) -> Option<CellValue> {
    let bytes = std::fs::read(path).unwrap();
    XlsxPackage::from_bytes(&bytes)
        .unwrap()
        .cell_value(sheet, CellRef::parse(a1).unwrap())
        .unwrap()
}

#[tokio::test]
async fn test_export_order_through_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with(sample_template(), AppSettings::default());
    let prompt = RecordingPrompt::new(dir.path());
    let order = sample_order("NO000001", "张三", vec![sample_line("机油", 80.0, 2.0)]);

    let outcome = coordinator(&storage, prompt.clone())
        .export_order(&order, None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.file_name, "20260109_张三_NO000001.xlsx");
    assert_eq!(outcome.path, dir.path().join("20260109_张三_NO000001.xlsx"));
    assert_eq!(outcome.sheet_count, 1);
    assert!(!outcome.auto_open);
    assert_eq!(prompt.asked(), vec![(outcome.file_name.clone(), None)]);

    assert_eq!(read_cell(&outcome.path, "销售单", "B2"), Some(CellValue::from("张三")));
    assert_eq!(read_cell(&outcome.path, "销售单", "E5"), Some(CellValue::Number(160.0)));
}

#[tokio::test]
async fn test_special_text_survives_export() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with(sample_template(), AppSettings::default());
    let mut line = sample_line("<机油> & \"滤芯\"", 80.0, 1.0);
    line.note = Some("line1\r\nline2".to_string());
    let mut order = sample_order("NO000009", "  A&B 'C' ", vec![line]);
    order.customer.phone = "\t138\u{1}0000".to_string();

    let outcome = coordinator(&storage, RecordingPrompt::new(dir.path()))
        .export_order(&order, None)
        .await
        .unwrap()
        .unwrap();

    let cell = |a1: &str| read_cell(&outcome.path, "销售单", a1);
    assert_eq!(cell("B2"), Some(CellValue::from("  A&B 'C' ")));
    assert_eq!(cell("B3"), Some(CellValue::from("\t1380000")));
    assert_eq!(cell("A5"), Some(CellValue::from("<机油> & \"滤芯\"")));
    // CRLF reads back as LF, as Excel stores it
    assert_eq!(cell("F5"), Some(CellValue::from("line1\nline2")));
}

#[tokio::test]
async fn test_skip_dialog_writes_into_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("exports").join("2026");
    let settings = AppSettings {
        skip_save_dialog: true,
        auto_open_excel: true,
        output_directory: out.to_string_lossy().into_owned(),
        ..Default::default()
    };
    let storage = storage_with(sample_template(), settings);
    let prompt = RecordingPrompt::new(dir.path());
    let order = sample_order("NO000002", "李四", vec![sample_line("滤芯", 30.0, 1.0)]);

    let outcome = coordinator(&storage, prompt.clone())
        .export_order(&order, None)
        .await
        .unwrap()
        .unwrap();

    assert!(prompt.asked().is_empty());
    assert_eq!(outcome.path.parent(), Some(out.as_path()));
    assert!(outcome.path.exists());
    assert!(outcome.auto_open);
}

#[tokio::test]
async fn test_prompt_gets_output_directory_as_default() {
    let dir = tempfile::tempdir().unwrap();
    let settings = AppSettings {
        output_directory: "/srv/exports".to_string(),
        ..Default::default()
    };
    let storage = storage_with(sample_template(), settings);
    let prompt = RecordingPrompt::new(dir.path());
    let order = sample_order("NO000003", "王五", vec![sample_line("机油", 1.0, 1.0)]);

    coordinator(&storage, prompt.clone())
        .export_order(&order, None)
        .await
        .unwrap();

    assert_eq!(prompt.asked()[0].1, Some(PathBuf::from("/srv/exports")));
}

#[tokio::test]
async fn test_cancelled_prompt_is_none() {
    let storage = storage_with(sample_template(), AppSettings::default());
    let order = sample_order("NO000004", "张三", vec![sample_line("机油", 1.0, 1.0)]);

    let result = coordinator(&storage, Arc::new(CancelDestination))
        .export_order(&order, None)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_unknown_explicit_template_is_not_found() {
    let storage = storage_with(sample_template(), AppSettings::default());
    let order = sample_order("NO000005", "张三", vec![sample_line("机油", 1.0, 1.0)]);

    let err = coordinator(&storage, Arc::new(CancelDestination))
        .export_order(&order, Some("missing"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::NotFound {
            resource: Resource::Template,
            ..
        }
    ));
}

#[tokio::test]
async fn test_no_template_at_all_is_not_found() {
    let storage = Arc::new(OrderStorage::open_in_memory().unwrap());
    let order = sample_order("NO000006", "张三", vec![sample_line("机油", 1.0, 1.0)]);

    let err = coordinator(&storage, Arc::new(CancelDestination))
        .export_order(&order, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn test_template_resolution_order() {
    let storage = storage_with(sample_template(), AppSettings::default());
    let mut other = sample_template();
    other.id = "tpl-2".to_string();
    other.is_default = false;
    storage.save_template(&other).unwrap();

    let coordinator = coordinator(&storage, Arc::new(CancelDestination));
    let mut order = sample_order("NO000007", "张三", vec![]);
    let settings = AppSettings::default();

    let resolved = coordinator.resolve_template(None, Some(&order), &settings).unwrap();
    assert_eq!(resolved.id, "tpl-1");

    let settings = AppSettings {
        default_template_id: "tpl-2".to_string(),
        ..Default::default()
    };
    let resolved = coordinator.resolve_template(None, Some(&order), &settings).unwrap();
    assert_eq!(resolved.id, "tpl-2");

    order.template_id = Some("tpl-1".to_string());
    let resolved = coordinator.resolve_template(None, Some(&order), &settings).unwrap();
    assert_eq!(resolved.id, "tpl-1");

    // deleted template on the order falls through
    order.template_id = Some("gone".to_string());
    let resolved = coordinator.resolve_template(None, Some(&order), &settings).unwrap();
    assert_eq!(resolved.id, "tpl-2");

    let resolved = coordinator
        .resolve_template(Some("tpl-2"), None, &AppSettings::default())
        .unwrap();
    assert_eq!(resolved.id, "tpl-2");
}

#[tokio::test]
async fn test_template_filename_pattern_wins() {
    let dir = tempfile::tempdir().unwrap();
    let mut template = sample_template();
    template.filename_pattern = "销售单-{orderNo}-{licensePlate}".to_string();
    let settings = AppSettings {
        excel_filename_format: "{customer}".to_string(),
        ..Default::default()
    };
    let storage = storage_with(template, settings);
    let order = sample_order("NO000008", "张三", vec![sample_line("机油", 1.0, 1.0)]);

    let outcome = coordinator(&storage, RecordingPrompt::new(dir.path()))
        .export_order(&order, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.file_name, "销售单-NO000008.xlsx");
}

#[tokio::test]
async fn test_batch_export_sheets_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with(sample_template(), AppSettings::default());
    let first = sample_order("NO.000001", "张三", vec![sample_line("机油", 80.0, 2.0)]);
    let mut second = sample_order(
        "NO.000002",
        "李四",
        vec![sample_line("滤芯", 30.0, 1.0), sample_line("雨刷", 45.5, 2.0)],
    );
    second.status = OrderStatus::Cancelled;

    let outcome = coordinator(&storage, RecordingPrompt::new(dir.path()))
        .export_orders_batch(&[first.clone(), second.clone()])
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.sheet_count, 3);
    assert_eq!(outcome.file_name, "订单汇总_20260109_2单.xlsx");

    let package = XlsxPackage::from_bytes(&std::fs::read(&outcome.path).unwrap()).unwrap();
    let names: Vec<String> = package.sheets().unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["NO.000001", "NO.000002", SUMMARY_SHEET_NAME]);

    let cell = |sheet: &str, a1: &str| {
        package
            .cell_value(sheet, CellRef::parse(a1).unwrap())
            .unwrap()
    };
    assert_eq!(cell("NO.000001", "B2"), Some(CellValue::from("张三")));
    assert_eq!(cell("NO.000002", "B2"), Some(CellValue::from("李四")));
    assert_eq!(cell("NO.000002", "A6"), Some(CellValue::from("雨刷")));
    // the copy starts from the blank template, not the first order
    assert_eq!(cell("NO.000002", "A7"), None);
    assert_eq!(cell("NO.000001", "A6"), None);

    assert_eq!(cell(SUMMARY_SHEET_NAME, "A1"), Some(CellValue::from("单号")));
    assert_eq!(cell(SUMMARY_SHEET_NAME, "A3"), Some(CellValue::from("NO.000002")));
    assert_eq!(cell(SUMMARY_SHEET_NAME, "B2"), Some(CellValue::from("2026.01.09")));
    assert_eq!(cell(SUMMARY_SHEET_NAME, "E3"), Some(CellValue::from("已取消")));
    assert_eq!(cell(SUMMARY_SHEET_NAME, "A4"), Some(CellValue::from("合计")));
    assert_eq!(
        cell(SUMMARY_SHEET_NAME, "D4"),
        Some(CellValue::Number(first.total_amount + second.total_amount))
    );
    assert_eq!(first.total_amount + second.total_amount, 281.0);
}

#[tokio::test]
async fn test_batch_dedupes_sheet_labels() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with(sample_template(), AppSettings::default());
    let a = sample_order("A/1", "张三", vec![sample_line("机油", 1.0, 1.0)]);
    let b = sample_order("a_1", "李四", vec![sample_line("机油", 1.0, 1.0)]);

    let outcome = coordinator(&storage, RecordingPrompt::new(dir.path()))
        .export_orders_batch(&[a, b])
        .await
        .unwrap()
        .unwrap();

    let package = XlsxPackage::from_bytes(&std::fs::read(&outcome.path).unwrap()).unwrap();
    let names: Vec<String> = package.sheets().unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["A_1", "a_1 (2)", SUMMARY_SHEET_NAME]);
}

#[tokio::test]
async fn test_batch_validation_names_each_order() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with(sample_template(), AppSettings::default());
    let ok = sample_order("NO.000001", "张三", vec![sample_line("机油", 1.0, 1.0)]);
    let lines = (0..12).map(|i| sample_line(&format!("商品{i}"), 1.0, 1.0)).collect();
    let too_long = sample_order("NO.000002", "李四", lines);

    let err = coordinator(&storage, RecordingPrompt::new(dir.path()))
        .export_orders_batch(&[ok, too_long])
        .await
        .unwrap_err();

    match err {
        EngineError::Validation(errors) => assert_eq!(
            errors.issues(),
            &[ValidationIssue::InOrder {
                order_number: "NO.000002".to_string(),
                issue: Box::new(ValidationIssue::ItemOverflow {
                    items: 12,
                    capacity: 10
                }),
            }]
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let storage = storage_with(sample_template(), AppSettings::default());
    let err = coordinator(&storage, Arc::new(CancelDestination))
        .export_orders_batch(&[])
        .await
        .unwrap_err();
    match err {
        EngineError::Validation(errors) => {
            assert_eq!(errors.issues(), &[ValidationIssue::EmptyBatch]);
            assert_eq!(errors.code(), ErrorCode::ExportEmptyBatch);
        }
        other => panic!("unexpected error: {other}"),
    }
}
