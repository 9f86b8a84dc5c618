use super::*;
use crate::core::{EngineError, Resource, ValidationIssue};
use chrono::NaiveDate;
use quick_xlsx::{CellRef, CellValue, SheetBuilder, XlsxPackage};
use shared::models::{
    Customer, FinalizedOrder, OrderLine, OrderStatus, RequiredFields, TemplateColumns,
    TemplateConfig, TemplateMappings,
};

/// Sales-slip workbook: labels in rows 1-4, items from row 5
pub(crate) fn template_workbook() -> Vec<u8> {
    let mut sheet = SheetBuilder::new();
    sheet
        .row([Some(CellValue::from("销售单"))])
        .row([
            Some(CellValue::from("客户")),
            None,
            None,
            None,
            Some(CellValue::from("日期")),
        ])
        .row([
            Some(CellValue::from("电话")),
            None,
            None,
            None,
            Some(CellValue::from("单号")),
        ])
        .row([
            Some(CellValue::from("品名")),
            Some(CellValue::from("单位")),
            Some(CellValue::from("数量")),
            Some(CellValue::from("单价")),
            Some(CellValue::from("金额")),
            Some(CellValue::from("备注")),
        ])
        .column_width(0, 24.0);
    XlsxPackage::new_workbook("销售单", sheet.build())
        .unwrap()
        .to_bytes()
        .unwrap()
}

pub(crate) fn sample_template() -> TemplateConfig {
    let mut template = TemplateConfig {
        id: "tpl-1".to_string(),
        name: "标准销售单".to_string(),
        file_name: "sales.xlsx".to_string(),
        is_default: true,
        mappings: TemplateMappings {
            customer_name: "B2".to_string(),
            customer_phone: "B3".to_string(),
            date: "F2".to_string(),
            order_number: "F3".to_string(),
            total_amount: "E15".to_string(),
            item_start_row: 5,
            item_end_row: 14,
            columns: TemplateColumns {
                name: "A".to_string(),
                unit: "B".to_string(),
                quantity: "C".to_string(),
                price: "D".to_string(),
                total: "E".to_string(),
                remark: "F".to_string(),
            },
            ..Default::default()
        },
        required_fields: RequiredFields {
            require_customer_name: true,
            require_item_name: true,
            ..Default::default()
        },
        ..Default::default()
    };
    template.set_payload(&template_workbook());
    template
}

pub(crate) fn sample_order(number: &str, customer: &str, lines: Vec<OrderLine>) -> FinalizedOrder {
    let total = crate::order_money::to_f64(crate::order_money::calculate_order_total(&lines));
    FinalizedOrder {
        id: format!("order-{number}"),
        order_number: number.to_string(),
        date: NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
        customer: Customer {
            id: "cust-1".to_string(),
            name: customer.to_string(),
            phone: "13800000000".to_string(),
            ..Default::default()
        },
        lines,
        total_amount: total,
        note: None,
        template_id: None,
        status: OrderStatus::Completed,
        created_at: 1,
        updated_at: 1,
    }
}

pub(crate) fn sample_line(name: &str, unit_price: f64, quantity: f64) -> OrderLine {
    OrderLine {
        name: name.to_string(),
        unit: "个".to_string(),
        unit_price,
        quantity,
        ..Default::default()
    }
}

fn binder() -> TemplateBinder {
    TemplateBinder::new("YYYY.MM.DD", None)
}

#[test]
fn test_excel_date_formats() {
    let d = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
    assert_eq!(format_excel_date(d, "YYYY.MM.DD"), "2026.01.09");
    assert_eq!(format_excel_date(d, "YYYY年M月D日"), "2026年1月9日");
    assert_eq!(format_excel_date(d, "YY/MM/DD"), "26/01/09");
    assert_eq!(format_excel_date(d, ""), "2026-01-09");
}

#[test]
fn test_bind_then_read_back() {
    let mut oil = sample_line("机油", 80.0, 2.0);
    oil.note = Some("5W-30".to_string());
    let mut filter = sample_line("滤芯", 30.0, 1.0);
    filter.override_price = Some(25.0);
    filter.sort_value = 1;
    let order = sample_order("NO.000001", "张三", vec![oil, filter]);

    let doc = binder().bind(&sample_template(), &order).unwrap();
    assert_eq!(doc.sheet_name, "销售单");

    let reloaded = XlsxPackage::from_bytes(&doc.to_bytes().unwrap()).unwrap();
    let values = reloaded.read_sheet_values("销售单").unwrap();
    let at = |a1: &str| values.get(&CellRef::parse(a1).unwrap()).cloned();

    assert_eq!(at("B2"), Some(CellValue::from("张三")));
    assert_eq!(at("B3"), Some(CellValue::from("13800000000")));
    assert_eq!(at("F2"), Some(CellValue::from("2026.01.09")));
    assert_eq!(at("F3"), Some(CellValue::from("NO.000001")));
    assert_eq!(at("E15"), Some(CellValue::Number(185.0)));

    assert_eq!(at("A5"), Some(CellValue::from("机油")));
    assert_eq!(at("B5"), Some(CellValue::from("个")));
    assert_eq!(at("C5"), Some(CellValue::Number(2.0)));
    assert_eq!(at("D5"), Some(CellValue::Number(80.0)));
    assert_eq!(at("E5"), Some(CellValue::Number(160.0)));
    assert_eq!(at("F5"), Some(CellValue::from("5W-30")));

    assert_eq!(at("A6"), Some(CellValue::from("滤芯")));
    assert_eq!(at("D6"), Some(CellValue::Number(25.0)));
    assert_eq!(at("E6"), Some(CellValue::Number(25.0)));
    assert_eq!(at("F6"), None);

    // labels untouched
    assert_eq!(at("A2"), Some(CellValue::from("客户")));
    assert_eq!(at("A4"), Some(CellValue::from("品名")));
    assert_eq!(at("A7"), None);
}

#[test]
fn test_bind_orders_lines_by_sort_value() {
    let mut first = sample_line("后", 1.0, 1.0);
    first.sort_value = 2;
    let mut second = sample_line("前", 1.0, 1.0);
    second.sort_value = 1;
    let order = sample_order("NO.000002", "李四", vec![first, second]);

    let doc = binder().bind(&sample_template(), &order).unwrap();
    assert_eq!(
        doc.package
            .cell_value("销售单", CellRef::parse("A5").unwrap())
            .unwrap(),
        Some(CellValue::from("前"))
    );
}

#[test]
fn test_bind_rejects_overflow() {
    let lines = (0..11).map(|i| sample_line(&format!("商品{i}"), 1.0, 1.0)).collect();
    let order = sample_order("NO.000003", "张三", lines);

    match binder().bind(&sample_template(), &order).unwrap_err() {
        EngineError::Validation(errors) => assert_eq!(
            errors.issues(),
            &[ValidationIssue::ItemOverflow {
                items: 11,
                capacity: 10
            }]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_payload_is_not_found() {
    let mut template = sample_template();
    template.template_base64.clear();
    let order = sample_order("NO.000004", "张三", vec![sample_line("机油", 1.0, 1.0)]);

    let err = binder().bind(&template, &order).unwrap_err();
    assert!(matches!(
        err,
        EngineError::NotFound {
            resource: Resource::TemplatePayload,
            ..
        }
    ));
}

#[test]
fn test_garbage_payload_is_sheet_error() {
    let mut template = sample_template();
    template.set_payload(b"not a zip file");
    let order = sample_order("NO.000005", "张三", vec![sample_line("机油", 1.0, 1.0)]);
    assert!(matches!(
        binder().bind(&template, &order).unwrap_err(),
        EngineError::Sheet(_)
    ));
}

#[test]
fn test_settings_override_required_fields() {
    let strict = RequiredFields {
        require_customer_plate: true,
        ..Default::default()
    };
    let binder = TemplateBinder::new("YYYY.MM.DD", Some(strict));
    let errors = binder.validate(&sample_template(), 1).unwrap_err();
    assert_eq!(
        errors.issues(),
        &[ValidationIssue::MissingRequiredMapping {
            field: "customerPlate".to_string()
        }]
    );
}
