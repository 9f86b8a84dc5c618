//! 集成测试公共夹具：销售单模板与草稿

#![allow(dead_code)]

use chrono::NaiveDate;
use quick_xlsx::{CellValue, SheetBuilder, XlsxPackage};
use shared::models::{
    Customer, DraftCustomer, DraftOrderState, OrderLine, RequiredFields, TemplateColumns,
    TemplateConfig, TemplateMappings,
};

pub fn order_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()
}

/// 销售单模板：第 1-4 行为标题，第 5-14 行为明细
pub fn sales_template() -> TemplateConfig {
    let mut sheet = SheetBuilder::new();
    sheet
        .row([Some(CellValue::from("销售单"))])
        .row([Some(CellValue::from("客户")), None, None, None, Some(CellValue::from("日期"))])
        .row([Some(CellValue::from("车牌")), None, None, None, Some(CellValue::from("单号"))])
        .row(
            ["品名", "单位", "数量", "单价", "金额", "备注"].map(|h| Some(CellValue::from(h))),
        );
    let workbook = XlsxPackage::new_workbook("销售单", sheet.build())
        .unwrap()
        .to_bytes()
        .unwrap();

    let mut template = TemplateConfig {
        id: "tpl-sales".to_string(),
        name: "销售单".to_string(),
        is_default: true,
        mappings: TemplateMappings {
            customer_name: "B2".to_string(),
            customer_plate: "B3".to_string(),
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
            require_item_quantity: true,
            ..Default::default()
        },
        ..Default::default()
    };
    template.set_payload(&workbook);
    template
}

pub fn line(name: &str, unit_price: f64, quantity: f64) -> OrderLine {
    OrderLine {
        name: name.to_string(),
        unit: "件".to_string(),
        unit_price,
        quantity,
        ..Default::default()
    }
}

pub fn draft(customer: &str, plate: &str, items: Vec<OrderLine>) -> DraftOrderState {
    let mut draft = DraftOrderState::new(order_date());
    draft.customer = Some(DraftCustomer::classify(Customer {
        id: format!("temp_{customer}"),
        name: customer.to_string(),
        license_plate: plate.to_string(),
        ..Default::default()
    }));
    draft.items = items;
    draft
}
