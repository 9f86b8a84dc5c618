use super::*;
use crate::core::{EngineError, ValidationIssue};
use crate::drafts::DraftArena;
use crate::export::{DirectoryDestination, ExportCoordinator};
use crate::numbering::NumberAllocator;
use crate::template::tests::{sample_line, sample_template};
use chrono::NaiveDate;
use shared::models::{
    AppSettings, Customer, DraftCustomer, DraftOrderState, DraftPatch, NumberKind, NumberingMode,
};
use std::path::Path;
use std::sync::Arc;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()
}

fn service(storage: &Arc<OrderStorage>, out: &Path) -> OrderService {
    let exporter = ExportCoordinator::new(
        storage.clone(),
        storage.clone(),
        Arc::new(DirectoryDestination::new(Some(out.to_path_buf()))),
    );
    OrderService::new(
        storage.clone(),
        storage.clone(),
        NumberAllocator::new(storage.clone()),
        exporter,
    )
}

fn temp_customer(name: &str) -> DraftCustomer {
    DraftCustomer::classify(Customer {
        id: "temp_1".to_string(),
        name: name.to_string(),
        phone: "13900000000".to_string(),
        ..Default::default()
    })
}

fn draft(customer: DraftCustomer) -> DraftOrderState {
    let mut draft = DraftOrderState::new(date());
    draft.customer = Some(customer);
    draft.items = vec![sample_line("机油", 80.0, 2.0), sample_line("滤芯", 30.5, 1.0)];
    draft
}

fn storage() -> Arc<OrderStorage> {
    Arc::new(OrderStorage::open_in_memory().unwrap())
}

#[tokio::test]
async fn test_save_order_numbers_and_snapshots_temp_customer() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    let service = service(&storage, dir.path());

    let saved = service.save_order(&draft(temp_customer("路人")), false).await.unwrap();

    assert_eq!(saved.order.order_number, "NO.000001");
    assert_eq!(saved.order.total_amount, 190.5);
    assert_eq!(saved.order.customer.id, Customer::snapshot_id(&saved.order.id));
    assert_eq!(saved.order.customer.name, "路人");
    assert!(matches!(saved.export, ExportStatus::NotRequested));

    assert!(storage.list_customers().unwrap().is_empty());
    let stored = storage.find_order_by_number("NO.000001").unwrap().unwrap();
    assert_eq!(stored, saved.order);
}

#[tokio::test]
async fn test_existing_customer_gets_last_purchase() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    let customer = Customer {
        id: "c-1".to_string(),
        name: "张三".to_string(),
        created_at: 100,
        updated_at: 100,
        ..Default::default()
    };
    storage.upsert_customer(&customer).unwrap();

    let saved = service(&storage, dir.path())
        .save_order(&draft(DraftCustomer::Existing(customer)), false)
        .await
        .unwrap();

    let stored = storage.get_customer("c-1").unwrap().unwrap();
    assert_eq!(stored.created_at, 100);
    assert_eq!(stored.last_purchase_at, Some(saved.order.updated_at));
    assert_eq!(saved.order.customer.id, "c-1");
}

#[tokio::test]
async fn test_invalid_draft_consumes_no_number() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    let service = service(&storage, dir.path());

    let mut bad = DraftOrderState::new(date());
    bad.customer = Some(temp_customer("  "));
    let err = service.save_order(&bad, false).await.unwrap_err();
    match err {
        EngineError::Validation(errors) => assert_eq!(
            errors.issues(),
            &[ValidationIssue::MissingCustomer, ValidationIssue::EmptyItems]
        ),
        other => panic!("unexpected error: {other}"),
    }

    let mut bad_qty = draft(temp_customer("张三"));
    bad_qty.items[1].quantity = 0.0;
    assert!(matches!(
        service.save_order(&bad_qty, false).await.unwrap_err(),
        EngineError::Validation(_)
    ));

    assert_eq!(service.preview_number(date()).unwrap(), "NO.000001");
}

#[tokio::test]
async fn test_save_active_marks_tab_and_reuses_number() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    let service = service(&storage, dir.path());

    let mut arena = DraftArena::new();
    arena.update_active_draft(DraftPatch::order_date(date()));
    arena.update_active_draft(DraftPatch::customer(temp_customer("张三")));
    arena.update_active_draft(DraftPatch::items(vec![sample_line("机油", 80.0, 1.0)]));

    let first = service.save_active(&mut arena, false).await.unwrap();
    let tab = arena.get_active_tab().clone();
    assert!(!tab.dirty);
    assert_eq!(tab.title, "NO.000001");
    assert_eq!(tab.order_id.as_deref(), Some(first.order.id.as_str()));

    arena.update_active_draft(DraftPatch::items(vec![sample_line("机油", 80.0, 3.0)]));
    let second = service.save_active(&mut arena, false).await.unwrap();

    assert_eq!(second.order.id, first.order.id);
    assert_eq!(second.order.order_number, "NO.000001");
    assert_eq!(second.order.created_at, first.order.created_at);
    assert_eq!(second.order.total_amount, 240.0);
    assert_eq!(storage.list_orders().unwrap().len(), 1);
    assert_eq!(service.preview_number(date()).unwrap(), "NO.000002");
}

#[tokio::test]
async fn test_save_active_with_export() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    storage.save_template(&sample_template()).unwrap();
    let service = service(&storage, dir.path());

    let mut arena = DraftArena::new();
    arena.update_active_draft(DraftPatch::order_date(date()));
    arena.update_active_draft(DraftPatch::customer(temp_customer("张三")));
    arena.update_active_draft(DraftPatch::items(vec![sample_line("机油", 80.0, 1.0)]));

    let saved = service.save_active(&mut arena, true).await.unwrap();
    match &saved.export {
        ExportStatus::Written(outcome) => {
            assert_eq!(outcome.file_name, "20260109_张三_NO.000001.xlsx");
            assert!(outcome.path.exists());
        }
        other => panic!("unexpected export status: {other:?}"),
    }
    assert!(!arena.get_active_tab().dirty);
}

#[tokio::test]
async fn test_failed_export_keeps_tab_dirty_with_number() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    let service = service(&storage, dir.path());

    let mut arena = DraftArena::new();
    arena.update_active_draft(DraftPatch::order_date(date()));
    arena.update_active_draft(DraftPatch::customer(temp_customer("张三")));
    arena.update_active_draft(DraftPatch::items(vec![sample_line("机油", 80.0, 1.0)]));

    // no template stored, so the export fails after the order is persisted
    let saved = service.save_active(&mut arena, true).await.unwrap();
    assert!(saved.export.is_failed());
    assert!(storage.get_order(&saved.order.id).unwrap().is_some());

    let tab = arena.get_active_tab();
    assert!(tab.dirty);
    let number = tab.draft.number.as_ref().unwrap();
    assert_eq!(number.number, "NO.000001");
    assert_eq!(number.kind, NumberKind::Sequenced);
}

#[tokio::test]
async fn test_manual_numbering_is_derived_and_unique() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    storage
        .save_settings(&AppSettings {
            order_number_format: "{CUSTOM}{YYYY}{MM}{DD}".to_string(),
            order_number_prefix: "XS".to_string(),
            numbering_mode: Some(NumberingMode::Manual),
            ..Default::default()
        })
        .unwrap();
    let service = service(&storage, dir.path());

    let mut arena = DraftArena::new();
    arena.update_active_draft(DraftPatch::order_date(date()));
    arena.update_active_draft(DraftPatch::customer(temp_customer("张三")));
    arena.update_active_draft(DraftPatch::items(vec![sample_line("机油", 80.0, 1.0)]));
    let saved = service.save_active(&mut arena, false).await.unwrap();
    assert_eq!(saved.order.order_number, "XS20260109");
    assert_eq!(
        arena.get_active_tab().draft.number.as_ref().unwrap().kind,
        NumberKind::Derived
    );
    assert_eq!(service.preview_number(date()).unwrap(), "XS20260109");

    let err = service
        .save_order(&draft(temp_customer("李四")), false)
        .await
        .unwrap_err();
    match err {
        EngineError::Validation(errors) => assert_eq!(
            errors.issues(),
            &[ValidationIssue::DuplicateOrderNumber {
                number: "XS20260109".to_string()
            }]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_typed_number_is_saved_as_entered() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    storage
        .save_settings(&AppSettings {
            numbering_mode: Some(NumberingMode::Manual),
            ..Default::default()
        })
        .unwrap();
    let service = service(&storage, dir.path());

    let mut arena = DraftArena::new();
    arena.update_active_draft(DraftPatch::order_date(date()));
    arena.update_active_draft(DraftPatch::customer(temp_customer("张三")));
    arena.update_active_draft(DraftPatch::items(vec![sample_line("机油", 80.0, 1.0)]));
    arena.update_active_draft(DraftPatch::order_number(Some("手写-001".to_string())));

    let saved = service.save_active(&mut arena, false).await.unwrap();
    assert_eq!(saved.order.order_number, "手写-001");
    let tab = arena.get_active_tab();
    assert_eq!(tab.title, "手写-001");
    assert_eq!(tab.draft.number.as_ref().unwrap().kind, NumberKind::Typed);
}

#[tokio::test]
async fn test_rejected_order_leaves_customer_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage();
    storage
        .save_settings(&AppSettings {
            order_number_format: "{CUSTOM}{YYYY}{MM}{DD}".to_string(),
            order_number_prefix: "XS".to_string(),
            numbering_mode: Some(NumberingMode::Manual),
            ..Default::default()
        })
        .unwrap();
    let customer = Customer {
        id: "c-1".to_string(),
        name: "张三".to_string(),
        created_at: 100,
        updated_at: 100,
        ..Default::default()
    };
    storage.upsert_customer(&customer).unwrap();
    let service = service(&storage, dir.path());

    service.save_order(&draft(temp_customer("路人")), false).await.unwrap();
    let err = service
        .save_order(&draft(DraftCustomer::Existing(customer)), false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let stored = storage.get_customer("c-1").unwrap().unwrap();
    assert_eq!(stored.last_purchase_at, None);
    assert_eq!(stored.updated_at, 100);
}

#[test]
fn test_validate_draft_reports_line_issues() {
    let mut d = draft(temp_customer("张三"));
    d.items[0].unit_price = -1.0;
    d.items[1].quantity = f64::NAN;
    let errors = validate_draft(&d).unwrap_err();
    assert_eq!(errors.len(), 2);
}
