//! End-to-end tests for the inventory service.
//!
//! Item registry → policy engine → gateway journal → stock level projection.

use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use stockbook_core::{DomainError, ItemId, UserId};
use stockbook_infra::{InMemoryGateway, InventoryService, RuntimeSettings, ServiceError};
use stockbook_inventory::{
    ConditionStatus, DraftTransaction, NewItem, NewLine, StockPolicy, TransactionType,
};

type Service = InventoryService<Arc<InMemoryGateway>, Arc<RuntimeSettings>>;

fn setup(policy: StockPolicy) -> (Service, Arc<RuntimeSettings>) {
    stockbook_observability::tracing::init_for_tests();
    let settings = Arc::new(RuntimeSettings::new(policy));
    let service = InventoryService::new(Arc::new(InMemoryGateway::new()), settings.clone());
    (service, settings)
}

fn test_user() -> UserId {
    UserId::new()
}

fn item(service: &Service, code: &str) -> ItemId {
    service
        .create_item(NewItem::new(code, "Widget", "Parts", "pcs", 0))
        .unwrap()
        .id_typed()
}

fn receive(item_id: ItemId, qty: i64) -> DraftTransaction {
    DraftTransaction::receive("PO", test_user()).with_line(NewLine::new(item_id, qty))
}

fn issue(item_id: ItemId, qty: i64) -> DraftTransaction {
    DraftTransaction::issue("SO", test_user()).with_line(NewLine::new(item_id, qty))
}

fn write_off(item_id: ItemId, qty: i64, condition: ConditionStatus) -> DraftTransaction {
    DraftTransaction::new(TransactionType::Disposition, "W/O", test_user())
        .with_line(NewLine::new(item_id, qty).with_condition(condition))
}

fn domain(err: ServiceError) -> DomainError {
    match err {
        ServiceError::Domain(e) => e,
        other => panic!("expected domain error, got {other:?}"),
    }
}

#[test]
fn racecar_item_is_a_palindrome_with_unique_id() {
    let (service, _) = setup(StockPolicy::default());
    let created = service
        .create_item(NewItem::new("A01", "racecar", "Tools", "pcs", 2))
        .unwrap();
    let other = service
        .create_item(NewItem::new("A02", "racecar", "Tools", "pcs", 2))
        .unwrap();

    assert!(created.is_palindrome());
    assert_eq!(created.min_stock(), 2);
    assert_ne!(created.id_typed(), other.id_typed());
    assert_eq!(service.get_item(created.id_typed()).unwrap(), created);
}

#[test]
fn identical_receipts_are_not_deduplicated() {
    let (service, _) = setup(StockPolicy::default());
    let widget = item(&service, "W1");

    let first = service.append_transaction(receive(widget, 4)).unwrap();
    let second = service.append_transaction(receive(widget, 4)).unwrap();

    assert_ne!(first, second);
    assert_eq!(service.current_stock(widget).unwrap(), 8);
    assert_eq!(service.cached_stock(widget), Some(8));
}

#[test]
fn issue_beyond_stock_depends_on_negative_stock_policy() {
    let (service, settings) = setup(StockPolicy::new(true, false));
    let widget = item(&service, "W1");
    service.append_transaction(receive(widget, 5)).unwrap();

    let err = domain(service.append_transaction(issue(widget, 6)).unwrap_err());
    assert_eq!(err, DomainError::InsufficientStock { available: 5, requested: 6 });
    assert_eq!(service.current_stock(widget).unwrap(), 5);

    settings.set_allow_negative_stock(true);
    service.append_transaction(issue(widget, 6)).unwrap();
    assert_eq!(service.current_stock(widget).unwrap(), -1);
}

#[test]
fn non_usable_write_off_counts_only_when_enabled() {
    let (service, settings) = setup(StockPolicy::new(false, false));
    let widget = item(&service, "W1");
    service.append_transaction(receive(widget, 10)).unwrap();
    service
        .append_transaction(write_off(widget, 3, ConditionStatus::NotUsable))
        .unwrap();

    // Computed and cached agree while the policy is unchanged.
    assert_eq!(service.current_stock(widget).unwrap(), 10);
    assert_eq!(service.cached_stock(widget), Some(10));

    settings.set_count_non_usable_as_outgoing(true);

    // Recomputed balance follows the new flag; the cached one does not.
    assert_eq!(service.current_stock(widget).unwrap(), 7);
    assert_eq!(service.cached_stock(widget), Some(10));

    service.rebuild_stock_levels().unwrap();
    assert_eq!(service.cached_stock(widget), Some(7));
}

#[test]
fn usable_write_off_always_counts_and_is_guarded() {
    let (service, _) = setup(StockPolicy::new(false, false));
    let widget = item(&service, "W1");
    service.append_transaction(receive(widget, 2)).unwrap();

    let err = domain(
        service
            .append_transaction(write_off(widget, 3, ConditionStatus::Usable))
            .unwrap_err(),
    );
    assert_eq!(err, DomainError::insufficient_stock(2, 3));

    service
        .append_transaction(write_off(widget, 2, ConditionStatus::Usable))
        .unwrap();
    assert_eq!(service.current_stock(widget).unwrap(), 0);
}

#[test]
fn malformed_transactions_are_validation_errors() {
    let (service, _) = setup(StockPolicy::default());
    let widget = item(&service, "W1");

    let empty = DraftTransaction::issue("SO", test_user());
    assert!(matches!(
        domain(service.append_transaction(empty).unwrap_err()),
        DomainError::Validation(_)
    ));

    assert_eq!(
        domain(service.append_transaction(issue(widget, 0)).unwrap_err()),
        DomainError::validation("quantity must be positive")
    );

    let bad_price = DraftTransaction::receive("PO", test_user())
        .with_line(NewLine::new(widget, 1).with_unit_price(dec!(-1)));
    assert!(matches!(
        domain(service.append_transaction(bad_price).unwrap_err()),
        DomainError::Validation(_)
    ));

    let damaged_receipt = DraftTransaction::receive("PO", test_user())
        .with_line(NewLine::new(widget, 1).with_condition(ConditionStatus::NotUsable));
    assert!(matches!(
        domain(service.append_transaction(damaged_receipt).unwrap_err()),
        DomainError::Validation(_)
    ));

    assert_eq!(service.gateway().transaction_count().unwrap(), 0);
}

#[test]
fn negative_adjustment_reduces_balance() {
    let (service, _) = setup(StockPolicy::default());
    let widget = item(&service, "W1");
    service.append_transaction(receive(widget, 10)).unwrap();

    let count = DraftTransaction::new(TransactionType::Adjust, "STOCKTAKE", test_user())
        .with_line(NewLine::new(widget, -4));
    service.append_transaction(count).unwrap();

    assert_eq!(service.current_stock(widget).unwrap(), 6);
}

#[test]
fn multi_line_transaction_is_all_or_nothing() {
    let (service, _) = setup(StockPolicy::default());
    let a = item(&service, "A");
    let b = item(&service, "B");
    service.append_transaction(receive(a, 5)).unwrap();
    service.append_transaction(receive(b, 1)).unwrap();

    let draft = DraftTransaction::issue("SO", test_user())
        .with_line(NewLine::new(a, 2))
        .with_line(NewLine::new(b, 2));
    let err = domain(service.append_transaction(draft).unwrap_err());
    assert_eq!(err, DomainError::insufficient_stock(1, 2));

    assert_eq!(service.current_stock(a).unwrap(), 5);
    assert_eq!(service.current_stock(b).unwrap(), 1);
}

#[test]
fn concurrent_issues_never_oversell() {
    let (service, _) = setup(StockPolicy::new(true, false));
    let widget = item(&service, "W1");
    service.append_transaction(receive(widget, 10)).unwrap();

    let service = &service;
    let accepted: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..25)
            .map(|_| s.spawn(move || service.append_transaction(issue(widget, 1)).is_ok()))
            .collect();
        handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum()
    });

    assert_eq!(accepted, 10);
    assert_eq!(service.current_stock(widget).unwrap(), 0);
    assert_eq!(service.cached_stock(widget), Some(0));
}

#[test]
fn low_stock_list_uses_minimum_stock() {
    let (service, _) = setup(StockPolicy::default());
    let short = service
        .create_item(NewItem::new("S", "Short", "Parts", "pcs", 5))
        .unwrap()
        .id_typed();
    let fine = service
        .create_item(NewItem::new("F", "Fine", "Parts", "pcs", 5))
        .unwrap()
        .id_typed();
    service.append_transaction(receive(short, 4)).unwrap();
    service.append_transaction(receive(fine, 6)).unwrap();

    let low: Vec<ItemId> = service.low_stock_items().into_iter().map(|l| l.item_id).collect();
    assert_eq!(low, vec![short]);
}

#[test]
fn report_lists_lines_in_range() {
    let (service, _) = setup(StockPolicy::default());
    let widget = item(&service, "W1");
    let day = |d| NaiveDate::from_ymd_opt(2024, 7, d).unwrap();

    service
        .append_transaction(receive(widget, 3).dated(day(1)).with_notes("opening"))
        .unwrap();
    service.append_transaction(issue(widget, 1).dated(day(15))).unwrap();

    let rows = service.transaction_report(day(1), day(7)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tx_type, TransactionType::In);
    assert_eq!(rows[0].item_name, "Widget");
    assert_eq!(rows[0].notes, "opening");

    assert_eq!(service.transaction_report(day(1), day(31)).unwrap().len(), 2);
}

#[test]
fn renaming_recomputes_palindrome_flag() {
    let (service, _) = setup(StockPolicy::default());
    let widget = item(&service, "W1");

    let renamed = service
        .update_item(
            widget,
            stockbook_inventory::ItemChanges::new("Madam, I'm Adam", "Parts", "pcs", 1),
        )
        .unwrap();
    assert!(renamed.is_palindrome());
    assert_eq!(renamed.code(), "W1");
    assert_eq!(service.stock_level(widget).unwrap().name, "Madam, I'm Adam");
}

#[test]
fn cached_level_survives_concurrent_edits_and_rebuilds() {
    let (service, _) = setup(StockPolicy::default());
    let widget = item(&service, "W1");

    let service = &service;
    thread::scope(|s| {
        s.spawn(move || {
            for _ in 0..100 {
                service.append_transaction(receive(widget, 1)).unwrap();
            }
        });
        s.spawn(move || {
            for i in 0..50 {
                let changes = stockbook_inventory::ItemChanges::new(format!("Widget {i}"), "Parts", "pcs", 0);
                service.update_item(widget, changes).unwrap();
            }
        });
        s.spawn(move || {
            for _ in 0..20 {
                service.rebuild_stock_levels().unwrap();
            }
        });
    });

    assert_eq!(service.current_stock(widget).unwrap(), 100);
    assert_eq!(service.cached_stock(widget), Some(100));
}

#[test]
fn stale_edit_after_delete_and_code_reuse_is_rejected() {
    let (service, _) = setup(StockPolicy::default());
    let old = item(&service, "A01");
    service.delete_item(old).unwrap();
    let new = item(&service, "A01");

    let err = service
        .update_item(old, stockbook_inventory::ItemChanges::new("Gadget", "Parts", "pcs", 0))
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::Validation(msg) if msg.contains("inactive")));

    let codes: Vec<ItemId> = service
        .search_items("A01")
        .unwrap()
        .into_iter()
        .map(|i| i.id_typed())
        .collect();
    assert_eq!(codes, vec![new]);
}
