use sea_orm::{ConnectionTrait, Database, Statement};
use uuid::Uuid;

use ledger::{
    Category, Ledger, LedgerError, MenuItem, MoneyCents, Order, OrderItem, OrderStatus,
    PaymentMethod, Student, TransactionClass, TransactionKind,
};
use migration::MigratorTrait;

async fn ledger_with_db() -> Ledger {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["carla", "dario"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, role) VALUES (?, ?, ?)",
            vec![username.into(), "password".into(), "parent".into()],
        ))
        .await
        .unwrap();
    }
    Ledger::builder().database(db).build()
}

/// Funds a wallet through the only legal credit path: an applied top-up.
async fn fund(ledger: &Ledger, parent_id: &str, cents: i64) {
    let topup = ledger
        .request_topup(parent_id, MoneyCents::new(cents), PaymentMethod::Cash, None)
        .await
        .unwrap();
    ledger.approve_topup(topup.id).await.unwrap();
    ledger.apply_topup(parent_id, topup.id).await.unwrap();
}

async fn linked_student(ledger: &Ledger, parent_id: &str) -> Student {
    let mut student = Student::new("Giulia".to_string(), "3B".to_string(), None);
    student.parent_id = Some(parent_id.to_string());
    ledger.add_student(&student).await.unwrap();
    student
}

fn lunch_order(parent_id: &str) -> Order {
    let items = vec![
        OrderItem::new(
            Uuid::new_v4(),
            "Lasagne".to_string(),
            MoneyCents::new(45_00),
            2,
        )
        .unwrap(),
        OrderItem::new(
            Uuid::new_v4(),
            "Macedonia".to_string(),
            MoneyCents::new(20_00),
            1,
        )
        .unwrap(),
    ];
    Order::new(
        parent_id.to_string(),
        Uuid::new_v4(),
        items,
        chrono::Utc::now(),
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn charge_debits_and_appends_one_entry() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 500_00).await;

    let order = lunch_order("carla");
    assert_eq!(order.total, MoneyCents::new(110_00));

    let entry = ledger.charge_order("carla", &order).await.unwrap();
    assert_eq!(entry.kind, TransactionKind::Charge);
    assert_eq!(entry.amount, MoneyCents::new(-110_00));
    assert_eq!(entry.balance_before, MoneyCents::new(500_00));
    assert_eq!(entry.balance_after, MoneyCents::new(390_00));
    assert_eq!(entry.order_ids, vec![order.id.to_string()]);

    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(390_00));
    // Top-up plus charge.
    assert_eq!(ledger.list_transactions("carla", 50).await.unwrap().len(), 2);
}

#[tokio::test]
async fn insufficient_funds_changes_nothing() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 50_00).await;

    let order = lunch_order("carla");
    let err = ledger.charge_order("carla", &order).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));

    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(50_00));
    assert_eq!(ledger.list_transactions("carla", 50).await.unwrap().len(), 1);
}

#[tokio::test]
async fn tampered_total_is_rejected() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 500_00).await;

    let mut order = lunch_order("carla");
    order.total = MoneyCents::new(1_00);
    let err = ledger.charge_order("carla", &order).await.unwrap_err();
    assert!(matches!(err, LedgerError::AmountMismatch(_)));
    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(500_00));
}

#[tokio::test]
async fn topup_credits_once() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 100_00).await;

    let topup = ledger
        .request_topup("carla", MoneyCents::new(250_00), PaymentMethod::BankTransfer, None)
        .await
        .unwrap();
    ledger.approve_topup(topup.id).await.unwrap();

    let entry = ledger.apply_topup("carla", topup.id).await.unwrap();
    assert_eq!(entry.kind, TransactionKind::Topup);
    assert_eq!(entry.amount, MoneyCents::new(250_00));
    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(350_00));

    // The second apply must fail and credit nothing.
    let err = ledger.apply_topup("carla", topup.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(350_00));
}

#[tokio::test]
async fn declined_or_pending_topups_never_credit() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();

    let pending = ledger
        .request_topup("carla", MoneyCents::new(40_00), PaymentMethod::Cash, None)
        .await
        .unwrap();
    let err = ledger.apply_topup("carla", pending.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    let declined = ledger
        .request_topup("carla", MoneyCents::new(40_00), PaymentMethod::Cash, None)
        .await
        .unwrap();
    ledger.decline_topup(declined.id).await.unwrap();
    let err = ledger.apply_topup("carla", declined.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::ZERO);
}

#[tokio::test]
async fn topups_stay_per_parent() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    ledger.create_parent("dario").await.unwrap();

    let topup = ledger
        .request_topup("carla", MoneyCents::new(40_00), PaymentMethod::Cash, None)
        .await
        .unwrap();
    ledger.approve_topup(topup.id).await.unwrap();

    let err = ledger.apply_topup("dario", topup.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(ledger.balance("dario").await.unwrap(), MoneyCents::ZERO);
}

#[tokio::test]
async fn deferred_order_keeps_balance_and_realizes_once() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 200_00).await;
    let student = linked_student(&ledger, "carla").await;

    let pasta = MenuItem::new(
        "Pasta al forno".to_string(),
        MoneyCents::new(75_00),
        Category::Main,
        None,
    )
    .unwrap();
    ledger.add_menu_item(&pasta).await.unwrap();

    let (order, deferred) = ledger
        .place_order("carla", student.id, &[(pasta.id, 1)], true, None)
        .await
        .unwrap();

    assert_eq!(deferred.kind, TransactionKind::DeferredCharge);
    assert_eq!(deferred.amount, MoneyCents::ZERO);
    assert_eq!(deferred.balance_before, deferred.balance_after);
    assert_eq!(deferred.classify(), TransactionClass::PendingDeferred);
    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(200_00));

    let realized = ledger.realize_deferred("carla", deferred.id).await.unwrap();
    assert_eq!(realized.kind, TransactionKind::RealizedDeferredCharge);
    assert_eq!(realized.amount, MoneyCents::new(-75_00));
    assert_eq!(realized.deferred_transaction_id, Some(deferred.id));
    assert_eq!(realized.order_ids, vec![order.id.to_string()]);
    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(125_00));

    // Exactly once: the second realization fails and moves nothing.
    let err = ledger
        .realize_deferred("carla", deferred.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(125_00));
}

#[tokio::test]
async fn ledger_replay_matches_balance() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 300_00).await;

    let order = lunch_order("carla");
    ledger.charge_order("carla", &order).await.unwrap();
    fund(&ledger, "carla", 25_50).await;

    let replayed = ledger.reconcile("carla").await.unwrap();
    assert_eq!(replayed, ledger.balance("carla").await.unwrap());
    assert_eq!(replayed, MoneyCents::new(215_50));
}

#[tokio::test]
async fn failed_order_leaves_no_rows() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 10_00).await;
    let student = linked_student(&ledger, "carla").await;

    let pasta = MenuItem::new(
        "Pasta al forno".to_string(),
        MoneyCents::new(75_00),
        Category::Main,
        None,
    )
    .unwrap();
    ledger.add_menu_item(&pasta).await.unwrap();

    let err = ledger
        .place_order("carla", student.id, &[(pasta.id, 1)], false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));

    assert!(ledger.list_orders(Some("carla"), None).await.unwrap().is_empty());
    assert_eq!(ledger.balance("carla").await.unwrap(), MoneyCents::new(10_00));
}

#[tokio::test]
async fn order_lines_snapshot_menu_prices() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 100_00).await;
    let student = linked_student(&ledger, "carla").await;

    let succo = MenuItem::new(
        "Succo di pera".to_string(),
        MoneyCents::new(2_50),
        Category::Drink,
        Some(10),
    )
    .unwrap();
    ledger.add_menu_item(&succo).await.unwrap();

    let (order, _) = ledger
        .place_order("carla", student.id, &[(succo.id, 4)], false, None)
        .await
        .unwrap();
    assert_eq!(order.total, MoneyCents::new(10_00));

    // Stock is decremented, price snapshot survives a later menu edit.
    let item = ledger.menu_item(succo.id).await.unwrap();
    assert_eq!(item.stock, Some(6));

    ledger
        .update_menu_item(succo.id, Some(MoneyCents::new(9_99)), None, None)
        .await
        .unwrap();
    let stored = ledger.order(order.id).await.unwrap();
    assert_eq!(stored.total, MoneyCents::new(10_00));
    assert_eq!(stored.items[0].price, MoneyCents::new(2_50));
}

#[tokio::test]
async fn status_machine_is_enforced_on_stored_orders() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 100_00).await;
    let student = linked_student(&ledger, "carla").await;

    let pasta = MenuItem::new(
        "Minestrone".to_string(),
        MoneyCents::new(3_80),
        Category::Main,
        None,
    )
    .unwrap();
    ledger.add_menu_item(&pasta).await.unwrap();

    let (order, _) = ledger
        .place_order("carla", student.id, &[(pasta.id, 1)], false, None)
        .await
        .unwrap();

    let err = ledger
        .update_order_status(order.id, OrderStatus::Ready)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition(_)));

    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ] {
        ledger.update_order_status(order.id, next).await.unwrap();
    }

    let done = ledger.order(order.id).await.unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    assert!(done.completed_at.is_some());

    let err = ledger
        .update_order_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition(_)));
}

#[tokio::test]
async fn unavailable_items_cannot_be_ordered() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    fund(&ledger, "carla", 100_00).await;
    let student = linked_student(&ledger, "carla").await;

    let torta = MenuItem::new(
        "Torta di mele".to_string(),
        MoneyCents::new(3_00),
        Category::Dessert,
        None,
    )
    .unwrap();
    ledger.add_menu_item(&torta).await.unwrap();
    ledger
        .update_menu_item(torta.id, None, Some(false), None)
        .await
        .unwrap();

    let err = ledger
        .place_order("carla", student.id, &[(torta.id, 1)], false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
}

#[tokio::test]
async fn students_link_to_at_most_one_parent() {
    let ledger = ledger_with_db().await;
    ledger.create_parent("carla").await.unwrap();
    ledger.create_parent("dario").await.unwrap();

    let student = Student::new("Marco".to_string(), "1A".to_string(), None);
    ledger.add_student(&student).await.unwrap();

    ledger.link_student(student.id, Some("carla")).await.unwrap();
    assert_eq!(ledger.parent("carla").await.unwrap().children.len(), 1);

    // Relinking replaces the previous link.
    ledger.link_student(student.id, Some("dario")).await.unwrap();
    assert!(ledger.parent("carla").await.unwrap().children.is_empty());
    assert_eq!(ledger.parent("dario").await.unwrap().children.len(), 1);
}
