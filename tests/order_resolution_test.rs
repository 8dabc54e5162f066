mod common;

use common::TestApp;
use sea_orm::{EntityTrait, PaginatorTrait, TransactionTrait};
use uuid::Uuid;
use workshop_api::{
    entities::{customer, invoice, order},
    errors::ServiceError,
    services::{customers::CustomerDetails, invoices::CreateInvoiceRequest, orders::OpenOrderRequest},
};

fn open_request(plate: &str) -> OpenOrderRequest {
    OpenOrderRequest {
        plate_number: plate.to_string(),
        order_type: None,
        description: None,
        estimated_duration: None,
    }
}

fn walk_in_customer(name: &str, phone: &str) -> CustomerDetails {
    CustomerDetails {
        full_name: name.to_string(),
        phone: phone.to_string(),
        email: None,
        address: None,
    }
}

#[tokio::test]
async fn lookup_with_no_started_orders_is_empty() {
    let app = TestApp::new().await;

    let found = app
        .state
        .orders
        .find_all_started_orders_for_plate(app.branch_id, "T 123")
        .await
        .expect("lookup");
    assert!(found.is_empty());

    let one = app
        .state
        .orders
        .find_started_order_by_plate(app.branch_id, "T 123")
        .await
        .expect("lookup");
    assert!(one.is_none());
}

#[tokio::test]
async fn candidates_come_back_newest_first() {
    let app = TestApp::new().await;

    let first = app
        .state
        .orders
        .open_order(app.branch_id, open_request("T 290"))
        .await
        .expect("open first order");
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = app
        .state
        .orders
        .open_order(app.branch_id, open_request("T 290"))
        .await
        .expect("open second order");

    let found = app
        .state
        .orders
        .find_all_started_orders_for_plate(app.branch_id, "T 290")
        .await
        .expect("lookup");

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].id, second.id);
    assert_eq!(found[1].id, first.id);

    let newest = app
        .state
        .orders
        .find_started_order_by_plate(app.branch_id, "T 290")
        .await
        .expect("lookup")
        .expect("one candidate");
    assert_eq!(newest.id, second.id);
}

#[tokio::test]
async fn plate_spellings_normalize_to_the_same_order() {
    let app = TestApp::new().await;

    let opened = app
        .state
        .orders
        .open_order(app.branch_id, open_request("t_290"))
        .await
        .expect("open order");
    assert_eq!(opened.plate_number, "T 290");

    for spelling in ["T 290", "t_290", " T  290 "] {
        let found = app
            .state
            .orders
            .find_all_started_orders_for_plate(app.branch_id, spelling)
            .await
            .expect("lookup");
        assert_eq!(found.len(), 1, "spelling {:?} should match", spelling);
    }
}

#[tokio::test]
async fn lookups_are_branch_scoped() {
    let app = TestApp::new().await;
    let other_branch = Uuid::new_v4();

    app.state
        .orders
        .open_order(app.branch_id, open_request("T 290"))
        .await
        .expect("open order");

    let found = app
        .state
        .orders
        .find_all_started_orders_for_plate(other_branch, "T 290")
        .await
        .expect("lookup");
    assert!(found.is_empty());
}

#[tokio::test]
async fn finalize_preserves_started_at_and_order_number() {
    let app = TestApp::new().await;

    let opened = app
        .state
        .orders
        .open_order(app.branch_id, open_request("T 290"))
        .await
        .expect("open order");
    let before = app
        .state
        .orders
        .get_order(app.branch_id, opened.id)
        .await
        .expect("fetch order");

    let (customer, _) = app
        .state
        .customers
        .create_or_get_customer(app.branch_id, walk_in_customer("Asha Mrema", "0712000001"))
        .await
        .expect("create customer");

    let txn = app.state.db.begin().await.expect("begin txn");
    let finalized = app
        .state
        .orders
        .update_order_from_invoice(
            &txn,
            app.branch_id,
            opened.id,
            &customer,
            None,
            Some("Brake service".to_string()),
        )
        .await
        .expect("finalize order");
    txn.commit().await.expect("commit");

    assert_eq!(finalized.started_at, before.started_at);
    assert_eq!(finalized.order_number, before.order_number);
    assert_eq!(finalized.status, order::STATUS_INVOICED);
    assert_eq!(finalized.customer_id, Some(customer.id));
    assert_eq!(finalized.description.as_deref(), Some("Brake service"));
    assert!(finalized.finalized_at.is_some());
    assert_eq!(finalized.version, before.version + 1);

    // visit tracking rode the same transaction
    let customer_after = app
        .state
        .customers
        .get_customer(app.branch_id, customer.id)
        .await
        .expect("fetch customer");
    assert_eq!(customer_after.visit_count, customer.visit_count + 1);
    assert!(customer_after.last_visit_at.is_some());
}

#[tokio::test]
async fn visit_count_survives_a_stale_customer_snapshot() {
    let app = TestApp::new().await;

    let first = app
        .state
        .orders
        .open_order(app.branch_id, open_request("T 290"))
        .await
        .expect("open first order");
    let second = app
        .state
        .orders
        .open_order(app.branch_id, open_request("T 291"))
        .await
        .expect("open second order");

    let (customer, _) = app
        .state
        .customers
        .create_or_get_customer(app.branch_id, walk_in_customer("Asha Mrema", "0712000001"))
        .await
        .expect("create customer");

    // both finalizes carry the same pre-read customer model, the way two
    // overlapping invoice submissions would
    for order_id in [first.id, second.id] {
        let txn = app.state.db.begin().await.expect("begin txn");
        app.state
            .orders
            .update_order_from_invoice(&txn, app.branch_id, order_id, &customer, None, None)
            .await
            .expect("finalize order");
        txn.commit().await.expect("commit");
    }

    let customer_after = app
        .state
        .customers
        .get_customer(app.branch_id, customer.id)
        .await
        .expect("fetch customer");
    assert_eq!(customer_after.visit_count, customer.visit_count + 2);
}

#[tokio::test]
async fn second_finalize_attempt_is_rejected() {
    let app = TestApp::new().await;

    let opened = app
        .state
        .orders
        .open_order(app.branch_id, open_request("T 290"))
        .await
        .expect("open order");
    let (customer, _) = app
        .state
        .customers
        .create_or_get_customer(app.branch_id, walk_in_customer("Asha Mrema", "0712000001"))
        .await
        .expect("create customer");

    let txn = app.state.db.begin().await.expect("begin txn");
    app.state
        .orders
        .update_order_from_invoice(&txn, app.branch_id, opened.id, &customer, None, None)
        .await
        .expect("first finalize");
    txn.commit().await.expect("commit");

    let txn = app.state.db.begin().await.expect("begin txn");
    let second = app
        .state
        .orders
        .update_order_from_invoice(&txn, app.branch_id, opened.id, &customer, None, None)
        .await;
    txn.rollback().await.expect("rollback");

    assert!(matches!(second, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn linking_never_duplicates_orders_or_customers() {
    let app = TestApp::new().await;

    let opened = app
        .state
        .orders
        .open_order(app.branch_id, open_request("T 290"))
        .await
        .expect("open order");

    let orders_before = order::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count orders");
    let customers_before = customer::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count customers");
    let invoices_before = invoice::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count invoices");

    let request = CreateInvoiceRequest {
        selected_order_id: Some(opened.id),
        customer: Some(walk_in_customer("Asha Mrema", "0712000001")),
        ..Default::default()
    };
    let response = app
        .state
        .invoices
        .create_invoice(app.branch_id, request)
        .await
        .expect("create invoice");
    assert!(response.linked_existing_order);
    assert_eq!(response.order_id, opened.id);

    let orders_after = order::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count orders");
    let customers_after = customer::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count customers");
    let invoices_after = invoice::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count invoices");

    assert_eq!(orders_after, orders_before);
    assert_eq!(customers_after, customers_before + 1);
    assert_eq!(invoices_after, invoices_before + 1);
}

#[tokio::test]
async fn repeated_customer_submission_returns_the_same_row() {
    let app = TestApp::new().await;

    let (first, created_first) = app
        .state
        .customers
        .create_or_get_customer(app.branch_id, walk_in_customer("Asha Mrema", "0712 000 001"))
        .await
        .expect("first submission");
    assert!(created_first);

    let (second, created_second) = app
        .state
        .customers
        .create_or_get_customer(app.branch_id, walk_in_customer("Asha Mrema", "0712000001"))
        .await
        .expect("second submission");
    assert!(!created_second);
    assert_eq!(first.id, second.id);

    // same phone in another branch is a different customer
    let (other, created_other) = app
        .state
        .customers
        .create_or_get_customer(Uuid::new_v4(), walk_in_customer("Asha Mrema", "0712000001"))
        .await
        .expect("other branch submission");
    assert!(created_other);
    assert_ne!(first.id, other.id);
}
