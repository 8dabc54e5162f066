mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use uuid::Uuid;
use workshop_api::entities::{customer, invoice, order};

#[tokio::test]
async fn search_requires_branch_scope() {
    let app = TestApp::new().await;
    let response = app
        .request_unscoped(Method::GET, "/api/v1/orders/started?plate=T%20290")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn search_with_blank_plate_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/orders/started?plate=", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_with_no_matches_is_an_empty_success() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/orders/started?plate=T%20123", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["orders"].as_array().map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn scenario_exact_match_links_the_started_order() {
    let app = TestApp::new().await;

    // vehicle arrives, order opens with just the plate
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "plate_number": "T 290" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let opened = body_json(response).await;
    let order_id = opened["id"].as_str().expect("order id").to_string();
    let started_at = opened["started_at"].clone();

    // invoice form searches by plate; normalization makes "t_290" match
    let response = app
        .request(Method::GET, "/api/v1/orders/started?plate=t_290", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["orders"][0]["id"], order_id.as_str());
    assert_eq!(body["orders"][0]["plate_number"], "T 290");
    assert_eq!(body["orders"][0]["status"], "created");
    assert!(body["orders"][0]["customer"].is_null());

    // the user picks the candidate and submits the invoice
    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "selected_order_id": order_id,
                "customer": { "full_name": "Asha Mrema", "phone": "0712000001" },
                "subtotal": "100.00",
                "tax_amount": "18.00"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["linked_existing_order"], true);
    assert_eq!(body["order_id"], order_id.as_str());
    let total: Decimal = body["invoice"]["total_amount"]
        .as_str()
        .expect("total as string")
        .parse()
        .expect("parse total");
    assert_eq!(total, dec!(118));

    // one customer, one order, one invoice; started_at untouched
    let db = &*app.state.db;
    assert_eq!(customer::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(order::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(invoice::Entity::find().count(db).await.unwrap(), 1);

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    let final_order = body_json(response).await;
    assert_eq!(final_order["status"], "invoiced");
    assert_eq!(final_order["started_at"], started_at);
}

#[tokio::test]
async fn scenario_no_match_creates_a_fresh_order() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/orders/started?plate=T%20123", None)
        .await;
    assert_eq!(body_json(response).await["count"], 0);

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "plate_number": "T 123",
                "customer": { "full_name": "Juma Khalfan", "phone": "0713000002" },
                "order_description": "Tire change"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["linked_existing_order"], false);

    let db = &*app.state.db;
    assert_eq!(order::Entity::find().count(db).await.unwrap(), 1);
    assert_eq!(invoice::Entity::find().count(db).await.unwrap(), 1);
}

#[tokio::test]
async fn scenario_multiple_orders_links_only_the_selected_one() {
    let app = TestApp::new().await;

    let first = body_json(
        app.request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "plate_number": "T 290" })),
        )
        .await,
    )
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = body_json(
        app.request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "plate_number": "T 290" })),
        )
        .await,
    )
    .await;

    let response = app
        .request(Method::GET, "/api/v1/orders/started?plate=T%20290", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    // newest first
    assert_eq!(body["orders"][0]["id"], second["id"]);
    assert_eq!(body["orders"][1]["id"], first["id"]);

    // the user explicitly picks the older order
    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "selected_order_id": first["id"],
                "customer": { "full_name": "Asha Mrema", "phone": "0712000001" }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // the other order is still a candidate
    let response = app
        .request(Method::GET, "/api/v1/orders/started?plate=T%20290", None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["orders"][0]["id"], second["id"]);
}

#[tokio::test]
async fn auto_link_uses_the_only_candidate() {
    let app = TestApp::new().await;

    let opened = body_json(
        app.request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "plate_number": "T 400" })),
        )
        .await,
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "plate_number": "t_400",
                "link_by_plate": true,
                "customer": { "full_name": "Asha Mrema", "phone": "0712000001" }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["linked_existing_order"], true);
    assert_eq!(body["order_id"], opened["id"]);

    let db = &*app.state.db;
    assert_eq!(order::Entity::find().count(db).await.unwrap(), 1);
}

#[tokio::test]
async fn ambiguous_auto_link_demands_an_explicit_selection() {
    let app = TestApp::new().await;

    for _ in 0..2 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(json!({ "plate_number": "T 401" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    // two candidates match the plate: auto-link must refuse to guess
    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "plate_number": "T 401",
                "link_by_plate": true,
                "customer": { "full_name": "Asha Mrema", "phone": "0712000001" }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // nothing was written and both orders are still open candidates
    let db = &*app.state.db;
    assert_eq!(invoice::Entity::find().count(db).await.unwrap(), 0);
    let response = app
        .request(Method::GET, "/api/v1/orders/started?plate=T%20401", None)
        .await;
    assert_eq!(body_json(response).await["count"], 2);
}

#[tokio::test]
async fn plate_alone_resolves_the_vehicle_owner_as_customer() {
    let app = TestApp::new().await;

    // first visit registers the customer and their vehicle
    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "plate_number": "T 600",
                "customer": { "full_name": "Neema Said", "phone": "0714000003" }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = body_json(response).await;

    // next visit submits only the plate; the owner is found through it
    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({ "plate_number": "T 600" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second = body_json(response).await;
    assert_eq!(
        second["invoice"]["customer_id"],
        first["invoice"]["customer_id"]
    );

    let db = &*app.state.db;
    assert_eq!(customer::Entity::find().count(db).await.unwrap(), 1);
}

#[tokio::test]
async fn stale_selection_is_a_conflict_not_a_silent_fallback() {
    let app = TestApp::new().await;

    let opened = body_json(
        app.request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({ "plate_number": "T 290" })),
        )
        .await,
    )
    .await;

    let submit = json!({
        "selected_order_id": opened["id"],
        "customer": { "full_name": "Asha Mrema", "phone": "0712000001" }
    });

    let response = app
        .request(Method::POST, "/api/v1/invoices", Some(submit.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // the dropdown was stale: the order is no longer in created status
    let response = app
        .request(Method::POST, "/api/v1/invoices", Some(submit))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let db = &*app.state.db;
    assert_eq!(invoice::Entity::find().count(db).await.unwrap(), 1);
}

#[tokio::test]
async fn selecting_an_unknown_order_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "selected_order_id": Uuid::new_v4(),
                "customer": { "full_name": "Asha Mrema", "phone": "0712000001" }
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // rejected before any write happened
    let db = &*app.state.db;
    assert_eq!(invoice::Entity::find().count(db).await.unwrap(), 0);
    assert_eq!(customer::Entity::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn invoice_without_any_customer_data_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/invoices", Some(json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn orders_in_another_branch_are_invisible() {
    let app = TestApp::new().await;
    let other_branch = Uuid::new_v4();

    app.request(
        Method::POST,
        "/api/v1/orders",
        Some(json!({ "plate_number": "T 290" })),
    )
    .await;

    let response = app
        .request_for_branch(
            other_branch,
            Method::GET,
            "/api/v1/orders/started?plate=T%20290",
            None,
        )
        .await;
    assert_eq!(body_json(response).await["count"], 0);
}

#[tokio::test]
async fn draft_invoices_can_be_issued_then_not_reissued() {
    let app = TestApp::new().await;

    let created = body_json(
        app.request(
            Method::POST,
            "/api/v1/invoices",
            Some(json!({
                "plate_number": "T 555",
                "customer": { "full_name": "Neema Said", "phone": "0714000003" }
            })),
        )
        .await,
    )
    .await;
    let invoice_id = created["invoice"]["id"].as_str().expect("invoice id");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/issue", invoice_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "issued");

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/invoices/{}/issue", invoice_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
