//! HTTP round trips against a real database. Set `TEST_DATABASE_URL` to run.

mod common;

use std::str::FromStr;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use http_body_util::BodyExt;
use inventory_service::models::Product;
use inventory_service::schema::{products, stock_transactions};
use serde_json::json;
use shared::stock::OverdrawPolicy;
use shared::Role;
use tower::ServiceExt;
use uuid::Uuid;

use common::{app, insert_product, insert_user, send, test_pool, token};

async fn load_product(conn: &mut AsyncPgConnection, id: i32) -> Product {
    products::table
        .find(id)
        .select(Product::as_select())
        .first(conn)
        .await
        .unwrap()
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let Some(pool) = test_pool().await else { return };
    let admin = token(1, Role::Admin);

    let (status, category) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/categories",
        Some(&admin),
        Some(json!({ "name": format!("cat-{}", Uuid::new_v4()) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["category_id"].as_i64().unwrap();

    let (status, _) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/products",
        Some(&admin),
        Some(json!({ "name": "categorised", "category_id": category_id, "price": "4.50" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/categories/{category_id}");
    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::DELETE,
        &uri,
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "IN_USE");
    assert_eq!(
        json["error"],
        "Cannot delete category. It is being used by products."
    );
}

#[tokio::test]
async fn product_with_orders_cannot_be_deleted() {
    let Some(pool) = test_pool().await else { return };
    let admin = token(1, Role::Admin);
    let product = {
        let mut conn = pool.get().await.unwrap();
        insert_product(&mut conn, "ordered", 3).await
    };

    let (status, supplier) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/suppliers",
        Some(&admin),
        Some(json!({ "name": "Acme Fasteners", "contact_email": "sales@acme.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/orders",
        Some(&admin),
        Some(json!({
            "product_id": product.product_id,
            "supplier_id": supplier["supplier_id"],
            "quantity_ordered": 4
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["order"]["status"], "PENDING");

    let uri = format!("/products?id={}", product.product_id);
    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::DELETE,
        &uri,
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "IN_USE");

    let (status, _) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::DELETE,
        "/products?id=-1",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_for_missing_product_is_a_validation_error() {
    let Some(pool) = test_pool().await else { return };
    let admin = token(1, Role::Admin);

    let (status, json) = send(
        app(pool, OverdrawPolicy::Clamp),
        Method::POST,
        "/orders",
        Some(&admin),
        Some(json!({ "product_id": -1, "supplier_id": -1, "quantity_ordered": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Product with ID -1 does not exist");
}

#[tokio::test]
async fn stock_override_replaces_every_field_and_writes_no_ledger_row() {
    let Some(pool) = test_pool().await else { return };
    let admin = token(1, Role::Admin);
    let product = {
        let mut conn = pool.get().await.unwrap();
        insert_product(&mut conn, "overridden", 3).await
    };

    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::PUT,
        "/stock",
        Some(&admin),
        Some(json!({
            "id": product.product_id,
            "name": "overridden",
            "description": "zinc plated",
            "price": "9.75",
            "stock_quantity": 40,
            "reorder_level": 15
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["product"]["stock_quantity"], 40);

    let mut conn = pool.get().await.unwrap();
    let stored = load_product(&mut conn, product.product_id).await;
    assert_eq!(stored.price, BigDecimal::from_str("9.75").unwrap());
    assert_eq!(stored.stock_quantity, 40);
    assert_eq!(stored.reorder_level, Some(15));
    assert_eq!(stored.description.as_deref(), Some("zinc plated"));

    let rows: i64 = stock_transactions::table
        .filter(stock_transactions::product_id.eq(product.product_id))
        .count()
        .get_result(&mut conn)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn partial_override_is_refused_and_changes_nothing() {
    let Some(pool) = test_pool().await else { return };
    let admin = token(1, Role::Admin);
    let product = {
        let mut conn = pool.get().await.unwrap();
        insert_product(&mut conn, "untouched", 3).await
    };

    let bodies = [
        json!({ "id": product.product_id, "name": "renamed", "stock_quantity": 40 }),
        json!({ "id": product.product_id, "name": "renamed", "price": "1.00" }),
    ];
    for body in bodies {
        let (status, json) = send(
            app(pool.clone(), OverdrawPolicy::Clamp),
            Method::PUT,
            "/stock",
            Some(&admin),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    let mut conn = pool.get().await.unwrap();
    let stored = load_product(&mut conn, product.product_id).await;
    assert_eq!(stored.name, "untouched");
    assert_eq!(stored.price, BigDecimal::from(2));
    assert_eq!(stored.stock_quantity, 3);
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let admin = token(1, Role::Admin);
    let product = {
        let mut conn = pool.get().await.unwrap();
        insert_product(&mut conn, "uncategorised", 3).await
    };

    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/products",
        Some(&admin),
        Some(json!({ "name": "orphan", "category_id": -7 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Category -7 not found");

    let uri = format!("/products?id={}", product.product_id);
    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({
            "name": "uncategorised",
            "price": "2.00",
            "stock_quantity": 3,
            "category_id": -7
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Category -7 not found");
}

#[tokio::test]
async fn movement_by_a_deleted_user_is_not_found() {
    let Some(pool) = test_pool().await else { return };
    let product = {
        let mut conn = pool.get().await.unwrap();
        insert_product(&mut conn, "ghost-moved", 3).await
    };

    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/transactions",
        Some(&token(-3, Role::Staff)),
        Some(json!({ "product_id": product.product_id, "transaction_type": "IN", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "User -3 not found");

    let mut conn = pool.get().await.unwrap();
    assert_eq!(load_product(&mut conn, product.product_id).await.stock_quantity, 3);
}

#[tokio::test]
async fn reject_policy_surfaces_as_conflict() {
    let Some(pool) = test_pool().await else { return };
    let (staff, product) = {
        let mut conn = pool.get().await.unwrap();
        let user_id = insert_user(&mut conn, Role::Staff).await;
        let product = insert_product(&mut conn, "scarce", 1).await;
        (token(user_id, Role::Staff), product)
    };

    let (status, json) = send(
        app(pool, OverdrawPolicy::Reject),
        Method::POST,
        "/transactions",
        Some(&staff),
        Some(json!({ "product_id": product.product_id, "transaction_type": "OUT", "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn signup_then_login() {
    let Some(pool) = test_pool().await else { return };
    let email = format!("{}@example.com", Uuid::new_v4());
    let signup = json!({
        "username": "lee",
        "email": email,
        "password": "correct-horse",
        "role": "staff"
    });

    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/auth/signup",
        None,
        Some(signup.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["user"].get("password_hash").is_none());

    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/auth/signup",
        None,
        Some(signup),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");

    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": "wrong-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid credentials");

    let (status, json) = send(
        app(pool.clone(), OverdrawPolicy::Clamp),
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["role"], "staff");

    let token = json["token"].as_str().unwrap().to_string();
    let (status, _) = send(
        app(pool, OverdrawPolicy::Clamp),
        Method::GET,
        "/transactions",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stock_export_is_a_csv_attachment() {
    let Some(pool) = test_pool().await else { return };
    let staff = token(2, Role::Staff);
    {
        let mut conn = pool.get().await.unwrap();
        insert_product(&mut conn, "exported", 0).await;
    }

    let request = Request::get("/stock/export/low-stock?search=exported")
        .header("authorization", format!("Bearer {staff}"))
        .body(Body::empty())
        .unwrap();
    let response = app(pool, OverdrawPolicy::Clamp).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with('\u{feff}'));
    assert!(text.contains("exported"));
}

#[tokio::test]
async fn movement_is_attributed_to_the_caller() {
    let Some(pool) = test_pool().await else { return };
    let (user_id, product) = {
        let mut conn = pool.get().await.unwrap();
        let user_id = insert_user(&mut conn, Role::Staff).await;
        (user_id, insert_product(&mut conn, "attributed", 2).await)
    };

    let (status, json) = send(
        app(pool, OverdrawPolicy::Clamp),
        Method::POST,
        "/transactions",
        Some(&token(user_id, Role::Staff)),
        Some(json!({
            "product_id": product.product_id,
            "transaction_type": "IN",
            "quantity": 3,
            "user_id": user_id + 1000
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["transaction"]["user_id"], user_id);
    assert_eq!(json["updated_product"]["stock_quantity"], 5);
}
