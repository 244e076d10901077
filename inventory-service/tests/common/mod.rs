#![allow(dead_code)]

use std::sync::{Arc, Once};

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bigdecimal::BigDecimal;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use http_body_util::BodyExt;
use inventory_service::api::{self, AppState};
use inventory_service::auth::jwt::{issue_token, JwtConfig};
use inventory_service::config::Settings;
use inventory_service::db::{self, DbPool};
use inventory_service::models::{NewUser, Product, ProductRecord};
use inventory_service::schema::{products, users};
use serde_json::Value;
use shared::stock::{OverdrawPolicy, DEFAULT_REORDER_LEVEL};
use shared::Role;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

static MIGRATIONS: Once = Once::new();

pub fn settings(policy: OverdrawPolicy) -> Settings {
    Settings {
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            expiry_mins: 5,
        },
        reorder_level: DEFAULT_REORDER_LEVEL,
        overdraw_policy: policy,
    }
}

/// Router over a pool that never connects. Only requests rejected before
/// any store access can be exercised with it.
pub fn offline_app() -> Router {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(
        "postgres://nobody@127.0.0.1:1/none",
    );
    let pool = Pool::builder().build_unchecked(manager);
    api::create_router(AppState {
        pool,
        settings: Arc::new(settings(OverdrawPolicy::Clamp)),
    })
}

/// `None` when `TEST_DATABASE_URL` is unset; callers skip.
pub async fn test_pool() -> Option<DbPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    MIGRATIONS.call_once(|| {
        db::run_migrations(&url).expect("migrations should apply");
    });
    Some(db::connect(&url, 8).await.expect("pool should build"))
}

pub fn app(pool: DbPool, policy: OverdrawPolicy) -> Router {
    api::create_router(AppState {
        pool,
        settings: Arc::new(settings(policy)),
    })
}

pub fn token(user_id: i32, role: Role) -> String {
    let config = settings(OverdrawPolicy::Clamp).jwt;
    issue_token(user_id, role, &config).unwrap()
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn insert_product(conn: &mut AsyncPgConnection, name: &str, stock_quantity: i32) -> Product {
    diesel::insert_into(products::table)
        .values(&ProductRecord {
            name: name.to_string(),
            description: None,
            price: BigDecimal::from(2),
            stock_quantity,
            category_id: None,
            reorder_level: None,
        })
        .get_result::<Product>(conn)
        .await
        .unwrap()
}

/// A user row to act as the author of ledger writes.
pub async fn insert_user(conn: &mut AsyncPgConnection, role: Role) -> i32 {
    diesel::insert_into(users::table)
        .values(&NewUser {
            username: "fixture".to_string(),
            email: format!("{}@fixture.test", Uuid::new_v4()),
            password_hash: "unused".to_string(),
            role: role.as_str().to_string(),
        })
        .returning(users::user_id)
        .get_result(conn)
        .await
        .unwrap()
}
