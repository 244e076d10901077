use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::export::{self, ExportError};
use shared::report::{StockFilter, StockItem, UNCATEGORIZED};
use shared::stock::{classify, effective_reorder_level, product_code};

use crate::api::products::{overwrite_product, ProductOverwrite};
use crate::api::{AppJson, AppState};
use crate::auth::{AuthUser, RequireAdmin};
use crate::error::{AppError, AppResult};
use crate::models::Product;
use crate::schema::{categories, products};

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Deserialize)]
pub struct StockOverride {
    pub id: Option<i32>,
    #[serde(flatten)]
    pub product: ProductOverwrite,
}

/// Every product projected onto the stock screen, ordered by name.
pub(crate) async fn load_items(
    conn: &mut AsyncPgConnection,
    default_reorder_level: i32,
) -> AppResult<Vec<StockItem>> {
    let rows = products::table
        .left_join(categories::table)
        .select((Product::as_select(), categories::category_name.nullable()))
        .order((products::name.asc(), products::product_id.asc()))
        .load::<(Product, Option<String>)>(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(product, category)| project(product, category, default_reorder_level))
        .collect())
}

fn project(product: Product, category: Option<String>, default_reorder_level: i32) -> StockItem {
    let reorder_level = effective_reorder_level(product.reorder_level, default_reorder_level);
    StockItem {
        id: product.product_id,
        code: product_code(product.product_id),
        name: product.name,
        description: product.description.unwrap_or_default(),
        category: category.unwrap_or_else(|| UNCATEGORIZED.to_string()),
        category_id: product.category_id,
        unit_price: product.price,
        current_stock: product.stock_quantity,
        reorder_level,
        status: classify(product.stock_quantity, reorder_level),
        last_updated: product.updated_at,
    }
}

pub async fn list_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> AppResult<Json<Vec<StockItem>>> {
    let mut conn = state.pool.get().await?;
    let items = load_items(&mut conn, state.settings.reorder_level).await?;
    Ok(Json(filter.apply(items)))
}

/// Administrative override of a product, stock quantity included.
pub async fn override_stock(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<StockOverride>,
) -> AppResult<Json<Value>> {
    let id = request
        .id
        .ok_or_else(|| AppError::Validation("id is required".into()))?;
    let record = request.product.into_record()?;

    let mut conn = state.pool.get().await?;
    let product = overwrite_product(&mut conn, id, &record, user.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Product updated successfully",
        "product": product,
    })))
}

pub async fn export_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.pool.get().await?;
    let items = filter.apply(load_items(&mut conn, state.settings.reorder_level).await?);
    let now = Utc::now();
    let body = export::stock_report(&items, now).map_err(export_failed)?;
    Ok(csv_attachment("stock_report", now, body))
}

pub async fn export_low_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<StockFilter>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.pool.get().await?;
    let items = filter.apply(load_items(&mut conn, state.settings.reorder_level).await?);
    let now = Utc::now();
    let body = export::low_stock_alert(&items, now).map_err(export_failed)?;
    Ok(csv_attachment("low_stock_alert", now, body))
}

fn csv_attachment(prefix: &str, generated_at: DateTime<Utc>, csv: Vec<u8>) -> impl IntoResponse {
    let filename = format!("{prefix}_{}.csv", generated_at.format("%Y-%m-%d_%H-%M-%S"));
    let mut body = Vec::with_capacity(UTF8_BOM.len() + csv.len());
    body.extend_from_slice(UTF8_BOM.as_bytes());
    body.extend_from_slice(&csv);

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

fn export_failed(err: ExportError) -> AppError {
    AppError::Internal(format!("CSV export failed: {err}"))
}
