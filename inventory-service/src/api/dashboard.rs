//! Dashboard statistics. Each endpoint loads a snapshot and runs the pure
//! reducers from `shared::report` over it.

use std::str::FromStr;

use axum::extract::State;
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use shared::report::{
    daily_order_trends, most_common_category, status_distribution, stock_by_category,
    stock_distribution, CategoryStock, DailyOrders, LevelBucket, OrderSummary, StatusCount,
    StockSummary, TransactionSummary,
};
use shared::TransactionType;

use crate::api::orders::load_lines;
use crate::api::stock::load_items;
use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::Product;
use crate::schema::{products, stock_transactions, suppliers};

const RECENT_PRODUCTS: i64 = 5;
const ORDER_TREND_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
pub struct Overview {
    pub total_products: usize,
    pub total_suppliers: i64,
    pub total_stock: i64,
    /// Products that are low or out of stock.
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub total_value: BigDecimal,
    pub health_score: Option<u32>,
    pub most_common_category: Option<String>,
    pub recent_products: Vec<Product>,
    pub transactions: TransactionSummary,
}

#[derive(Debug, Serialize)]
pub struct StockTrends {
    pub summary: StockSummary,
    pub distribution: Vec<LevelBucket>,
    pub by_category: Vec<CategoryStock>,
}

#[derive(Debug, Serialize)]
pub struct OrderTrends {
    pub summary: OrderSummary,
    pub daily: Vec<DailyOrders>,
    pub status_distribution: Vec<StatusCount>,
}

pub async fn overview(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Overview>> {
    let mut conn = state.pool.get().await?;

    let items = load_items(&mut conn, state.settings.reorder_level).await?;
    let summary = StockSummary::from_items(&items);

    let total_suppliers: i64 = suppliers::table.count().get_result(&mut conn).await?;

    let recent_products = products::table
        .select(Product::as_select())
        .order(products::product_id.desc())
        .limit(RECENT_PRODUCTS)
        .load(&mut conn)
        .await?;

    let transactions = transaction_summary(&mut conn).await?;

    Ok(Json(Overview {
        total_products: summary.total_products,
        total_suppliers,
        total_stock: summary.total_quantity,
        low_stock_items: summary.low_stock + summary.out_of_stock,
        out_of_stock_items: summary.out_of_stock,
        total_value: summary.total_value,
        health_score: summary.health_score,
        most_common_category: most_common_category(&items),
        recent_products,
        transactions,
    }))
}

pub async fn stock_trends(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<StockTrends>> {
    let mut conn = state.pool.get().await?;
    let items = load_items(&mut conn, state.settings.reorder_level).await?;

    Ok(Json(StockTrends {
        summary: StockSummary::from_items(&items),
        distribution: stock_distribution(&items),
        by_category: stock_by_category(&items),
    }))
}

pub async fn order_trends(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<OrderTrends>> {
    let mut conn = state.pool.get().await?;
    let lines = load_lines(&mut conn).await?;

    Ok(Json(OrderTrends {
        summary: OrderSummary::from_lines(&lines),
        daily: daily_order_trends(&lines, Utc::now(), ORDER_TREND_DAYS),
        status_distribution: status_distribution(&lines),
    }))
}

async fn transaction_summary(conn: &mut AsyncPgConnection) -> AppResult<TransactionSummary> {
    let rows = stock_transactions::table
        .select((
            stock_transactions::transaction_type,
            stock_transactions::quantity,
        ))
        .load::<(String, i32)>(conn)
        .await?;

    let movements = rows
        .into_iter()
        .map(|(kind, quantity)| {
            TransactionType::from_str(&kind)
                .map(|kind| (kind, quantity))
                .map_err(|e| AppError::Internal(e.to_string()))
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(TransactionSummary::from_movements(movements))
}
