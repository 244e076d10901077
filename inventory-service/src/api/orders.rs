use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::report::OrderLine;
use shared::OrderStatus;
use tracing::info;

use crate::api::{AppJson, AppState};
use crate::auth::{AuthUser, RequireAdmin};
use crate::error::{AppError, AppResult};
use crate::models::{NewOrder, Order, OrderChanges};
use crate::schema::{orders, products, suppliers};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub quantity_ordered: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub order_id: Option<i32>,
    pub quantity_ordered: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub line: OrderLine,
    pub total_amount: BigDecimal,
}

impl From<OrderLine> for OrderView {
    fn from(line: OrderLine) -> Self {
        let total_amount = line.total_amount();
        OrderView { line, total_amount }
    }
}

type OrderRow = (
    Order,
    Option<String>,
    Option<BigDecimal>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Every order joined with its product and supplier, newest first. Unit
/// prices are the products' current prices.
pub(crate) async fn load_lines(conn: &mut AsyncPgConnection) -> AppResult<Vec<OrderLine>> {
    let rows = orders::table
        .left_join(products::table)
        .left_join(suppliers::table)
        .select((
            Order::as_select(),
            products::name.nullable(),
            products::price.nullable(),
            suppliers::name.nullable(),
            suppliers::contact_email.nullable(),
            suppliers::contact_phone.nullable(),
        ))
        .order((orders::order_date.desc(), orders::order_id.desc()))
        .load::<OrderRow>(conn)
        .await?;

    rows.into_iter().map(into_line).collect()
}

fn into_line(row: OrderRow) -> AppResult<OrderLine> {
    let (order, product_name, unit_price, supplier_name, contact_email, contact_phone) = row;
    let status = OrderStatus::from_str(&order.status)
        .map_err(|e| AppError::Internal(format!("order {}: {e}", order.order_id)))?;

    Ok(OrderLine {
        order_id: order.order_id,
        product_id: order.product_id,
        supplier_id: order.supplier_id,
        order_date: order.order_date,
        quantity_ordered: order.quantity_ordered,
        product_name,
        unit_price,
        supplier_name,
        contact_email,
        contact_phone,
        status,
    })
}

pub async fn list_orders(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<OrderView>>> {
    let mut conn = state.pool.get().await?;
    let lines = load_lines(&mut conn).await?;
    Ok(Json(lines.into_iter().map(OrderView::from).collect()))
}

pub async fn create_order(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (product_id, supplier_id, quantity_ordered) =
        match (request.product_id, request.supplier_id, request.quantity_ordered) {
            (Some(p), Some(s), Some(q)) => (p, s, q),
            _ => {
                return Err(AppError::Validation(
                    "product_id, supplier_id, and quantity_ordered are required".into(),
                ))
            }
        };
    let quantity_ordered = positive_quantity(quantity_ordered)?;
    let status = parse_status(request.status.as_deref())?.unwrap_or_default();

    let mut conn = state.pool.get().await?;

    let product_exists: Option<i32> = products::table
        .find(product_id)
        .select(products::product_id)
        .first(&mut conn)
        .await
        .optional()?;
    if product_exists.is_none() {
        return Err(AppError::Validation(format!(
            "Product with ID {product_id} does not exist"
        )));
    }

    let supplier_exists: Option<i32> = suppliers::table
        .find(supplier_id)
        .select(suppliers::supplier_id)
        .first(&mut conn)
        .await
        .optional()?;
    if supplier_exists.is_none() {
        return Err(AppError::Validation(format!(
            "Supplier with ID {supplier_id} does not exist"
        )));
    }

    let order = diesel::insert_into(orders::table)
        .values(&NewOrder {
            product_id,
            supplier_id,
            quantity_ordered,
            status: status.as_str().to_string(),
        })
        .returning(Order::as_returning())
        .get_result(&mut conn)
        .await?;

    info!(
        order_id = order.order_id,
        product_id,
        supplier_id,
        quantity_ordered,
        user_id = user.user_id,
        "Created purchase order"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Order created successfully",
            "order": order,
        })),
    ))
}

pub async fn update_order(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<UpdateOrderRequest>,
) -> AppResult<Json<Value>> {
    let order_id = request
        .order_id
        .ok_or_else(|| AppError::Validation("order_id is required".into()))?;

    let changes = OrderChanges {
        quantity_ordered: request.quantity_ordered.map(positive_quantity).transpose()?,
        status: parse_status(request.status.as_deref())?.map(|s| s.as_str().to_string()),
    };
    if changes.quantity_ordered.is_none() && changes.status.is_none() {
        return Err(AppError::Validation(
            "quantity_ordered or status is required".into(),
        ));
    }

    let mut conn = state.pool.get().await?;
    let order = diesel::update(orders::table.find(order_id))
        .set(&changes)
        .returning(Order::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    info!(
        order_id,
        status = %order.status,
        quantity_ordered = order.quantity_ordered,
        user_id = user.user_id,
        "Updated purchase order"
    );

    Ok(Json(json!({
        "success": true,
        "message": "Order updated successfully",
        "order": order,
    })))
}

fn positive_quantity(quantity: i32) -> AppResult<i32> {
    if quantity <= 0 {
        return Err(AppError::Validation(
            "quantity_ordered must be a positive integer".into(),
        ));
    }
    Ok(quantity)
}

fn parse_status(raw: Option<&str>) -> AppResult<Option<OrderStatus>> {
    raw.map(|s| {
        OrderStatus::from_str(&s.trim().to_ascii_uppercase())
            .map_err(|e| AppError::Validation(e.to_string()))
    })
    .transpose()
}
