use std::str::FromStr;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::stock::transaction_code;
use shared::TransactionType;

use crate::api::{optional, AppJson, AppState};
use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::ledger::{self, Movement};
use crate::models::StockTransaction;
use crate::schema::{products, stock_transactions, users};

const RECENT_LIMIT: i64 = 100;
const SYSTEM_USER: &str = "System User";

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(alias = "productId")]
    pub product_id: Option<i32>,
    #[serde(alias = "transactionType")]
    pub transaction_type: Option<String>,
    pub quantity: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub id: String,
    pub transaction_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub transaction_type: String,
    pub quantity: i32,
    pub note: Option<String>,
    pub date: DateTime<Utc>,
    pub user: String,
}

impl CreateTransactionRequest {
    /// The acting user always comes from the token, never from the body.
    fn into_movement(self, user_id: i32) -> AppResult<Movement> {
        let (product_id, raw_type, quantity) =
            match (self.product_id, self.transaction_type, self.quantity) {
                (Some(p), Some(t), Some(q)) => (p, t, q),
                _ => {
                    return Err(AppError::Validation(
                        "product_id, transaction_type, and quantity are required".into(),
                    ))
                }
            };
        let kind = TransactionType::from_str(&raw_type.trim().to_ascii_uppercase())
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let movement = Movement {
            product_id,
            kind,
            quantity,
            note: optional(self.note),
            user_id: Some(user_id),
        };
        movement.validate()?;
        Ok(movement)
    }
}

/// The most recent ledger rows, newest first.
pub async fn list_transactions(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TransactionView>>> {
    let mut conn = state.pool.get().await?;

    let rows = stock_transactions::table
        .inner_join(products::table)
        .left_join(users::table)
        .select((
            StockTransaction::as_select(),
            products::name,
            users::username.nullable(),
        ))
        .order((
            stock_transactions::transaction_date.desc(),
            stock_transactions::transaction_id.desc(),
        ))
        .limit(RECENT_LIMIT)
        .load::<(StockTransaction, String, Option<String>)>(&mut conn)
        .await?;

    let views = rows
        .into_iter()
        .map(|(tx, product_name, username)| TransactionView {
            id: transaction_code(tx.transaction_id),
            transaction_id: tx.transaction_id,
            product_id: tx.product_id,
            product_name,
            transaction_type: tx.transaction_type,
            quantity: tx.quantity,
            note: tx.note,
            date: tx.transaction_date,
            user: username.unwrap_or_else(|| SYSTEM_USER.to_string()),
        })
        .collect();

    Ok(Json(views))
}

pub async fn create_transaction(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateTransactionRequest>,
) -> AppResult<Json<Value>> {
    let movement = request.into_movement(user.user_id)?;

    let mut conn = state.pool.get().await?;
    let entry = ledger::record(&mut conn, movement, state.settings.overdraw_policy).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Stock transaction completed successfully",
        "transaction": entry.transaction,
        "updated_product": entry.product,
    })))
}
