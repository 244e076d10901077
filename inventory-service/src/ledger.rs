//! Ledger writer.
//!
//! A stock movement is one append to `stock_transactions` plus one relative
//! `UPDATE` of `products.stock_quantity`, committed or rolled back together.
//! The quantity is never read into the application and written back.

use diesel::dsl::now;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::Integer;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use shared::stock::OverdrawPolicy;
use shared::TransactionType;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{NewStockTransaction, Product, StockTransaction};
use crate::schema::{products, stock_transactions};

const PRODUCT_FK: &str = "stock_transactions_product_id_fkey";
const USER_FK: &str = "stock_transactions_user_id_fkey";

diesel::define_sql_function! {
    fn greatest(a: Integer, b: Integer) -> Integer;
}

#[derive(Debug, Clone)]
pub struct Movement {
    pub product_id: i32,
    pub kind: TransactionType,
    pub quantity: i32,
    pub note: Option<String>,
    pub user_id: Option<i32>,
}

/// The appended ledger row and the product as it stands after the movement.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub transaction: StockTransaction,
    pub product: Product,
}

impl Movement {
    /// Checks that need no store access.
    pub fn validate(&self) -> AppResult<()> {
        if self.quantity <= 0 {
            return Err(AppError::Validation(
                "quantity must be a positive integer".to_string(),
            ));
        }
        if self.kind == TransactionType::Adjustment {
            return Err(AppError::Validation(
                "transaction_type must be IN or OUT".to_string(),
            ));
        }
        Ok(())
    }
}

/// Record a movement and apply it to the product's stock counter atomically.
pub async fn record(
    conn: &mut AsyncPgConnection,
    movement: Movement,
    policy: OverdrawPolicy,
) -> AppResult<LedgerEntry> {
    movement.validate()?;

    let product_id = movement.product_id;
    let kind = movement.kind;
    let quantity = movement.quantity;
    let user_id = movement.user_id;

    let entry = conn
        .transaction::<_, AppError, _>(|conn| {
            Box::pin(async move {
                let new_transaction = NewStockTransaction {
                    product_id: movement.product_id,
                    transaction_type: movement.kind.as_str().to_string(),
                    quantity: movement.quantity,
                    note: movement.note,
                    user_id: movement.user_id,
                };

                let transaction = diesel::insert_into(stock_transactions::table)
                    .values(&new_transaction)
                    .get_result::<StockTransaction>(conn)
                    .await
                    .map_err(|e| insert_failed(e, product_id, user_id))?;

                let product = adjust_stock(conn, product_id, kind, quantity, policy).await?;

                Ok(LedgerEntry {
                    transaction,
                    product,
                })
            })
        })
        .await?;

    info!(
        product_id,
        transaction_id = entry.transaction.transaction_id,
        kind = %kind,
        quantity,
        stock_quantity = entry.product.stock_quantity,
        "Recorded stock movement"
    );

    Ok(entry)
}

/// One relative update of the counter, evaluated by the database.
async fn adjust_stock(
    conn: &mut AsyncPgConnection,
    product_id: i32,
    kind: TransactionType,
    quantity: i32,
    policy: OverdrawPolicy,
) -> AppResult<Product> {
    let target = products::table.filter(products::product_id.eq(product_id));

    let updated = match (kind, policy) {
        (TransactionType::In, _) => {
            diesel::update(target)
                .set((
                    products::stock_quantity.eq(products::stock_quantity + quantity),
                    products::updated_at.eq(now),
                ))
                .get_result::<Product>(conn)
                .await
                .optional()?
        }
        (TransactionType::Out, OverdrawPolicy::Clamp) => {
            diesel::update(target)
                .set((
                    products::stock_quantity.eq(greatest(0, products::stock_quantity - quantity)),
                    products::updated_at.eq(now),
                ))
                .get_result::<Product>(conn)
                .await
                .optional()?
        }
        (TransactionType::Out, OverdrawPolicy::Reject) => {
            diesel::update(target.filter(products::stock_quantity.ge(quantity)))
                .set((
                    products::stock_quantity.eq(products::stock_quantity - quantity),
                    products::updated_at.eq(now),
                ))
                .get_result::<Product>(conn)
                .await
                .optional()?
        }
        (TransactionType::Adjustment, _) => {
            return Err(AppError::Validation(
                "transaction_type must be IN or OUT".to_string(),
            ));
        }
    };

    match updated {
        Some(product) => Ok(product),
        None if kind == TransactionType::Out && policy == OverdrawPolicy::Reject => {
            let exists = products::table
                .find(product_id)
                .select(products::product_id)
                .first::<i32>(conn)
                .await
                .optional()?;
            match exists {
                Some(_) => Err(AppError::InsufficientStock {
                    product_id,
                    requested: quantity,
                }),
                None => Err(product_not_found(product_id)),
            }
        }
        None => Err(product_not_found(product_id)),
    }
}

fn product_not_found(product_id: i32) -> AppError {
    AppError::NotFound(format!("Product {} not found", product_id))
}

/// The ledger row points at a product or user that does not exist.
fn insert_failed(err: DieselError, product_id: i32, user_id: Option<i32>) -> AppError {
    match AppError::missing_reference(err, PRODUCT_FK, format!("Product {product_id} not found")) {
        AppError::Database(err) => AppError::missing_reference(
            err,
            USER_FK,
            format!("User {} not found", user_id.unwrap_or_default()),
        ),
        mapped => mapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(kind: TransactionType, quantity: i32) -> Movement {
        Movement {
            product_id: 1,
            kind,
            quantity,
            note: None,
            user_id: Some(7),
        }
    }

    #[test]
    fn positive_in_and_out_are_accepted() {
        assert!(movement(TransactionType::In, 1).validate().is_ok());
        assert!(movement(TransactionType::Out, 500).validate().is_ok());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for quantity in [0, -3] {
            let err = movement(TransactionType::In, quantity).validate().unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn adjustment_is_not_written_through_the_ledger() {
        let err = movement(TransactionType::Adjustment, 4).validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("IN or OUT")));
    }

    #[test]
    fn dangling_references_name_the_missing_row() {
        use crate::error::foreign_key_violation;

        let err = insert_failed(foreign_key_violation(PRODUCT_FK), 12, Some(7));
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Product 12 not found"));

        let err = insert_failed(foreign_key_violation(USER_FK), 12, Some(7));
        assert!(matches!(err, AppError::NotFound(msg) if msg == "User 7 not found"));

        let err = insert_failed(DieselError::RollbackTransaction, 12, Some(7));
        assert!(matches!(err, AppError::Database(_)));
    }
}
