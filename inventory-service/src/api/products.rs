use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{optional, required, AppJson, AppState};
use crate::auth::{AuthUser, RequireAdmin};
use crate::error::{AppError, AppResult};
use crate::models::{Product, ProductRecord};
use crate::schema::{categories, products};

const CATEGORY_FK: &str = "products_category_id_fkey";

/// Fields accepted when creating a product. Missing numbers start at zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub stock_quantity: Option<i32>,
    pub category_id: Option<i32>,
    pub reorder_level: Option<i32>,
}

/// A full replacement record for the administrative override.
///
/// `price` and `stock_quantity` must be present. The names emitted by
/// `GET /stock` are accepted too, so a stock row can be edited and sent back.
/// Nullable columns left out are cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductOverwrite {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "unit_price")]
    pub price: Option<BigDecimal>,
    #[serde(alias = "current_stock")]
    pub stock_quantity: Option<i32>,
    pub category_id: Option<i32>,
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
}

impl ProductInput {
    pub fn into_record(self) -> AppResult<ProductRecord> {
        let name = required(self.name, "name")?;
        let price = self.price.unwrap_or_else(BigDecimal::zero);
        if price < BigDecimal::zero() {
            return Err(AppError::Validation("price must not be negative".into()));
        }
        let stock_quantity = self.stock_quantity.unwrap_or(0);
        if stock_quantity < 0 {
            return Err(AppError::Validation(
                "stock_quantity must not be negative".into(),
            ));
        }
        if matches!(self.reorder_level, Some(level) if level < 0) {
            return Err(AppError::Validation(
                "reorder_level must not be negative".into(),
            ));
        }

        Ok(ProductRecord {
            name,
            description: optional(self.description),
            price,
            stock_quantity,
            category_id: self.category_id,
            reorder_level: self.reorder_level,
        })
    }
}

impl ProductOverwrite {
    pub fn into_record(self) -> AppResult<ProductRecord> {
        let price = self.price.ok_or_else(|| missing("price"))?;
        let stock_quantity = self.stock_quantity.ok_or_else(|| missing("stock_quantity"))?;

        ProductInput {
            name: self.name,
            description: self.description,
            price: Some(price),
            stock_quantity: Some(stock_quantity),
            category_id: self.category_id,
            reorder_level: self.reorder_level,
        }
        .into_record()
    }
}

fn missing(field: &str) -> AppError {
    AppError::Validation(format!("{field} is required"))
}

pub async fn list_products(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProductView>>> {
    let mut conn = state.pool.get().await?;

    let rows = products::table
        .left_join(categories::table)
        .select((Product::as_select(), categories::category_name.nullable()))
        .order(products::product_id.asc())
        .load::<(Product, Option<String>)>(&mut conn)
        .await?;

    let views = rows
        .into_iter()
        .map(|(product, category_name)| ProductView {
            product,
            category_name,
        })
        .collect();

    Ok(Json(views))
}

pub async fn get_product(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ProductView>> {
    let mut conn = state.pool.get().await?;

    let (product, category_name) = products::table
        .left_join(categories::table)
        .filter(products::product_id.eq(id))
        .select((Product::as_select(), categories::category_name.nullable()))
        .first::<(Product, Option<String>)>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(ProductView {
        product,
        category_name,
    }))
}

pub async fn create_product(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let record = input.into_record()?;
    let mut conn = state.pool.get().await?;

    let product = diesel::insert_into(products::table)
        .values(&record)
        .get_result::<Product>(&mut conn)
        .await
        .map_err(|e| category_missing(e, record.category_id))?;

    info!(
        product_id = product.product_id,
        user_id = user.user_id,
        "Created product"
    );
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Query(IdQuery { id }): Query<IdQuery>,
    AppJson(input): AppJson<ProductOverwrite>,
) -> AppResult<Json<Value>> {
    let record = input.into_record()?;
    let mut conn = state.pool.get().await?;
    let product = overwrite_product(&mut conn, id, &record, user.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Product updated successfully",
        "product": product,
    })))
}

pub async fn delete_product(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Query(IdQuery { id }): Query<IdQuery>,
) -> AppResult<Json<Value>> {
    let mut conn = state.pool.get().await?;

    let deleted = diesel::delete(products::table.find(id))
        .execute(&mut conn)
        .await
        .map_err(|e| {
            AppError::referenced(
                e,
                "Cannot delete product. It is referenced by orders or stock transactions.",
            )
        })?;
    if deleted == 0 {
        return Err(not_found(id));
    }

    info!(product_id = id, user_id = user.user_id, "Deleted product");
    Ok(Json(json!({
        "success": true,
        "message": "Product deleted successfully",
    })))
}

/// Administrative override: every writable column, stock quantity included, is
/// replaced as given. No ledger row is written.
pub(crate) async fn overwrite_product(
    conn: &mut AsyncPgConnection,
    id: i32,
    record: &ProductRecord,
    user_id: i32,
) -> AppResult<Product> {
    let product = diesel::update(products::table.find(id))
        .set((record, products::updated_at.eq(diesel::dsl::now)))
        .get_result::<Product>(conn)
        .await
        .optional()
        .map_err(|e| category_missing(e, record.category_id))?
        .ok_or_else(|| not_found(id))?;

    warn!(
        product_id = id,
        user_id,
        stock_quantity = product.stock_quantity,
        "Stock quantity overwritten outside the ledger"
    );
    Ok(product)
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Product {id} not found"))
}

fn category_missing(err: diesel::result::Error, category_id: Option<i32>) -> AppError {
    AppError::missing_reference(
        err,
        CATEGORY_FK,
        format!("Category {} not found", category_id.unwrap_or_default()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input(name: &str) -> ProductInput {
        ProductInput {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_numbers_default_to_zero() {
        let record = input("Hex bolt").into_record().unwrap();
        assert_eq!(record.price, BigDecimal::zero());
        assert_eq!(record.stock_quantity, 0);
        assert_eq!(record.reorder_level, None);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(matches!(
            input("  ").into_record(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn negative_values_are_rejected() {
        let negative_price = ProductInput {
            price: Some(BigDecimal::from_str("-0.01").unwrap()),
            ..input("Washer")
        };
        assert!(negative_price.into_record().is_err());

        let negative_stock = ProductInput {
            stock_quantity: Some(-1),
            ..input("Washer")
        };
        assert!(negative_stock.into_record().is_err());

        let negative_reorder = ProductInput {
            reorder_level: Some(-5),
            ..input("Washer")
        };
        assert!(negative_reorder.into_record().is_err());
    }

    #[test]
    fn blank_description_is_stored_as_null() {
        let record = ProductInput {
            description: Some("   ".into()),
            ..input("Washer")
        }
        .into_record()
        .unwrap();
        assert_eq!(record.description, None);
    }

    fn overwrite(name: &str) -> ProductOverwrite {
        ProductOverwrite {
            name: Some(name.to_string()),
            price: Some(BigDecimal::from(3)),
            stock_quantity: Some(12),
            ..Default::default()
        }
    }

    #[test]
    fn overwrite_requires_price_and_stock() {
        let no_price = ProductOverwrite {
            price: None,
            ..overwrite("Washer")
        };
        assert!(matches!(
            no_price.into_record(),
            Err(AppError::Validation(msg)) if msg == "price is required"
        ));

        let no_stock = ProductOverwrite {
            stock_quantity: None,
            ..overwrite("Washer")
        };
        assert!(matches!(
            no_stock.into_record(),
            Err(AppError::Validation(msg)) if msg == "stock_quantity is required"
        ));
    }

    #[test]
    fn overwrite_keeps_the_create_checks() {
        let negative = ProductOverwrite {
            stock_quantity: Some(-1),
            ..overwrite("Washer")
        };
        assert!(negative.into_record().is_err());
        assert!(overwrite(" ").into_record().is_err());

        let record = overwrite("Washer").into_record().unwrap();
        assert_eq!(record.price, BigDecimal::from(3));
        assert_eq!(record.stock_quantity, 12);
    }

    #[test]
    fn unknown_category_is_not_found() {
        use crate::error::foreign_key_violation;

        let err = category_missing(foreign_key_violation(CATEGORY_FK), Some(99));
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Category 99 not found"));
    }
}
