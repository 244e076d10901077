use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::{optional, required, AppJson, AppState};
use crate::auth::{AuthUser, RequireAdmin};
use crate::error::{AppError, AppResult};
use crate::models::{Supplier, SupplierRecord};
use crate::schema::suppliers;

#[derive(Debug, Deserialize)]
pub struct SupplierInput {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
}

impl SupplierInput {
    fn into_record(self) -> AppResult<SupplierRecord> {
        Ok(SupplierRecord {
            name: required(self.name, "name")?,
            contact_email: optional(self.contact_email),
            contact_phone: optional(self.contact_phone),
            address: optional(self.address),
        })
    }
}

pub async fn list_suppliers(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Supplier>>> {
    let mut conn = state.pool.get().await?;
    let rows = suppliers::table
        .select(Supplier::as_select())
        .order(suppliers::supplier_id.desc())
        .load(&mut conn)
        .await?;
    Ok(Json(rows))
}

pub async fn get_supplier(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Supplier>> {
    let mut conn = state.pool.get().await?;
    let supplier = suppliers::table
        .find(id)
        .select(Supplier::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(not_found)?;
    Ok(Json(supplier))
}

pub async fn create_supplier(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let record = input.into_record()?;
    let mut conn = state.pool.get().await?;

    let supplier = diesel::insert_into(suppliers::table)
        .values(&record)
        .returning(Supplier::as_returning())
        .get_result(&mut conn)
        .await?;

    info!(
        supplier_id = supplier.supplier_id,
        user_id = user.user_id,
        "Created supplier"
    );
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(input): AppJson<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    let record = input.into_record()?;
    let mut conn = state.pool.get().await?;

    let supplier = diesel::update(suppliers::table.find(id))
        .set(&record)
        .returning(Supplier::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?
        .ok_or_else(not_found)?;

    info!(supplier_id = id, user_id = user.user_id, "Updated supplier");
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let mut conn = state.pool.get().await?;

    let deleted = diesel::delete(suppliers::table.find(id))
        .execute(&mut conn)
        .await
        .map_err(|e| {
            AppError::referenced(e, "Cannot delete supplier. It is referenced by orders.")
        })?;
    if deleted == 0 {
        return Err(not_found());
    }

    info!(supplier_id = id, user_id = user.user_id, "Deleted supplier");
    Ok(Json(json!({ "message": "Supplier deleted successfully" })))
}

fn not_found() -> AppError {
    AppError::NotFound("Supplier not found".into())
}
