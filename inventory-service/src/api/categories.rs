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
use crate::models::{Category, CategoryRecord};
use crate::schema::{categories, products};

const CATEGORY_IN_USE: &str = "Cannot delete category. It is being used by products.";

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    #[serde(alias = "name")]
    pub category_name: Option<String>,
    pub description: Option<String>,
}

impl CategoryInput {
    fn into_record(self) -> AppResult<CategoryRecord> {
        Ok(CategoryRecord {
            category_name: required(self.category_name, "category_name")?,
            description: optional(self.description),
        })
    }
}

pub async fn list_categories(
    _user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Category>>> {
    let mut conn = state.pool.get().await?;
    let rows = categories::table
        .select(Category::as_select())
        .order(categories::category_name.asc())
        .load(&mut conn)
        .await?;
    Ok(Json(rows))
}

pub async fn get_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    let mut conn = state.pool.get().await?;
    let category = categories::table
        .find(id)
        .select(Category::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(not_found)?;
    Ok(Json(category))
}

pub async fn create_category(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    AppJson(input): AppJson<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let record = input.into_record()?;
    let mut conn = state.pool.get().await?;

    let category = diesel::insert_into(categories::table)
        .values(&record)
        .returning(Category::as_returning())
        .get_result(&mut conn)
        .await?;

    info!(
        category_id = category.category_id,
        user_id = user.user_id,
        "Created category"
    );
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(input): AppJson<CategoryInput>,
) -> AppResult<Json<Category>> {
    let record = input.into_record()?;
    let mut conn = state.pool.get().await?;

    let category = diesel::update(categories::table.find(id))
        .set(&record)
        .returning(Category::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?
        .ok_or_else(not_found)?;

    info!(category_id = id, user_id = user.user_id, "Updated category");
    Ok(Json(category))
}

/// Refused while any product still references the category.
pub async fn delete_category(
    RequireAdmin(user): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let mut conn = state.pool.get().await?;

    let in_use: i64 = products::table
        .filter(products::category_id.eq(id))
        .count()
        .get_result(&mut conn)
        .await?;
    if in_use > 0 {
        return Err(AppError::InUse(CATEGORY_IN_USE.into()));
    }

    let deleted = diesel::delete(categories::table.find(id))
        .returning(Category::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(|e| AppError::referenced(e, CATEGORY_IN_USE))?
        .ok_or_else(not_found)?;

    info!(category_id = id, user_id = user.user_id, "Deleted category");
    Ok(Json(json!({
        "message": "Category deleted successfully",
        "deleted_category": deleted,
    })))
}

fn not_found() -> AppError {
    AppError::NotFound("Category not found".into())
}
