use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use shared::Role;
use tracing::{info, warn};

use crate::api::{required, AppJson, AppState};
use crate::auth::jwt::issue_token;
use crate::auth::password;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User};
use crate::schema::users;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub role: Role,
    pub user: User,
}

struct Signup {
    username: String,
    email: String,
    password: String,
    role: Role,
}

impl SignupRequest {
    fn validate(self) -> AppResult<Signup> {
        let (Some(username), Some(email), Some(password), Some(role)) =
            (self.username, self.email, self.password, self.role)
        else {
            return Err(AppError::Validation("All fields are required".into()));
        };
        let username = required(Some(username), "username")?;
        let email = normalize_email(&required(Some(email), "email")?);
        if password.is_empty() {
            return Err(AppError::Validation("All fields are required".into()));
        }
        let role = Role::from_str(role.trim()).map_err(|_| AppError::Validation("Invalid role".into()))?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters long"
            )));
        }

        Ok(Signup {
            username,
            email,
            password,
            role,
        })
    }
}

pub async fn signup(
    State(state): State<AppState>,
    AppJson(request): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let signup = request.validate()?;
    let mut conn = state.pool.get().await?;

    let existing: Option<i32> = users::table
        .filter(users::email.eq(&signup.email))
        .select(users::user_id)
        .first(&mut conn)
        .await
        .optional()?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let password_hash = password::hash(&signup.password)?;

    let user = diesel::insert_into(users::table)
        .values(&NewUser {
            username: signup.username,
            email: signup.email,
            password_hash,
            role: signup.role.as_str().to_string(),
        })
        .returning(User::as_returning())
        .get_result(&mut conn)
        .await?;

    info!(user_id = user.user_id, role = %signup.role, "Created user");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "User created successfully".into(),
            user,
        }),
    ))
}

/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(AppError::Validation(
            "Email and password are required".into(),
        ));
    };
    let email = normalize_email(&email);

    let mut conn = state.pool.get().await?;
    let user = users::table
        .filter(users::email.eq(&email))
        .select(User::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !password::verify(&password, &user.password_hash)? {
        warn!(user_id = user.user_id, "Failed login attempt");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let role = Role::from_str(&user.role)
        .map_err(|e| AppError::Internal(format!("user {}: {e}", user.user_id)))?;
    let token = issue_token(user.user_id, role, &state.settings.jwt)
        .map_err(|e| AppError::Internal(format!("Token signing error: {e}")))?;

    info!(user_id = user.user_id, role = %role, "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        token,
        role,
        user,
    }))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
