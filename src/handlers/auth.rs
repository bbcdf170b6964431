// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserWithRole},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Subquery returning the most privileged role assigned to user `u`.
const PRIMARY_ROLE_SUBQUERY: &str = "(SELECT r.name FROM roles r \
     JOIN user_roles ur ON ur.role_id = r.id \
     WHERE ur.user_id = u.id ORDER BY ur.role_id LIMIT 1)";

/// Registers a new user with the Student role.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with the user and a fresh token.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (first_name, last_name, email, password, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.phone)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' already registered", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    // Everyone who self-registers is a Student.
    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = 'Student'
         ON CONFLICT DO NOTHING",
    )
    .bind(user.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let token = sign_jwt(user.id, "Student", &config.jwt_secret, config.jwt_expiration)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": {
                "id": user.id,
                "first_name": user.first_name,
                "last_name": user.last_name,
                "email": user.email,
                "role": "Student",
                "is_active": user.is_active,
            },
            "token": token,
            "type": "Bearer",
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies email and password, rejects inactive accounts, records
/// last_login, and signs a token carrying the user's primary role.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let user = user.ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden(
            "Account is inactive. Please contact administrator.".to_string(),
        ));
    }

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let role: Option<String> = sqlx::query_scalar(
        "SELECT r.name FROM roles r
         JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = $1
         ORDER BY ur.role_id
         LIMIT 1",
    )
    .bind(user.id)
    .fetch_optional(&pool)
    .await?;

    let role = role.unwrap_or_else(|| "Student".to_string());

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await?;

    let token = sign_jwt(user.id, &role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "email": user.email,
            "role": role,
            "is_active": user.is_active,
        },
        "token": token,
        "type": "Bearer",
    })))
}

/// Get current user's profile.
pub async fn get_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, UserWithRole>(&format!(
        "SELECT u.id, u.first_name, u.last_name, u.email, u.phone,
                u.is_active, u.last_login, u.created_at,
                {PRIMARY_ROLE_SUBQUERY} AS role
         FROM users u
         WHERE u.id = $1"
    ))
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Update current user's profile (name and phone only).
pub async fn update_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id = claims.user_id();

    let _exists: i64 = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(first_name) = payload.first_name {
        sqlx::query("UPDATE users SET first_name = $1 WHERE id = $2")
            .bind(first_name)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(last_name) = payload.last_name {
        sqlx::query("UPDATE users SET last_name = $1 WHERE id = $2")
            .bind(last_name)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(phone) = payload.phone {
        sqlx::query("UPDATE users SET phone = $1 WHERE id = $2")
            .bind(phone)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}
