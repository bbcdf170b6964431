// src/handlers/user.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{
        AdminCreateUserRequest, AdminUpdateUserRequest, Role, RoleChangeRequest, UserWithRole,
    },
    utils::{hash::hash_password, jwt::Claims},
};

const USER_WITH_ROLE_SELECT: &str = "SELECT u.id, u.first_name, u.last_name, u.email, u.phone,
            u.is_active, u.last_login, u.created_at,
            (SELECT r.name FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = u.id ORDER BY ur.role_id LIMIT 1) AS role
     FROM users u";

/// Lists all users with their primary role.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, UserWithRole>(&format!(
        "{USER_WITH_ROLE_SELECT} ORDER BY u.id DESC"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Lists the built-in roles, most privileged first.
/// Admin only.
pub async fn list_roles(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY id")
        .fetch_all(&pool)
        .await?;

    Ok(Json(roles))
}

/// Fetches a single user by ID.
pub async fn get_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, UserWithRole>(&format!(
        "{USER_WITH_ROLE_SELECT} WHERE u.id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Creates a new user with an explicit role set.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (first_name, last_name, email, password, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
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
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    for role_id in payload.roles.unwrap_or_default() {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(role_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid role id {}: {}", role_id, e)))?;
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates user account fields.
/// Admin only.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let _exists: i64 = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if let Some(first_name) = payload.first_name {
        sqlx::query("UPDATE users SET first_name = $1 WHERE id = $2")
            .bind(first_name)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(last_name) = payload.last_name {
        sqlx::query("UPDATE users SET last_name = $1 WHERE id = $2")
            .bind(last_name)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(email) = payload.email {
        sqlx::query("UPDATE users SET email = $1 WHERE id = $2")
            .bind(&email)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Email '{}' already registered", email))
                } else {
                    AppError::InternalServerError(e.to_string())
                }
            })?;
    }

    if let Some(phone) = payload.phone {
        sqlx::query("UPDATE users SET phone = $1 WHERE id = $2")
            .bind(phone)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(is_active) = payload.is_active {
        sqlx::query("UPDATE users SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}

/// Deletes a user by ID. Cascades to profile, submissions and answers.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Prevent self-deletion
    if id == claims.user_id() {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Assigns a role to a user.
/// Admin only.
pub async fn assign_role(
    State(pool): State<PgPool>,
    Json(payload): Json<RoleChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(payload.user_id)
        .fetch_optional(&pool)
        .await?;
    let role: Option<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE id = $1")
        .bind(payload.role_id)
        .fetch_optional(&pool)
        .await?;

    if user.is_none() || role.is_none() {
        return Err(AppError::NotFound("User or Role not found".to_string()));
    }

    let result = sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(payload.user_id)
    .bind(payload.role_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict("Role already assigned to user".to_string()));
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Role assigned successfully" })),
    ))
}

/// Removes a role from a user.
/// Admin only.
pub async fn remove_role(
    State(pool): State<PgPool>,
    Json(payload): Json<RoleChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
        .bind(payload.user_id)
        .bind(payload.role_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Role assignment not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Role removed successfully" })))
}
