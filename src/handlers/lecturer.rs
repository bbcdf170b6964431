// src/handlers/lecturer.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::lecturer::{CreateLecturerRequest, LecturerResponse, UpdateLecturerRequest},
    utils::hash::hash_password,
};

const LECTURER_SELECT: &str = "SELECT l.id, l.user_id, l.employee_id, l.department_id,
            d.name AS department_name, l.qualification, l.specialization,
            l.joining_date, l.is_active,
            u.first_name, u.last_name, u.email, u.phone
     FROM lecturers l
     JOIN users u ON l.user_id = u.id
     LEFT JOIN departments d ON l.department_id = d.id";

/// Lists all lecturers with their user accounts.
pub async fn list_lecturers(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let lecturers =
        sqlx::query_as::<_, LecturerResponse>(&format!("{LECTURER_SELECT} ORDER BY l.id DESC"))
            .fetch_all(&pool)
            .await?;

    Ok(Json(lecturers))
}

/// Fetches a lecturer by ID.
pub async fn get_lecturer(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lecturer =
        sqlx::query_as::<_, LecturerResponse>(&format!("{LECTURER_SELECT} WHERE l.id = $1"))
            .bind(id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Lecturer not found".to_string()))?;

    Ok(Json(lecturer))
}

/// Creates a lecturer: user account, Examiner role and profile row
/// in one transaction.
/// Admin only.
pub async fn create_lecturer(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateLecturerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
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
            tracing::error!("Failed to create lecturer user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = 'Examiner'
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let lecturer_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lecturers
        (user_id, employee_id, department_id, qualification, specialization, joining_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.employee_id)
    .bind(payload.department_id)
    .bind(&payload.qualification)
    .bind(&payload.specialization)
    .bind(payload.joining_date)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Employee id already exists".to_string())
        } else {
            AppError::InternalServerError(e.to_string())
        }
    })?;

    tx.commit().await?;

    let lecturer =
        sqlx::query_as::<_, LecturerResponse>(&format!("{LECTURER_SELECT} WHERE l.id = $1"))
            .bind(lecturer_id)
            .fetch_one(&pool)
            .await?;

    Ok((StatusCode::CREATED, Json(lecturer)))
}

/// Updates a lecturer profile and the linked user basics.
/// Admin only.
pub async fn update_lecturer(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLecturerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id: i64 = sqlx::query_scalar("SELECT user_id FROM lecturers WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Lecturer not found".to_string()))?;

    let mut tx = pool.begin().await?;

    if let Some(first_name) = payload.first_name {
        sqlx::query("UPDATE users SET first_name = $1 WHERE id = $2")
            .bind(first_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(last_name) = payload.last_name {
        sqlx::query("UPDATE users SET last_name = $1 WHERE id = $2")
            .bind(last_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(phone) = payload.phone {
        sqlx::query("UPDATE users SET phone = $1 WHERE id = $2")
            .bind(phone)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(employee_id) = payload.employee_id {
        sqlx::query("UPDATE lecturers SET employee_id = $1 WHERE id = $2")
            .bind(employee_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("Employee id already exists".to_string())
                } else {
                    AppError::InternalServerError(e.to_string())
                }
            })?;
    }

    if let Some(department_id) = payload.department_id {
        sqlx::query("UPDATE lecturers SET department_id = $1 WHERE id = $2")
            .bind(department_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(qualification) = payload.qualification {
        sqlx::query("UPDATE lecturers SET qualification = $1 WHERE id = $2")
            .bind(qualification)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(specialization) = payload.specialization {
        sqlx::query("UPDATE lecturers SET specialization = $1 WHERE id = $2")
            .bind(specialization)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(joining_date) = payload.joining_date {
        sqlx::query("UPDATE lecturers SET joining_date = $1 WHERE id = $2")
            .bind(joining_date)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(is_active) = payload.is_active {
        sqlx::query("UPDATE lecturers SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a lecturer. Removing the user row cascades to the profile.
/// Admin only.
pub async fn delete_lecturer(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id: Option<i64> = sqlx::query_scalar("SELECT user_id FROM lecturers WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let user_id = user_id.ok_or(AppError::NotFound("Lecturer not found".to_string()))?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
