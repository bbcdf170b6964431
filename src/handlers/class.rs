// src/handlers/class.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::class::{Class, CreateClassRequest, UpdateClassRequest},
};

/// Lists all classes.
pub async fn list_classes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let classes = sqlx::query_as::<_, Class>("SELECT * FROM classes ORDER BY name ASC")
        .fetch_all(&pool)
        .await?;

    Ok(Json(classes))
}

/// Fetches a class by ID, including its student headcount.
pub async fn get_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let class = sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Class not found".to_string()))?;

    let student_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE class_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await?;

    Ok(Json(serde_json::json!({
        "class": class,
        "student_count": student_count,
    })))
}

/// Creates a class.
/// Admin only.
pub async fn create_class(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let class = sqlx::query_as::<_, Class>(
        r#"
        INSERT INTO classes (name, code, department_id, academic_year, semester, is_active)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE))
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.code)
    .bind(payload.department_id)
    .bind(&payload.academic_year)
    .bind(&payload.semester)
    .bind(payload.is_active)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Class code already exists".to_string())
        } else {
            tracing::error!("Failed to create class: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(class)))
}

/// Updates a class by ID.
/// Admin only.
pub async fn update_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.name.is_none()
        && payload.code.is_none()
        && payload.department_id.is_none()
        && payload.academic_year.is_none()
        && payload.semester.is_none()
        && payload.is_active.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE classes SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(code) = payload.code {
        separated.push("code = ");
        separated.push_bind_unseparated(code);
    }

    if let Some(department_id) = payload.department_id {
        separated.push("department_id = ");
        separated.push_bind_unseparated(department_id);
    }

    if let Some(academic_year) = payload.academic_year {
        separated.push("academic_year = ");
        separated.push_bind_unseparated(academic_year);
    }

    if let Some(semester) = payload.semester {
        separated.push("semester = ");
        separated.push_bind_unseparated(semester);
    }

    if let Some(is_active) = payload.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Class code already exists".to_string())
        } else {
            tracing::error!("Failed to update class: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a class by ID.
/// Admin only.
pub async fn delete_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM classes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete class: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
