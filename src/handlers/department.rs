// src/handlers/department.rs

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
    models::{
        class::Class,
        course::Course,
        department::{CreateDepartmentRequest, Department, UpdateDepartmentRequest},
    },
    utils::html::clean_html,
};

/// Lists all departments.
pub async fn list_departments(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let departments =
        sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name ASC")
            .fetch_all(&pool)
            .await?;

    Ok(Json(departments))
}

/// Fetches a department with its courses and classes.
pub async fn get_department(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let department = sqlx::query_as::<_, Department>("SELECT * FROM departments WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Department not found".to_string()))?;

    let courses =
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE department_id = $1 ORDER BY name")
            .bind(id)
            .fetch_all(&pool)
            .await?;

    let classes =
        sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE department_id = $1 ORDER BY name")
            .bind(id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(serde_json::json!({
        "department": department,
        "courses": courses,
        "classes": classes,
    })))
}

/// Creates a department.
/// Admin only.
pub async fn create_department(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateDepartmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let department = sqlx::query_as::<_, Department>(
        r#"
        INSERT INTO departments (name, code, description, is_active)
        VALUES ($1, $2, $3, COALESCE($4, TRUE))
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.code)
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.is_active)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Department name or code already exists".to_string())
        } else {
            tracing::error!("Failed to create department: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(department)))
}

/// Updates a department by ID.
/// Admin only.
pub async fn update_department(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.name.is_none()
        && payload.code.is_none()
        && payload.description.is_none()
        && payload.is_active.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE departments SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(code) = payload.code {
        separated.push("code = ");
        separated.push_bind_unseparated(code);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
    }

    if let Some(is_active) = payload.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Department name or code already exists".to_string())
        } else {
            tracing::error!("Failed to update department: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Department not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a department by ID.
/// Admin only.
pub async fn delete_department(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM departments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete department: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Department not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
