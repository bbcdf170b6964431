// src/handlers/course.rs

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
    models::course::{Course, CreateCourseRequest, UpdateCourseRequest},
    utils::html::clean_html,
};

/// Lists all courses.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY name ASC")
        .fetch_all(&pool)
        .await?;

    Ok(Json(courses))
}

/// Fetches a course by ID.
pub async fn get_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

/// Creates a course.
/// Admin only.
pub async fn create_course(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (name, code, description, credits, department_id, is_active)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE))
        RETURNING *
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.code)
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.credits)
    .bind(payload.department_id)
    .bind(payload.is_active)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Course code already exists".to_string())
        } else {
            tracing::error!("Failed to create course: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// Updates a course by ID.
/// Admin only.
pub async fn update_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.name.is_none()
        && payload.code.is_none()
        && payload.description.is_none()
        && payload.credits.is_none()
        && payload.department_id.is_none()
        && payload.is_active.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE courses SET ");
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

    if let Some(credits) = payload.credits {
        separated.push("credits = ");
        separated.push_bind_unseparated(credits);
    }

    if let Some(department_id) = payload.department_id {
        separated.push("department_id = ");
        separated.push_bind_unseparated(department_id);
    }

    if let Some(is_active) = payload.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Course code already exists".to_string())
        } else {
            tracing::error!("Failed to update course: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a course by ID.
/// Admin only.
pub async fn delete_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete course: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
