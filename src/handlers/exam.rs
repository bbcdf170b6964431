// src/handlers/exam.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, ExamStatus, UpdateExamRequest},
        question::PublicQuestion,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Creates an exam owned by the caller.
/// Examiner/Admin only.
pub async fn create_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams
        (title, description, duration, total_questions, total_marks, passing_marks,
         exam_type, status, start_time, end_time, requires_proctoring, shuffle_questions,
         negative_marking_enabled, negative_marks, course_id, created_by)
        VALUES ($1, $2, $3, $4, $5, $6,
                COALESCE($7, 'Online'), COALESCE($8, 'Draft'), $9, $10,
                COALESCE($11, TRUE), COALESCE($12, FALSE),
                COALESCE($13, FALSE), $14, $15, $16)
        RETURNING *
        "#,
    )
    .bind(&payload.title)
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.duration)
    .bind(payload.total_questions)
    .bind(payload.total_marks)
    .bind(payload.passing_marks)
    .bind(payload.exam_type)
    .bind(payload.status)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(payload.requires_proctoring)
    .bind(payload.shuffle_questions)
    .bind(payload.negative_marking_enabled)
    .bind(payload.negative_marks)
    .bind(payload.course_id)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Lists all exams, newest first.
pub async fn list_exams(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>("SELECT * FROM exams ORDER BY created_at DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exams: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(exams))
}

/// Fetches an exam with its creator and attached question set.
/// Answer keys are never included here.
pub async fn get_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let creator: Option<(String, String, String)> = match exam.created_by {
        Some(creator_id) => sqlx::query_as(
            "SELECT first_name, last_name, email FROM users WHERE id = $1",
        )
        .bind(creator_id)
        .fetch_optional(&pool)
        .await?,
        None => None,
    };

    let questions = sqlx::query_as::<_, PublicQuestion>(
        "SELECT q.id, q.question_text, q.question_type, q.marks,
                q.option_a, q.option_b, q.option_c, q.option_d, q.image_url
         FROM questions q
         JOIN exam_questions eq ON eq.question_id = q.id
         WHERE eq.exam_id = $1
         ORDER BY eq.display_order, q.id",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "exam": exam,
        "creator": creator.map(|(first_name, last_name, email)| serde_json::json!({
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
        })),
        "questions": questions,
    })))
}

/// Updates an exam by ID.
/// Examiner/Admin only.
pub async fn update_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");
    let mut any = false;

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
        any = true;
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_html(&description));
        any = true;
    }

    if let Some(duration) = payload.duration {
        separated.push("duration = ");
        separated.push_bind_unseparated(duration);
        any = true;
    }

    if let Some(total_questions) = payload.total_questions {
        separated.push("total_questions = ");
        separated.push_bind_unseparated(total_questions);
        any = true;
    }

    if let Some(total_marks) = payload.total_marks {
        separated.push("total_marks = ");
        separated.push_bind_unseparated(total_marks);
        any = true;
    }

    if let Some(passing_marks) = payload.passing_marks {
        separated.push("passing_marks = ");
        separated.push_bind_unseparated(passing_marks);
        any = true;
    }

    if let Some(exam_type) = payload.exam_type {
        separated.push("exam_type = ");
        separated.push_bind_unseparated(exam_type);
        any = true;
    }

    if let Some(status) = payload.status {
        separated.push("status = ");
        separated.push_bind_unseparated(status);
        any = true;
    }

    if let Some(start_time) = payload.start_time {
        separated.push("start_time = ");
        separated.push_bind_unseparated(start_time);
        any = true;
    }

    if let Some(end_time) = payload.end_time {
        separated.push("end_time = ");
        separated.push_bind_unseparated(end_time);
        any = true;
    }

    if let Some(requires_proctoring) = payload.requires_proctoring {
        separated.push("requires_proctoring = ");
        separated.push_bind_unseparated(requires_proctoring);
        any = true;
    }

    if let Some(shuffle_questions) = payload.shuffle_questions {
        separated.push("shuffle_questions = ");
        separated.push_bind_unseparated(shuffle_questions);
        any = true;
    }

    if let Some(negative_marking_enabled) = payload.negative_marking_enabled {
        separated.push("negative_marking_enabled = ");
        separated.push_bind_unseparated(negative_marking_enabled);
        any = true;
    }

    if let Some(negative_marks) = payload.negative_marks {
        separated.push("negative_marks = ");
        separated.push_bind_unseparated(negative_marks);
        any = true;
    }

    if let Some(course_id) = payload.course_id {
        separated.push("course_id = ");
        separated.push_bind_unseparated(course_id);
        any = true;
    }

    if !any {
        return Ok(StatusCode::OK);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an exam by ID. Cascades to attached questions and
/// submissions.
/// Examiner/Admin only.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Marks an exam as Published.
/// Examiner/Admin only.
pub async fn publish_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = sqlx::query_as::<_, Exam>(
        "UPDATE exams SET status = $1 WHERE id = $2 RETURNING *",
    )
    .bind(ExamStatus::Published)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "message": "Exam published successfully",
        "exam": exam,
    })))
}
