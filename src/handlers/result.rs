// src/handlers/result.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::submission::{AnswerDetail, ExamSubmission, MyResult, SubmissionStatus, SubmissionSummary},
    utils::jwt::Claims,
};

/// Query filters for result listings.
#[derive(Debug, Deserialize)]
pub struct ResultFilters {
    pub status: Option<SubmissionStatus>,
    pub exam_id: Option<i64>,
    pub user_id: Option<i64>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Lists the calling student's own results.
/// Student only.
pub async fn my_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(filters): Query<ResultFilters>,
) -> Result<impl IntoResponse, AppError> {
    let results = sqlx::query_as::<_, MyResult>(
        "SELECT s.id, s.exam_id, s.status, s.started_at, s.submit_time,
                s.obtained_marks, s.is_passed,
                e.title AS exam_title, e.total_marks, e.passing_marks, e.duration
         FROM exam_submissions s
         JOIN exams e ON s.exam_id = e.id
         WHERE s.user_id = $1
           AND ($2::submission_status IS NULL OR s.status = $2)
           AND ($3::BIGINT IS NULL OR s.exam_id = $3)
         ORDER BY s.created_at DESC",
    )
    .bind(claims.user_id())
    .bind(filters.status)
    .bind(filters.exam_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

/// Detailed result for one submission: the attempt, its exam and the
/// graded answers. Students may only read their own.
pub async fn result_details(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = sqlx::query_as::<_, ExamSubmission>(
        "SELECT * FROM exam_submissions WHERE id = $1",
    )
    .bind(submission_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    if claims.role == "Student" && submission.user_id != claims.user_id() {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }

    let exam: Option<(String, Option<String>, f64, f64, i32, i32)> = sqlx::query_as(
        "SELECT title, description, total_marks, passing_marks, duration, total_questions
         FROM exams WHERE id = $1",
    )
    .bind(submission.exam_id)
    .fetch_optional(&pool)
    .await?;

    let answers = sqlx::query_as::<_, AnswerDetail>(
        "SELECT sa.id, sa.question_id, sa.student_answer, sa.is_correct, sa.marks_obtained,
                q.question_text, q.question_type, q.marks, q.option_a, q.option_b,
                q.option_c, q.option_d, q.correct_answer, q.explanation
         FROM student_answers sa
         JOIN questions q ON sa.question_id = q.id
         WHERE sa.submission_id = $1
         ORDER BY sa.id",
    )
    .bind(submission_id)
    .fetch_all(&pool)
    .await?;

    let exam_json = exam.map(
        |(title, description, total_marks, passing_marks, duration, total_questions)| {
            serde_json::json!({
                "title": title,
                "description": description,
                "total_marks": total_marks,
                "passing_marks": passing_marks,
                "duration": duration,
                "total_questions": total_questions,
            })
        },
    );

    Ok(Json(serde_json::json!({
        "submission": submission,
        "exam": exam_json,
        "answers": answers,
    })))
}

/// Lists all results with optional filters.
/// Staff only.
pub async fn all_results(
    State(pool): State<PgPool>,
    Query(filters): Query<ResultFilters>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT s.id, s.user_id, s.exam_id, s.status, s.started_at, s.submit_time,
                s.obtained_marks, s.is_passed, s.cheating_detected,
                e.title AS exam_title, e.total_marks, e.passing_marks,
                u.first_name, u.last_name, u.email, st.student_number
         FROM exam_submissions s
         JOIN exams e ON s.exam_id = e.id
         JOIN users u ON s.user_id = u.id
         LEFT JOIN students st ON st.user_id = u.id
         WHERE 1 = 1",
    );

    if let Some(status) = filters.status {
        builder.push(" AND s.status = ");
        builder.push_bind(status);
    }

    if let Some(exam_id) = filters.exam_id {
        builder.push(" AND s.exam_id = ");
        builder.push_bind(exam_id);
    }

    if let Some(user_id) = filters.user_id {
        builder.push(" AND s.user_id = ");
        builder.push_bind(user_id);
    }

    if let (Some(start_date), Some(end_date)) = (filters.start_date, filters.end_date) {
        builder.push(" AND s.created_at BETWEEN ");
        builder.push_bind(start_date);
        builder.push(" AND ");
        builder.push_bind(end_date);
    }

    builder.push(" ORDER BY s.created_at DESC");

    let results: Vec<SubmissionSummary> = builder.build_query_as().fetch_all(&pool).await?;

    Ok(Json(results))
}

/// Score statistics for an exam, over evaluated submissions only.
/// Staff only.
pub async fn exam_statistics(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row: (i64, Option<f64>, Option<f64>, Option<f64>, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                AVG(obtained_marks),
                MAX(obtained_marks),
                MIN(obtained_marks),
                COUNT(*) FILTER (WHERE is_passed IS TRUE)
         FROM exam_submissions
         WHERE exam_id = $1 AND status = $2",
    )
    .bind(exam_id)
    .bind(SubmissionStatus::Evaluated)
    .fetch_one(&pool)
    .await?;

    let (total_submissions, average, highest, lowest, passed_count) = row;

    if total_submissions == 0 {
        return Ok(Json(serde_json::json!({
            "total_submissions": 0,
            "average_score": 0.0,
            "pass_rate": 0.0,
            "highest_score": 0.0,
            "lowest_score": 0.0,
            "passed_count": 0,
            "failed_count": 0,
        })));
    }

    let pass_rate =
        (passed_count as f64 / total_submissions as f64 * 10000.0).round() / 100.0;

    Ok(Json(serde_json::json!({
        "total_submissions": total_submissions,
        "average_score": average.unwrap_or(0.0),
        "pass_rate": pass_rate,
        "highest_score": highest.unwrap_or(0.0),
        "lowest_score": lowest.unwrap_or(0.0),
        "passed_count": passed_count,
        "failed_count": total_submissions - passed_count,
    })))
}
