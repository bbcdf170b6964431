// src/handlers/proctoring.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::HIGH_SEVERITY_EVENT_LIMIT,
    error::AppError,
    models::proctoring::{LogEventRequest, ProctoringLog, Severity},
};

/// Appends a proctoring event and re-evaluates the cheating threshold.
///
/// Once a submission accumulates more than HIGH_SEVERITY_EVENT_LIMIT
/// High-severity events it is flagged with `cheating_detected`. The
/// insert and the flag update share a transaction.
pub async fn log_event(
    State(pool): State<PgPool>,
    Json(payload): Json<LogEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let owner: Option<i64> = sqlx::query_scalar(
        "SELECT user_id FROM exam_submissions WHERE id = $1",
    )
    .bind(payload.submission_id)
    .fetch_optional(&mut *tx)
    .await?;

    let owner = owner.ok_or(AppError::NotFound("Submission not found".to_string()))?;

    let log = sqlx::query_as::<_, ProctoringLog>(
        r#"
        INSERT INTO proctoring_logs
        (submission_id, user_id, event_type, severity, description, metadata)
        VALUES ($1, $2, $3, COALESCE($4, 'Medium'), $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.submission_id)
    .bind(owner)
    .bind(payload.event_type)
    .bind(payload.severity)
    .bind(&payload.description)
    .bind(&payload.metadata)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to log proctoring event: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let high_severity_events: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM proctoring_logs WHERE submission_id = $1 AND severity = $2",
    )
    .bind(payload.submission_id)
    .bind(Severity::High)
    .fetch_one(&mut *tx)
    .await?;

    if high_severity_events > HIGH_SEVERITY_EVENT_LIMIT {
        sqlx::query(
            "UPDATE exam_submissions SET cheating_detected = TRUE, cheating_details = $1
             WHERE id = $2",
        )
        .bind(serde_json::json!({
            "reason": "Multiple high severity proctoring violations"
        }))
        .bind(payload.submission_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Event logged successfully",
            "log": log,
        })),
    ))
}

/// Lists the proctoring events of a submission, newest first.
pub async fn get_logs(
    State(pool): State<PgPool>,
    Path(submission_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let logs = sqlx::query_as::<_, ProctoringLog>(
        "SELECT * FROM proctoring_logs WHERE submission_id = $1 ORDER BY timestamp DESC",
    )
    .bind(submission_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({ "logs": logs })))
}

/// Helper row for the per-event-type breakdown.
#[derive(sqlx::FromRow)]
struct EventTypeCount {
    event_type: String,
    count: i64,
}

/// Aggregated proctoring report for a submission.
/// Proctor/Admin only.
pub async fn get_report(
    State(pool): State<PgPool>,
    Path(submission_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let _exists: i64 = sqlx::query_scalar("SELECT id FROM exam_submissions WHERE id = $1")
        .bind(submission_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    let (total, high, medium, low): (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE severity = 'High'),
                COUNT(*) FILTER (WHERE severity = 'Medium'),
                COUNT(*) FILTER (WHERE severity = 'Low')
         FROM proctoring_logs
         WHERE submission_id = $1",
    )
    .bind(submission_id)
    .fetch_one(&pool)
    .await?;

    let event_type_counts = sqlx::query_as::<_, EventTypeCount>(
        "SELECT event_type::TEXT AS event_type, COUNT(*) AS count
         FROM proctoring_logs
         WHERE submission_id = $1
         GROUP BY event_type
         ORDER BY count DESC",
    )
    .bind(submission_id)
    .fetch_all(&pool)
    .await?;

    let event_types: serde_json::Map<String, serde_json::Value> = event_type_counts
        .into_iter()
        .map(|row| (row.event_type, serde_json::json!(row.count)))
        .collect();

    Ok(Json(serde_json::json!({
        "report": {
            "total_events": total,
            "high_severity": high,
            "medium_severity": medium,
            "low_severity": low,
            "event_types": event_types,
        },
    })))
}
