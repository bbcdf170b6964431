// src/handlers/analytics.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{error::AppError, models::submission::MyResult};

/// Formats a timestamp as a rough human-readable age ("5 mins ago").
fn time_ago(submit_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(submitted) = submit_time else {
        return "Recently".to_string();
    };

    let elapsed = now - submitted;
    let mins = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{} min{} ago", mins, if mins > 1 { "s" } else { "" })
    } else if hours < 24 {
        format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
    } else if days < 7 {
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    } else {
        submitted.format("%Y-%m-%d").to_string()
    }
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 10000.0).round() / 100.0
    }
}

/// Helper row for the recent-submissions feed.
#[derive(sqlx::FromRow)]
struct RecentSubmission {
    first_name: String,
    last_name: String,
    exam_title: String,
    obtained_marks: Option<f64>,
    total_marks: f64,
    is_passed: Option<bool>,
    submit_time: Option<DateTime<Utc>>,
}

/// Platform-wide dashboard numbers, recomputed per request.
/// Staff only.
pub async fn get_analytics(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let total_exams: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exams")
        .fetch_one(&pool)
        .await?;
    let total_questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await?;
    let total_students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(&pool)
        .await?;

    let (total_submissions, passed_count, failed_count): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE is_passed IS TRUE),
                COUNT(*) FILTER (WHERE is_passed IS FALSE)
         FROM exam_submissions",
    )
    .fetch_one(&pool)
    .await?;

    let average_score: Option<f64> =
        sqlx::query_scalar("SELECT AVG(obtained_marks) FROM exam_submissions")
            .fetch_one(&pool)
            .await?;

    let recent = sqlx::query_as::<_, RecentSubmission>(
        "SELECT u.first_name, u.last_name, e.title AS exam_title,
                s.obtained_marks, e.total_marks, s.is_passed, s.submit_time
         FROM exam_submissions s
         JOIN users u ON s.user_id = u.id
         JOIN exams e ON s.exam_id = e.id
         ORDER BY s.submit_time DESC NULLS LAST
         LIMIT 10",
    )
    .fetch_all(&pool)
    .await?;

    let now = Utc::now();
    let recent_submissions: Vec<serde_json::Value> = recent
        .into_iter()
        .map(|row| {
            serde_json::json!({
                "student_name": format!("{} {}", row.first_name, row.last_name),
                "exam_title": row.exam_title,
                "obtained_marks": row.obtained_marks.unwrap_or(0.0),
                "total_marks": row.total_marks,
                "is_passed": row.is_passed,
                "time_ago": time_ago(row.submit_time, now),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "analytics": {
            "total_exams": total_exams,
            "total_submissions": total_submissions,
            "total_students": total_students,
            "total_questions": total_questions,
            "passed_count": passed_count,
            "failed_count": failed_count,
            "pass_percentage": percentage(passed_count, total_submissions),
            "average_score": average_score.unwrap_or(0.0),
            "recent_submissions": recent_submissions,
        },
    })))
}

/// Helper row for the per-question breakdown.
#[derive(sqlx::FromRow)]
struct QuestionBreakdown {
    question_id: i64,
    correct: i64,
    incorrect: i64,
    not_answered: i64,
}

/// Per-exam aggregates plus a per-question answer breakdown.
/// Staff only.
pub async fn get_exam_analytics(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam_title: String = sqlx::query_scalar("SELECT title FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let (total_submissions, passed_count, failed_count): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE is_passed IS TRUE),
                COUNT(*) FILTER (WHERE is_passed IS FALSE)
         FROM exam_submissions
         WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(&pool)
    .await?;

    let average_score: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(obtained_marks) FROM exam_submissions WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(&pool)
    .await?;

    let breakdown = sqlx::query_as::<_, QuestionBreakdown>(
        "SELECT sa.question_id,
                COUNT(*) FILTER (WHERE sa.is_correct IS TRUE) AS correct,
                COUNT(*) FILTER (WHERE sa.student_answer IS NOT NULL
                                 AND sa.student_answer <> ''
                                 AND sa.is_correct IS NOT TRUE) AS incorrect,
                COUNT(*) FILTER (WHERE sa.student_answer IS NULL
                                 OR sa.student_answer = '') AS not_answered
         FROM student_answers sa
         JOIN exam_submissions s ON sa.submission_id = s.id
         WHERE s.exam_id = $1
         GROUP BY sa.question_id
         ORDER BY sa.question_id",
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    let question_analytics: serde_json::Map<String, serde_json::Value> = breakdown
        .into_iter()
        .map(|row| {
            (
                row.question_id.to_string(),
                serde_json::json!({
                    "correct": row.correct,
                    "incorrect": row.incorrect,
                    "not_answered": row.not_answered,
                }),
            )
        })
        .collect();

    Ok(Json(serde_json::json!({
        "exam_analytics": {
            "exam_id": exam_id,
            "exam_title": exam_title,
            "total_submissions": total_submissions,
            "passed_count": passed_count,
            "failed_count": failed_count,
            "pass_percentage": percentage(passed_count, total_submissions),
            "average_score": average_score.unwrap_or(0.0),
            "question_analytics": question_analytics,
        },
    })))
}

/// Per-student aggregates plus submission history.
pub async fn get_student_analytics(
    State(pool): State<PgPool>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let name: Option<(String, String)> = sqlx::query_as(
        "SELECT first_name, last_name FROM users WHERE id = $1",
    )
    .bind(student_id)
    .fetch_optional(&pool)
    .await?;

    let (first_name, last_name) =
        name.ok_or(AppError::NotFound("Student not found".to_string()))?;

    let (total_exams_taken, passed_count, failed_count): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*),
                COUNT(*) FILTER (WHERE is_passed IS TRUE),
                COUNT(*) FILTER (WHERE is_passed IS FALSE)
         FROM exam_submissions
         WHERE user_id = $1",
    )
    .bind(student_id)
    .fetch_one(&pool)
    .await?;

    let average_score: Option<f64> = sqlx::query_scalar(
        "SELECT AVG(obtained_marks) FROM exam_submissions WHERE user_id = $1",
    )
    .bind(student_id)
    .fetch_one(&pool)
    .await?;

    let submissions = sqlx::query_as::<_, MyResult>(
        "SELECT s.id, s.exam_id, s.status, s.started_at, s.submit_time,
                s.obtained_marks, s.is_passed,
                e.title AS exam_title, e.total_marks, e.passing_marks, e.duration
         FROM exam_submissions s
         JOIN exams e ON s.exam_id = e.id
         WHERE s.user_id = $1
         ORDER BY s.created_at DESC",
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "student_analytics": {
            "student_id": student_id,
            "student_name": format!("{} {}", first_name, last_name),
            "total_exams_taken": total_exams_taken,
            "passed_count": passed_count,
            "failed_count": failed_count,
            "pass_percentage": percentage(passed_count, total_exams_taken),
            "average_score": average_score.unwrap_or(0.0),
            "submissions": submissions,
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();

        assert_eq!(time_ago(None, now), "Recently");
        assert_eq!(time_ago(Some(now - Duration::seconds(30)), now), "Just now");
        assert_eq!(time_ago(Some(now - Duration::minutes(1)), now), "1 min ago");
        assert_eq!(time_ago(Some(now - Duration::minutes(5)), now), "5 mins ago");
        assert_eq!(time_ago(Some(now - Duration::hours(3)), now), "3 hours ago");
        assert_eq!(time_ago(Some(now - Duration::days(2)), now), "2 days ago");
    }

    #[test]
    fn time_ago_old_dates_fall_back_to_date() {
        let now = Utc::now();
        let old = now - Duration::days(30);
        assert_eq!(time_ago(Some(old), now), old.format("%Y-%m-%d").to_string());
    }

    #[test]
    fn percentage_handles_zero_denominator() {
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(1, 2), 50.0);
        assert_eq!(percentage(1, 3), 33.33);
    }
}
