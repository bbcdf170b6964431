// src/handlers/submission.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        question::{PublicQuestion, QuestionType},
        submission::{
            AnswerDetail, AutoSaveRequest, EvaluateRequest, ExamSubmission, SubmissionStatus,
            SubmissionSummary, SubmitOptions,
        },
    },
    utils::jwt::Claims,
};

/// Helper struct for grading: one saved answer joined with its
/// question's answer key.
#[derive(sqlx::FromRow)]
struct AnswerForGrading {
    id: i64,
    student_answer: Option<String>,
    question_type: QuestionType,
    correct_answer: String,
    marks: f64,
}

/// Grades a single answer.
///
/// Objective types compare by exact string equality with the stored
/// key. ShortAnswer/Essay cannot be auto-graded: they stay ungraded
/// (`None`) with zero marks until an examiner evaluates the
/// submission.
fn grade_answer(
    question_type: QuestionType,
    student_answer: Option<&str>,
    correct_answer: &str,
    marks: f64,
) -> (Option<bool>, f64) {
    if !question_type.is_auto_gradable() {
        return (None, 0.0);
    }

    match student_answer {
        Some(answer) if answer == correct_answer => (Some(true), marks),
        _ => (Some(false), 0.0),
    }
}

/// Starts an exam attempt for the calling student.
///
/// Rejects when an attempt for this (user, exam) pair is already
/// In Progress or Submitted. Returns the exam and its question set
/// without answer keys; when the exam's `shuffle_questions` flag is
/// set the questions come back in random order.
/// Student only.
pub async fn start_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM exam_submissions
         WHERE user_id = $1 AND exam_id = $2 AND status IN ($3, $4)",
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(SubmissionStatus::InProgress)
    .bind(SubmissionStatus::Submitted)
    .fetch_optional(&pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::BadRequest("Exam already started".to_string()));
    }

    let submission = sqlx::query_as::<_, ExamSubmission>(
        r#"
        INSERT INTO exam_submissions (user_id, exam_id, status, started_at)
        VALUES ($1, $2, $3, NOW())
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(SubmissionStatus::InProgress)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to start exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let order_clause = if exam.shuffle_questions {
        "ORDER BY RANDOM()"
    } else {
        "ORDER BY eq.display_order, q.id"
    };

    let questions = sqlx::query_as::<_, PublicQuestion>(&format!(
        "SELECT q.id, q.question_text, q.question_type, q.marks,
                q.option_a, q.option_b, q.option_c, q.option_d, q.image_url
         FROM questions q
         JOIN exam_questions eq ON eq.question_id = q.id
         WHERE eq.exam_id = $1
         {order_clause}"
    ))
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Exam started successfully",
            "submission": {
                "id": submission.id,
                "status": submission.status,
                "started_at": submission.started_at,
                "duration": exam.duration,
                "exam": exam,
                "questions": questions,
            },
        })),
    ))
}

/// Auto-saves one answer for an in-progress attempt.
///
/// Idempotent upsert on (submission_id, question_id): repeated calls
/// keep a single row holding the latest value. Only the submission's
/// owner may write, and only while the attempt is In Progress.
pub async fn auto_save_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AutoSaveRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission = sqlx::query_as::<_, ExamSubmission>(
        "SELECT * FROM exam_submissions WHERE id = $1",
    )
    .bind(payload.submission_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    if submission.user_id != claims.user_id() {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    if submission.status != SubmissionStatus::InProgress {
        return Err(AppError::BadRequest(
            "Submission is no longer in progress".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO student_answers
        (submission_id, question_id, student_answer, answered_at, last_modified_at)
        VALUES ($1, $2, $3, NOW(), NOW())
        ON CONFLICT (submission_id, question_id)
        DO UPDATE SET student_answer = EXCLUDED.student_answer, last_modified_at = NOW()
        "#,
    )
    .bind(payload.submission_id)
    .bind(payload.question_id)
    .bind(&payload.answer)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to auto-save answer: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(serde_json::json!({
        "message": "Answer auto-saved successfully"
    })))
}

/// Submits an attempt and grades it.
///
/// The whole operation runs in one transaction holding a row lock on
/// the submission, so two concurrent submits serialize: the loser
/// sees status != In Progress and is rejected without touching the
/// stored marks. Objective answers are graded by exact match; the
/// obtained total and pass flag are written exactly once.
/// Student only.
pub async fn submit_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
    Query(options): Query<SubmitOptions>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let submission = sqlx::query_as::<_, ExamSubmission>(
        "SELECT * FROM exam_submissions WHERE id = $1 FOR UPDATE",
    )
    .bind(submission_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    if submission.user_id != claims.user_id() {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    if submission.status != SubmissionStatus::InProgress {
        return Err(AppError::BadRequest(
            "Submission has already been submitted".to_string(),
        ));
    }

    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
        .bind(submission.exam_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let answers = sqlx::query_as::<_, AnswerForGrading>(
        "SELECT sa.id, sa.student_answer, q.question_type, q.correct_answer, q.marks
         FROM student_answers sa
         JOIN questions q ON sa.question_id = q.id
         WHERE sa.submission_id = $1",
    )
    .bind(submission_id)
    .fetch_all(&mut *tx)
    .await?;

    let mut total_marks = 0.0;

    for answer in &answers {
        let (is_correct, marks_obtained) = grade_answer(
            answer.question_type,
            answer.student_answer.as_deref(),
            &answer.correct_answer,
            answer.marks,
        );

        total_marks += marks_obtained;

        sqlx::query(
            "UPDATE student_answers SET is_correct = $1, marks_obtained = $2 WHERE id = $3",
        )
        .bind(is_correct)
        .bind(marks_obtained)
        .bind(answer.id)
        .execute(&mut *tx)
        .await?;
    }

    let is_passed = total_marks >= exam.passing_marks;
    let total_time_spent = submission
        .started_at
        .map(|started| (Utc::now() - started).num_seconds() as i32)
        .unwrap_or(0);

    sqlx::query(
        r#"
        UPDATE exam_submissions
        SET status = $1, submit_time = NOW(), total_time_spent = $2,
            obtained_marks = $3, is_passed = $4, auto_submitted = $5
        WHERE id = $6
        "#,
    )
    .bind(SubmissionStatus::Submitted)
    .bind(total_time_spent)
    .bind(total_marks)
    .bind(is_passed)
    .bind(options.auto_submitted)
    .bind(submission_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "message": "Exam submitted successfully",
        "result": {
            "obtained_marks": total_marks,
            "total_marks": exam.total_marks,
            "passing_marks": exam.passing_marks,
            "is_passed": is_passed,
            "auto_submitted": options.auto_submitted,
        },
    })))
}

/// Attaches an examiner's notes to a submitted attempt.
///
/// Purely administrative: marks are never recomputed here. This is
/// where Essay/ShortAnswer attempts get their human verdict.
/// Examiner/Admin only.
pub async fn evaluate_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission = sqlx::query_as::<_, ExamSubmission>(
        "SELECT * FROM exam_submissions WHERE id = $1",
    )
    .bind(submission_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    if !matches!(
        submission.status,
        SubmissionStatus::Submitted | SubmissionStatus::Evaluated
    ) {
        return Err(AppError::BadRequest(
            "Only submitted attempts can be evaluated".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, ExamSubmission>(
        r#"
        UPDATE exam_submissions
        SET status = $1, evaluation_notes = $2, evaluated_by = $3, evaluated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(SubmissionStatus::Evaluated)
    .bind(&payload.evaluation_notes)
    .bind(claims.user_id())
    .bind(submission_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Submission evaluated successfully",
        "submission": updated,
    })))
}

/// Fetches one submission with exam, student, evaluator and graded
/// answers. Students may only read their own attempts.
pub async fn get_submission(
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

    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = $1")
        .bind(submission.exam_id)
        .fetch_optional(&pool)
        .await?;

    let student: Option<(String, String, String)> = sqlx::query_as(
        "SELECT first_name, last_name, email FROM users WHERE id = $1",
    )
    .bind(submission.user_id)
    .fetch_optional(&pool)
    .await?;

    let evaluator: Option<(String, String)> = match submission.evaluated_by {
        Some(evaluator_id) => sqlx::query_as(
            "SELECT first_name, last_name FROM users WHERE id = $1",
        )
        .bind(evaluator_id)
        .fetch_optional(&pool)
        .await?,
        None => None,
    };

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

    Ok(Json(serde_json::json!({
        "submission": submission,
        "exam": exam,
        "student": student.map(|(first_name, last_name, email)| serde_json::json!({
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
        })),
        "evaluator": evaluator.map(|(first_name, last_name)| serde_json::json!({
            "first_name": first_name,
            "last_name": last_name,
        })),
        "answers": answers,
    })))
}

/// Lists all submissions with exam and student info, newest first.
/// Staff only.
pub async fn list_submissions(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, SubmissionSummary>(
        "SELECT s.id, s.user_id, s.exam_id, s.status, s.started_at, s.submit_time,
                s.obtained_marks, s.is_passed, s.cheating_detected,
                e.title AS exam_title, e.total_marks, e.passing_marks,
                u.first_name, u.last_name, u.email, st.student_number
         FROM exam_submissions s
         JOIN exams e ON s.exam_id = e.id
         JOIN users u ON s.user_id = u.id
         LEFT JOIN students st ON st.user_id = u.id
         ORDER BY s.created_at DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch submissions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(submissions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_correct_mcq() {
        let (is_correct, marks) =
            grade_answer(QuestionType::MultipleChoice, Some("B"), "B", 5.0);
        assert_eq!(is_correct, Some(true));
        assert_eq!(marks, 5.0);
    }

    #[test]
    fn grades_incorrect_mcq() {
        let (is_correct, marks) =
            grade_answer(QuestionType::MultipleChoice, Some("C"), "B", 5.0);
        assert_eq!(is_correct, Some(false));
        assert_eq!(marks, 0.0);
    }

    #[test]
    fn matching_is_exact_match() {
        let (is_correct, marks) = grade_answer(QuestionType::Matching, Some("1-A,2-B"), "1-A,2-B", 4.0);
        assert_eq!(is_correct, Some(true));
        assert_eq!(marks, 4.0);

        // No normalization: whitespace differences count as wrong.
        let (is_correct, marks) = grade_answer(QuestionType::Matching, Some("1-A, 2-B"), "1-A,2-B", 4.0);
        assert_eq!(is_correct, Some(false));
        assert_eq!(marks, 0.0);
    }

    #[test]
    fn essay_and_short_answer_stay_ungraded() {
        let (is_correct, marks) =
            grade_answer(QuestionType::Essay, Some("A thoughtful essay"), "n/a", 10.0);
        assert_eq!(is_correct, None);
        assert_eq!(marks, 0.0);

        let (is_correct, marks) =
            grade_answer(QuestionType::ShortAnswer, Some("42"), "42", 10.0);
        assert_eq!(is_correct, None);
        assert_eq!(marks, 0.0);
    }

    #[test]
    fn missing_answer_is_incorrect() {
        let (is_correct, marks) = grade_answer(QuestionType::TrueFalse, None, "True", 2.0);
        assert_eq!(is_correct, Some(false));
        assert_eq!(marks, 0.0);
    }

    #[test]
    fn half_right_paper_passes_at_forty() {
        // Two MCQs worth 50 each, passing marks 40: one correct answer
        // scores 50 and passes.
        let answers = [
            (QuestionType::MultipleChoice, Some("A"), "A", 50.0),
            (QuestionType::MultipleChoice, Some("D"), "B", 50.0),
        ];

        let total: f64 = answers
            .iter()
            .map(|(ty, given, key, marks)| grade_answer(*ty, *given, key, *marks).1)
            .sum();

        assert_eq!(total, 50.0);
        assert!(total >= 40.0);
    }
}
