// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::QuestionType;

/// Lifecycle state of one exam attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_status")]
pub enum SubmissionStatus {
    #[sqlx(rename = "Not Started")]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[sqlx(rename = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    Submitted,
    Evaluated,
    Failed,
}

/// Represents the 'exam_submissions' table: one row per attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamSubmission {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,

    pub status: SubmissionStatus,

    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub submit_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Seconds between start and submit.
    pub total_time_spent: Option<i32>,

    /// Sum of marks_obtained over the attempt's answers, fixed at
    /// submit time and never recomputed.
    pub obtained_marks: Option<f64>,
    pub is_passed: Option<bool>,

    pub auto_submitted: bool,

    pub cheating_detected: bool,
    pub cheating_details: Option<serde_json::Value>,

    pub evaluated_by: Option<i64>,
    pub evaluation_notes: Option<String>,
    pub evaluated_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for the periodic answer auto-save.
#[derive(Debug, Deserialize, Validate)]
pub struct AutoSaveRequest {
    pub submission_id: i64,
    pub question_id: i64,
    #[validate(length(max = 20000))]
    pub answer: String,
}

/// Query options for submit; the client sets `auto_submitted` when
/// the exam timer ran out. Either way the attempt goes through the
/// same grading path.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitOptions {
    #[serde(default)]
    pub auto_submitted: bool,
}

/// DTO for the manual evaluation step.
#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateRequest {
    #[validate(length(max = 10000))]
    pub evaluation_notes: Option<String>,
}

/// Submission list row joined with exam and student info (staff view).
#[derive(Debug, Serialize, FromRow)]
pub struct SubmissionSummary {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub status: SubmissionStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub submit_time: Option<chrono::DateTime<chrono::Utc>>,
    pub obtained_marks: Option<f64>,
    pub is_passed: Option<bool>,
    pub cheating_detected: bool,
    pub exam_title: String,
    pub total_marks: f64,
    pub passing_marks: f64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_number: Option<String>,
}

/// One answer joined with its question, for result review.
#[derive(Debug, Serialize, FromRow)]
pub struct AnswerDetail {
    pub id: i64,
    pub question_id: i64,
    pub student_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub marks_obtained: Option<f64>,
    pub question_text: String,
    pub question_type: QuestionType,
    pub marks: f64,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// A student's own result row joined with exam info.
#[derive(Debug, Serialize, FromRow)]
pub struct MyResult {
    pub id: i64,
    pub exam_id: i64,
    pub status: SubmissionStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub submit_time: Option<chrono::DateTime<chrono::Utc>>,
    pub obtained_marks: Option<f64>,
    pub is_passed: Option<bool>,
    pub exam_title: String,
    pub total_marks: f64,
    pub passing_marks: f64,
    pub duration: i32,
}
