// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Delivery mode of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "exam_type")]
pub enum ExamType {
    Online,
    Offline,
}

/// Publication state of an exam. Transitions are not enforced;
/// `publish` simply sets Published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "exam_status")]
pub enum ExamStatus {
    Draft,
    Published,
    Scheduled,
    Active,
    Completed,
}

/// Represents the 'exams' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Duration in minutes.
    pub duration: i32,
    pub total_questions: i32,
    pub total_marks: f64,
    pub passing_marks: f64,

    pub exam_type: ExamType,
    pub status: ExamStatus,

    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,

    pub requires_proctoring: bool,
    /// When set, the question set is served in random order.
    pub shuffle_questions: bool,
    pub negative_marking_enabled: bool,
    pub negative_marks: Option<f64>,

    pub course_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration: i32,
    #[validate(range(min = 1))]
    pub total_questions: i32,
    #[validate(range(min = 0.0))]
    pub total_marks: f64,
    #[validate(range(min = 0.0))]
    pub passing_marks: f64,
    pub exam_type: Option<ExamType>,
    pub status: Option<ExamStatus>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub requires_proctoring: Option<bool>,
    pub shuffle_questions: Option<bool>,
    pub negative_marking_enabled: Option<bool>,
    pub negative_marks: Option<f64>,
    pub course_id: Option<i64>,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub duration: Option<i32>,
    #[validate(range(min = 1))]
    pub total_questions: Option<i32>,
    #[validate(range(min = 0.0))]
    pub total_marks: Option<f64>,
    #[validate(range(min = 0.0))]
    pub passing_marks: Option<f64>,
    pub exam_type: Option<ExamType>,
    pub status: Option<ExamStatus>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub requires_proctoring: Option<bool>,
    pub shuffle_questions: Option<bool>,
    pub negative_marking_enabled: Option<bool>,
    pub negative_marks: Option<f64>,
    pub course_id: Option<i64>,
}
