// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

/// Question kinds. MultipleChoice, TrueFalse and Matching are graded
/// automatically by exact answer match; ShortAnswer and Essay always
/// go through manual evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "question_type")]
pub enum QuestionType {
    #[sqlx(rename = "Multiple Choice")]
    #[serde(rename = "Multiple Choice")]
    MultipleChoice,
    #[sqlx(rename = "True/False")]
    #[serde(rename = "True/False")]
    TrueFalse,
    #[sqlx(rename = "Short Answer")]
    #[serde(rename = "Short Answer")]
    ShortAnswer,
    Essay,
    Matching,
}

impl QuestionType {
    /// Whether the grader can score this type by comparing the stored
    /// answer key against the student's answer.
    pub fn is_auto_gradable(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice | QuestionType::TrueFalse | QuestionType::Matching
        )
    }

    /// Parses the human-readable label used in CSV imports.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Multiple Choice" => Some(QuestionType::MultipleChoice),
            "True/False" => Some(QuestionType::TrueFalse),
            "Short Answer" => Some(QuestionType::ShortAnswer),
            "Essay" => Some(QuestionType::Essay),
            "Matching" => Some(QuestionType::Matching),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "difficulty_level")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Easy" => Some(Difficulty::Easy),
            "Medium" => Some(Difficulty::Medium),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Represents the 'questions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub question_text: String,

    pub question_type: QuestionType,

    pub marks: f64,

    pub difficulty: Difficulty,

    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,

    /// The correct answer key (e.g. "A" or "True").
    pub correct_answer: String,

    /// Explanation shown when reviewing results.
    pub explanation: Option<String>,

    pub topic: Option<String>,

    pub image_url: Option<String>,

    pub course_id: Option<i64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for serving a question to a student taking an exam
/// (excludes the answer key and explanation).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub marks: f64,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub image_url: Option<String>,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub question_text: String,
    pub question_type: QuestionType,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub marks: f64,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 1000))]
    pub option_a: Option<String>,
    #[validate(length(max = 1000))]
    pub option_b: Option<String>,
    #[validate(length(max = 1000))]
    pub option_c: Option<String>,
    #[validate(length(max = 1000))]
    pub option_d: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub correct_answer: String,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(length(max = 100))]
    pub topic: Option<String>,
    #[validate(length(max = 255), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub course_id: Option<i64>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub marks: Option<f64>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 1000))]
    pub option_a: Option<String>,
    #[validate(length(max = 1000))]
    pub option_b: Option<String>,
    #[validate(length(max = 1000))]
    pub option_c: Option<String>,
    #[validate(length(max = 1000))]
    pub option_d: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub correct_answer: Option<String>,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(length(max = 100))]
    pub topic: Option<String>,
    #[validate(length(max = 255), custom(function = validate_url_string))]
    pub image_url: Option<String>,
    pub course_id: Option<i64>,
}

/// DTO for attaching questions to an exam in display order.
#[derive(Debug, Deserialize)]
pub struct AddQuestionsRequest {
    pub question_ids: Vec<i64>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
