use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'classes' table (a cohort of students).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub department_id: Option<i64>,
    pub academic_year: Option<String>,
    pub semester: Option<String>,
    pub is_active: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a class.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    pub department_id: Option<i64>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
    #[validate(length(max = 20))]
    pub semester: Option<String>,
    pub is_active: Option<bool>,
}

/// DTO for updating a class. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClassRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub department_id: Option<i64>,
    #[validate(length(max = 20))]
    pub academic_year: Option<String>,
    #[validate(length(max = 20))]
    pub semester: Option<String>,
    pub is_active: Option<bool>,
}
