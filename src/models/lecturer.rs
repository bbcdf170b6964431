use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Lecturer profile row joined with its user account. The bare
/// 'lecturers' row is never served alone.
#[derive(Debug, Serialize, FromRow)]
pub struct LecturerResponse {
    pub id: i64,
    pub user_id: i64,
    pub employee_id: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub qualification: Option<String>,
    pub specialization: Option<String>,
    pub joining_date: Option<chrono::NaiveDate>,
    pub is_active: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// DTO for creating a lecturer (user account + profile).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLecturerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 50))]
    pub employee_id: Option<String>,
    pub department_id: Option<i64>,
    #[validate(length(max = 100))]
    pub qualification: Option<String>,
    #[validate(length(max = 100))]
    pub specialization: Option<String>,
    pub joining_date: Option<chrono::NaiveDate>,
}

/// DTO for updating a lecturer profile (and linked user basics).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLecturerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 50))]
    pub employee_id: Option<String>,
    pub department_id: Option<i64>,
    #[validate(length(max = 100))]
    pub qualification: Option<String>,
    #[validate(length(max = 100))]
    pub specialization: Option<String>,
    pub joining_date: Option<chrono::NaiveDate>,
    pub is_active: Option<bool>,
}
