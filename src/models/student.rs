use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Student profile row joined with its user account and master data
/// names. The bare 'students' row is never served alone.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentResponse {
    pub id: i64,
    pub user_id: i64,
    pub student_number: Option<String>,
    pub class_id: Option<i64>,
    pub class_name: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub enrollment_year: Option<i32>,
    pub current_semester: Option<i32>,
    pub is_active: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// DTO for creating a student (user account + profile).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
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
    pub student_number: Option<String>,
    pub class_id: Option<i64>,
    pub department_id: Option<i64>,
    pub enrollment_year: Option<i32>,
    #[validate(range(min = 1, max = 16))]
    pub current_semester: Option<i32>,
}

/// DTO for updating a student profile (and linked user basics).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 50))]
    pub student_number: Option<String>,
    pub class_id: Option<i64>,
    pub department_id: Option<i64>,
    pub enrollment_year: Option<i32>,
    #[validate(range(min = 1, max = 16))]
    pub current_semester: Option<i32>,
    pub is_active: Option<bool>,
}
