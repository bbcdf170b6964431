// src/handlers/student.rs

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::DEFAULT_STUDENT_PASSWORD,
    error::{AppError, is_unique_violation},
    models::student::{CreateStudentRequest, StudentResponse, UpdateStudentRequest},
    utils::{csv::parse_students_csv, hash::hash_password},
};

const STUDENT_SELECT: &str = "SELECT s.id, s.user_id, s.student_number, s.class_id,
            c.name AS class_name, s.department_id, d.name AS department_name,
            s.enrollment_year, s.current_semester, s.is_active,
            u.first_name, u.last_name, u.email, u.phone
     FROM students s
     JOIN users u ON s.user_id = u.id
     LEFT JOIN classes c ON s.class_id = c.id
     LEFT JOIN departments d ON s.department_id = d.id";

/// Lists all students with their user accounts.
pub async fn list_students(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let students =
        sqlx::query_as::<_, StudentResponse>(&format!("{STUDENT_SELECT} ORDER BY s.id DESC"))
            .fetch_all(&pool)
            .await?;

    Ok(Json(students))
}

/// Fetches a student by ID.
pub async fn get_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student =
        sqlx::query_as::<_, StudentResponse>(&format!("{STUDENT_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(student))
}

/// Creates a student: user account, Student role and profile row in
/// one transaction.
/// Admin only.
pub async fn create_student(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (first_name, last_name, email, password, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.phone)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' already registered", payload.email))
        } else {
            tracing::error!("Failed to create student user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = 'Student'
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let student_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO students
        (user_id, student_number, class_id, department_id, enrollment_year, current_semester)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.student_number)
    .bind(payload.class_id)
    .bind(payload.department_id)
    .bind(payload.enrollment_year)
    .bind(payload.current_semester)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Student number already exists".to_string())
        } else {
            AppError::InternalServerError(e.to_string())
        }
    })?;

    tx.commit().await?;

    let student =
        sqlx::query_as::<_, StudentResponse>(&format!("{STUDENT_SELECT} WHERE s.id = $1"))
            .bind(student_id)
            .fetch_one(&pool)
            .await?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// Updates a student profile and the linked user basics.
/// Admin only.
pub async fn update_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id: i64 = sqlx::query_scalar("SELECT user_id FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    let mut tx = pool.begin().await?;

    if let Some(first_name) = payload.first_name {
        sqlx::query("UPDATE users SET first_name = $1 WHERE id = $2")
            .bind(first_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(last_name) = payload.last_name {
        sqlx::query("UPDATE users SET last_name = $1 WHERE id = $2")
            .bind(last_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(phone) = payload.phone {
        sqlx::query("UPDATE users SET phone = $1 WHERE id = $2")
            .bind(phone)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(student_number) = payload.student_number {
        sqlx::query("UPDATE students SET student_number = $1 WHERE id = $2")
            .bind(student_number)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("Student number already exists".to_string())
                } else {
                    AppError::InternalServerError(e.to_string())
                }
            })?;
    }

    if let Some(class_id) = payload.class_id {
        sqlx::query("UPDATE students SET class_id = $1 WHERE id = $2")
            .bind(class_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(department_id) = payload.department_id {
        sqlx::query("UPDATE students SET department_id = $1 WHERE id = $2")
            .bind(department_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(enrollment_year) = payload.enrollment_year {
        sqlx::query("UPDATE students SET enrollment_year = $1 WHERE id = $2")
            .bind(enrollment_year)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(current_semester) = payload.current_semester {
        sqlx::query("UPDATE students SET current_semester = $1 WHERE id = $2")
            .bind(current_semester)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(is_active) = payload.is_active {
        sqlx::query("UPDATE students SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a student. Removing the user row cascades to the profile,
/// submissions and answers.
/// Admin only.
pub async fn delete_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id: Option<i64> = sqlx::query_scalar("SELECT user_id FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    let user_id = user_id.ok_or(AppError::NotFound("Student not found".to_string()))?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk-imports students from an uploaded CSV.
///
/// Each row creates a user + Student role + profile in its own
/// transaction; failed rows are collected and reported so one bad row
/// does not abort the batch.
/// Admin only.
pub async fn import_students_csv(
    State(pool): State<PgPool>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file_bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            file_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?,
            );
        }
    }

    let file_bytes = file_bytes.ok_or(AppError::BadRequest("No file uploaded".to_string()))?;

    let rows = parse_students_csv(&file_bytes)?;
    let total_rows = rows.len();
    let mut errors = Vec::new();

    for (idx, row) in rows.into_iter().enumerate() {
        let row_number = idx + 1;

        if let Err(message) = import_student_row(&pool, &row).await {
            errors.push(serde_json::json!({
                "row": row_number,
                "email": row.email,
                "error": message,
            }));
        }
    }

    Ok(Json(serde_json::json!({
        "message": "Import completed",
        "total_rows": total_rows,
        "success_count": total_rows - errors.len(),
        "error_count": errors.len(),
        "errors": errors,
    })))
}

async fn import_student_row(
    pool: &PgPool,
    row: &crate::utils::csv::StudentCsvRow,
) -> Result<(), String> {
    let password = row
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_STUDENT_PASSWORD);
    let hashed_password = hash_password(password).map_err(|e| e.to_string())?;

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;

    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (first_name, last_name, email, password, phone)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&row.first_name)
    .bind(&row.last_name)
    .bind(&row.email)
    .bind(&hashed_password)
    .bind(&row.phone)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            "Email already exists".to_string()
        } else {
            e.to_string()
        }
    })?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = 'Student'
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| e.to_string())?;

    sqlx::query(
        r#"
        INSERT INTO students
        (user_id, student_number, class_id, department_id, enrollment_year, current_semester)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user_id)
    .bind(&row.student_number)
    .bind(row.class_id)
    .bind(row.department_id)
    .bind(row.enrollment_year)
    .bind(row.current_semester)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            "Student number already exists".to_string()
        } else {
            e.to_string()
        }
    })?;

    tx.commit().await.map_err(|e| e.to_string())?;

    Ok(())
}
