// src/handlers/question.rs

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{
        AddQuestionsRequest, CreateQuestionRequest, Question, UpdateQuestionRequest,
    },
    utils::{csv::parse_questions_csv, html::clean_html},
};

/// Creates a question.
/// Examiner/Admin only.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions
        (question_text, question_type, marks, difficulty, option_a, option_b, option_c,
         option_d, correct_answer, explanation, topic, image_url, course_id)
        VALUES ($1, $2, $3, COALESCE($4, 'Medium'), $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(clean_html(&payload.question_text))
    .bind(payload.question_type)
    .bind(payload.marks)
    .bind(payload.difficulty)
    .bind(&payload.option_a)
    .bind(&payload.option_b)
    .bind(&payload.option_c)
    .bind(&payload.option_d)
    .bind(&payload.correct_answer)
    .bind(payload.explanation.as_deref().map(clean_html))
    .bind(&payload.topic)
    .bind(&payload.image_url)
    .bind(payload.course_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists all questions, newest first.
pub async fn list_questions(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let questions =
        sqlx::query_as::<_, Question>("SELECT * FROM questions ORDER BY created_at DESC")
            .fetch_all(&pool)
            .await?;

    Ok(Json(questions))
}

/// Fetches a question by ID.
pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Updates a question by ID.
/// Examiner/Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");
    let mut any = false;

    if let Some(question_text) = payload.question_text {
        separated.push("question_text = ");
        separated.push_bind_unseparated(clean_html(&question_text));
        any = true;
    }

    if let Some(question_type) = payload.question_type {
        separated.push("question_type = ");
        separated.push_bind_unseparated(question_type);
        any = true;
    }

    if let Some(marks) = payload.marks {
        separated.push("marks = ");
        separated.push_bind_unseparated(marks);
        any = true;
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
        any = true;
    }

    if let Some(option_a) = payload.option_a {
        separated.push("option_a = ");
        separated.push_bind_unseparated(option_a);
        any = true;
    }

    if let Some(option_b) = payload.option_b {
        separated.push("option_b = ");
        separated.push_bind_unseparated(option_b);
        any = true;
    }

    if let Some(option_c) = payload.option_c {
        separated.push("option_c = ");
        separated.push_bind_unseparated(option_c);
        any = true;
    }

    if let Some(option_d) = payload.option_d {
        separated.push("option_d = ");
        separated.push_bind_unseparated(option_d);
        any = true;
    }

    if let Some(correct_answer) = payload.correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
        any = true;
    }

    if let Some(explanation) = payload.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(clean_html(&explanation));
        any = true;
    }

    if let Some(topic) = payload.topic {
        separated.push("topic = ");
        separated.push_bind_unseparated(topic);
        any = true;
    }

    if let Some(image_url) = payload.image_url {
        separated.push("image_url = ");
        separated.push_bind_unseparated(image_url);
        any = true;
    }

    if let Some(course_id) = payload.course_id {
        separated.push("course_id = ");
        separated.push_bind_unseparated(course_id);
        any = true;
    }

    if !any {
        return Ok(StatusCode::OK);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
/// Examiner/Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk-creates questions from an uploaded CSV.
///
/// The whole batch is inserted in one transaction; a malformed row
/// rejects the entire upload with its line number.
/// Examiner/Admin only.
pub async fn upload_questions_csv(
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

    let questions = parse_questions_csv(&file_bytes)?;
    let count = questions.len();

    let mut tx = pool.begin().await?;

    for question in questions {
        sqlx::query(
            r#"
            INSERT INTO questions
            (question_text, question_type, marks, difficulty, option_a, option_b,
             option_c, option_d, correct_answer, explanation, topic)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(clean_html(&question.question_text))
        .bind(question.question_type)
        .bind(question.marks)
        .bind(question.difficulty)
        .bind(&question.option_a)
        .bind(&question.option_b)
        .bind(&question.option_c)
        .bind(&question.option_d)
        .bind(&question.correct_answer)
        .bind(question.explanation.as_deref().map(clean_html))
        .bind(&question.topic)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": format!("{} questions uploaded successfully", count),
            "questions_count": count,
        })),
    ))
}

/// Attaches questions to an exam in the given display order.
/// Examiner/Admin only.
pub async fn add_questions_to_exam(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<AddQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.question_ids.is_empty() {
        return Err(AppError::BadRequest("No question ids given".to_string()));
    }

    let _exam: i64 = sqlx::query_scalar("SELECT id FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let mut tx = pool.begin().await?;
    let mut attached = 0;

    for (idx, question_id) in payload.question_ids.iter().enumerate() {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(&mut *tx)
            .await?;

        if exists.is_none() {
            continue;
        }

        let result = sqlx::query(
            "INSERT INTO exam_questions (exam_id, question_id, display_order)
             VALUES ($1, $2, $3)
             ON CONFLICT (exam_id, question_id) DO NOTHING",
        )
        .bind(exam_id)
        .bind(question_id)
        .bind((idx + 1) as i32)
        .execute(&mut *tx)
        .await?;

        attached += result.rows_affected();
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Questions added to exam successfully",
            "attached_count": attached,
        })),
    ))
}

/// Detaches a question from an exam.
/// Examiner/Admin only.
pub async fn remove_question_from_exam(
    State(pool): State<PgPool>,
    Path((exam_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "DELETE FROM exam_questions WHERE exam_id = $1 AND question_id = $2",
    )
    .bind(exam_id)
    .bind(question_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found in exam".to_string()));
    }

    Ok(Json(serde_json::json!({
        "message": "Question removed from exam successfully"
    })))
}
