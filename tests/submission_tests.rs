// tests/submission_tests.rs
//
// End-to-end coverage of the exam attempt lifecycle:
// start -> auto-save -> submit -> evaluate, plus the proctoring
// threshold rule.

use examhub::{config::Config, routes, state::AppState};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

async fn spawn_app() -> String {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn test_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB")
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers a user, optionally grants an extra role, and returns
/// (token, user_id) from a fresh login.
async fn create_account(
    client: &reqwest::Client,
    address: &str,
    pool: &PgPool,
    extra_role: Option<&str>,
) -> (String, i64) {
    let email = unique_email("user");
    let password = "password123";

    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "first_name": "Test",
            "last_name": "Account",
            "email": email,
            "password": password
        }))
        .send()
        .await
        .expect("Register failed")
        .json()
        .await
        .expect("Failed to parse register json");

    let user_id = register["user"]["id"].as_i64().expect("User id missing");

    if let Some(role) = extra_role {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = $2
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
    }

    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    (login["token"].as_str().unwrap().to_string(), user_id)
}

/// Creates an exam with two 50-mark MCQs (keys A and B) and returns
/// (exam_id, question_ids).
async fn seed_exam(
    client: &reqwest::Client,
    address: &str,
    staff_token: &str,
    passing_marks: f64,
) -> (i64, Vec<i64>) {
    let exam: serde_json::Value = client
        .post(&format!("{}/api/exams", address))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&serde_json::json!({
            "title": "Midterm",
            "duration": 60,
            "total_questions": 2,
            "total_marks": 100.0,
            "passing_marks": passing_marks,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_i64().expect("exam id missing");

    let mut question_ids = Vec::new();
    for correct in ["A", "B"] {
        let question: serde_json::Value = client
            .post(&format!("{}/api/questions", address))
            .header("Authorization", format!("Bearer {}", staff_token))
            .json(&serde_json::json!({
                "question_text": format!("Pick {}", correct),
                "question_type": "Multiple Choice",
                "marks": 50.0,
                "option_a": "first",
                "option_b": "second",
                "option_c": "third",
                "option_d": "fourth",
                "correct_answer": correct,
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        question_ids.push(question["id"].as_i64().expect("question id missing"));
    }

    let attach = client
        .post(&format!("{}/api/questions/{}/add-questions", address, exam_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&serde_json::json!({ "question_ids": question_ids }))
        .send()
        .await
        .unwrap();
    assert_eq!(attach.status().as_u16(), 201);

    (exam_id, question_ids)
}

async fn auto_save(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    submission_id: i64,
    question_id: i64,
    answer: &str,
) -> u16 {
    client
        .post(&format!("{}/api/submissions/auto-save", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "submission_id": submission_id,
            "question_id": question_id,
            "answer": answer,
        }))
        .send()
        .await
        .unwrap()
        .status()
        .as_u16()
}

#[tokio::test]
async fn exam_lifecycle_grades_and_locks_the_attempt() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    let (staff_token, _) = create_account(&client, &address, &pool, Some("Examiner")).await;
    let (student_token, _) = create_account(&client, &address, &pool, None).await;

    // Exam with passing_marks=40 and two 50-mark questions.
    let (exam_id, question_ids) = seed_exam(&client, &address, &staff_token, 40.0).await;

    // 1. Start the attempt.
    let start: serde_json::Value = client
        .post(&format!("{}/api/submissions/exams/{}/start", address, exam_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let submission_id = start["submission"]["id"].as_i64().expect("submission id");
    let served_questions = start["submission"]["questions"].as_array().unwrap();
    assert_eq!(served_questions.len(), 2);
    // Answer keys must never be served to the student.
    for question in served_questions {
        assert!(question.get("correct_answer").is_none());
    }

    // 2. A second start while In Progress is rejected.
    let second_start = client
        .post(&format!("{}/api/submissions/exams/{}/start", address, exam_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(second_start.status().as_u16(), 400);

    // 3. Auto-save: Q1 gets an early wrong answer, then the right one.
    assert_eq!(
        auto_save(&client, &address, &student_token, submission_id, question_ids[0], "C").await,
        200
    );
    assert_eq!(
        auto_save(&client, &address, &student_token, submission_id, question_ids[0], "A").await,
        200
    );
    // Q2: wrong answer.
    assert_eq!(
        auto_save(&client, &address, &student_token, submission_id, question_ids[1], "D").await,
        200
    );

    // Idempotent upsert: exactly one row per question, second value wins.
    let row_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM student_answers WHERE submission_id = $1 AND question_id = $2",
    )
    .bind(submission_id)
    .bind(question_ids[0])
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row_count, 1);

    let saved_answer: String = sqlx::query_scalar(
        "SELECT student_answer FROM student_answers
         WHERE submission_id = $1 AND question_id = $2",
    )
    .bind(submission_id)
    .bind(question_ids[0])
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(saved_answer, "A");

    // 4. Another student cannot write into this attempt.
    let (intruder_token, _) = create_account(&client, &address, &pool, None).await;
    assert_eq!(
        auto_save(&client, &address, &intruder_token, submission_id, question_ids[0], "B").await,
        403
    );

    // 5. Submit: one of two 50-mark questions correct -> 50 >= 40 passes.
    let submit: serde_json::Value = client
        .post(&format!("{}/api/submissions/{}/submit", address, submission_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(submit["result"]["obtained_marks"], 50.0);
    assert_eq!(submit["result"]["is_passed"], true);

    // Invariant: obtained_marks equals the sum over the answer rows.
    let (obtained, answer_sum): (f64, f64) = sqlx::query_as(
        "SELECT s.obtained_marks,
                (SELECT COALESCE(SUM(marks_obtained), 0) FROM student_answers
                 WHERE submission_id = s.id)
         FROM exam_submissions s WHERE s.id = $1",
    )
    .bind(submission_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(obtained, answer_sum);
    assert_eq!(obtained, 50.0);

    // 6. Re-submitting is rejected and marks stay untouched.
    let resubmit = client
        .post(&format!("{}/api/submissions/{}/submit", address, submission_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resubmit.status().as_u16(), 400);

    // Auto-save after submit is rejected too.
    assert_eq!(
        auto_save(&client, &address, &student_token, submission_id, question_ids[0], "B").await,
        400
    );

    let marks_after: Option<f64> =
        sqlx::query_scalar("SELECT obtained_marks FROM exam_submissions WHERE id = $1")
            .bind(submission_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(marks_after, Some(50.0));

    // 7. The student sees the result; evaluation attaches notes only.
    let my_results: serde_json::Value = client
        .get(&format!("{}/api/results/my-results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        my_results
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["id"].as_i64() == Some(submission_id))
    );

    let evaluate: serde_json::Value = client
        .post(&format!("{}/api/submissions/{}/evaluate", address, submission_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&serde_json::json!({ "evaluation_notes": "Solid attempt" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(evaluate["submission"]["status"], "Evaluated");
    assert_eq!(evaluate["submission"]["obtained_marks"], 50.0);

    // Once evaluated, a fresh attempt can be started.
    let restart = client
        .post(&format!("{}/api/submissions/exams/{}/start", address, exam_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(restart.status().as_u16(), 201);
}

#[tokio::test]
async fn fourth_high_severity_event_flags_cheating() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    // Admin can author exams and read proctoring reports.
    let (staff_token, _) = create_account(&client, &address, &pool, Some("Admin")).await;
    let (student_token, _) = create_account(&client, &address, &pool, None).await;
    let (exam_id, _) = seed_exam(&client, &address, &staff_token, 40.0).await;

    let start: serde_json::Value = client
        .post(&format!("{}/api/submissions/exams/{}/start", address, exam_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let submission_id = start["submission"]["id"].as_i64().unwrap();

    let cheating_detected = |pool: PgPool, submission_id: i64| async move {
        sqlx::query_scalar::<_, bool>(
            "SELECT cheating_detected FROM exam_submissions WHERE id = $1",
        )
        .bind(submission_id)
        .fetch_one(&pool)
        .await
        .unwrap()
    };

    for i in 0..3 {
        let response = client
            .post(&format!("{}/api/proctoring/log", address))
            .header("Authorization", format!("Bearer {}", student_token))
            .json(&serde_json::json!({
                "submission_id": submission_id,
                "event_type": "Tab Switch",
                "severity": "High",
                "description": format!("tab switch #{}", i + 1),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    // Three High events: still below the threshold.
    assert!(!cheating_detected(pool.clone(), submission_id).await);

    // A Low-severity event does not trip it either.
    client
        .post(&format!("{}/api/proctoring/log", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "submission_id": submission_id,
            "event_type": "Right Click",
            "severity": "Low",
        }))
        .send()
        .await
        .unwrap();
    assert!(!cheating_detected(pool.clone(), submission_id).await);

    // The fourth High event flips the flag.
    client
        .post(&format!("{}/api/proctoring/log", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "submission_id": submission_id,
            "event_type": "Fullscreen Exit",
            "severity": "High",
        }))
        .send()
        .await
        .unwrap();
    assert!(cheating_detected(pool.clone(), submission_id).await);

    // Report reflects the event mix.
    let report: serde_json::Value = client
        .get(&format!("{}/api/proctoring/{}/report", address, submission_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["report"]["total_events"], 5);
    assert_eq!(report["report"]["high_severity"], 4);
    assert_eq!(report["report"]["low_severity"], 1);
}
