// tests/api_tests.rs

use examhub::{config::Config, routes, state::AppState};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // Note: For Postgres, you must have a running database.
    // We'll read from DATABASE_URL environment variable.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState { pool, config };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
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

#[tokio::test]
async fn health_check_works() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/api/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "first_name": "Test",
            "last_name": "User",
            "email": unique_email("reg"),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["role"], "Student");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: password too short
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "first_name": "Test",
            "last_name": "User",
            "email": unique_email("short"),
            "password": "1234"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_duplicate_email_conflicts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("dup");

    let payload = serde_json::json!({
        "first_name": "Dup",
        "last_name": "User",
        "email": email,
        "password": "password123"
    });

    let first = client
        .post(&format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(&format!("{}/api/auth/register", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("login");

    client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "first_name": "Login",
            "last_name": "Test",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();

    let response = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "email": email,
            "password": "wrong-password"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/exams", address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn students_cannot_reach_admin_routes() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = unique_email("forbidden");

    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "first_name": "No",
            "last_name": "Access",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let token = register["token"].as_str().unwrap();

    let response = client
        .get(&format!("{}/api/users", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn question_csv_upload_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    // Build an examiner account
    let email = unique_email("csv");
    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "first_name": "Csv",
            "last_name": "Uploader",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let user_id = register["user"]["id"].as_i64().unwrap();

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = 'Examiner'
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .execute(&pool)
    .await
    .unwrap();

    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();

    let csv = "questionText,questionType,marks,difficulty,topic,optionA,optionB,optionC,optionD,correctAnswer,explanation\n\
               What is 2+2?,Multiple Choice,5,Easy,Arithmetic,3,4,5,6,B,Basic addition\n\
               The sky is blue.,True/False,2,,,,,,,True,\n";

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(csv.as_bytes().to_vec()).file_name("questions.csv"),
    );

    let response = client
        .post(&format!("{}/api/questions/upload/csv", address))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["questions_count"], 2);

    // A malformed row rejects the whole batch.
    let bad_csv = "questionText,questionType,marks,difficulty,topic,optionA,optionB,optionC,optionD,correctAnswer,explanation\n\
                   Broken,Oral,5,Easy,,,,,,A,\n";
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bad_csv.as_bytes().to_vec()).file_name("questions.csv"),
    );

    let response = client
        .post(&format!("{}/api/questions/upload/csv", address))
        .header("Authorization", format!("Bearer {}", token))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn department_crud_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;

    // Build an admin account
    let email = unique_email("admin");
    let register: serde_json::Value = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "first_name": "Admin",
            "last_name": "User",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let user_id = register["user"]["id"].as_i64().unwrap();

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = 'Admin'
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .execute(&pool)
    .await
    .unwrap();

    // Re-login so the token carries the Admin role
    let login: serde_json::Value = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();
    assert_eq!(login["user"]["role"], "Admin");

    // Create
    let code = &uuid::Uuid::new_v4().to_string()[..8];
    let created: serde_json::Value = client
        .post(&format!("{}/api/departments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": format!("Department {}", code),
            "code": code,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let department_id = created["id"].as_i64().unwrap();

    // Duplicate code conflicts
    let duplicate = client
        .post(&format!("{}/api/departments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "name": format!("Department {} again", code),
            "code": code,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);

    // Update
    let update = client
        .put(&format!("{}/api/departments/{}", address, department_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "description": "Updated" }))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status().as_u16(), 200);

    // Delete
    let delete = client
        .delete(&format!("{}/api/departments/{}", address, department_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status().as_u16(), 204);
}
