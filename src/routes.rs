// src/routes.rs

use axum::{
    Json, Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        analytics, auth, class, course, department, exam, lecturer, proctoring, question, result,
        student, submission, user,
    },
    state::AppState,
    utils::jwt::{
        admin_middleware, auth_middleware, proctor_middleware, staff_middleware, student_middleware,
    },
};

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Server is running",
        "timestamp": chrono::Utc::now(),
    }))
}

/// Assembles the main application router.
///
/// * Nests one sub-router per API area (auth, exams, submissions, ...).
/// * Layers authentication and role checks per route group.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/profile", get(auth::get_profile).put(auth::update_profile))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let user_routes = Router::new()
        .route("/{id}", get(user::get_user))
        .merge(
            Router::new()
                .route("/", get(user::list_users).post(user::create_user))
                .route("/{id}", put(user::update_user).delete(user::delete_user))
                .route("/roles", get(user::list_roles))
                .route("/assign-role", post(user::assign_role))
                .route("/remove-role", post(user::remove_role))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{id}", get(exam::get_exam))
        .merge(
            Router::new()
                .route("/", post(exam::create_exam))
                .route("/{id}", put(exam::update_exam).delete(exam::delete_exam))
                .route("/{id}/publish", post(exam::publish_exam))
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let question_routes = Router::new()
        .route("/", get(question::list_questions))
        .route("/{id}", get(question::get_question))
        .merge(
            Router::new()
                .route("/", post(question::create_question))
                .route(
                    "/{id}",
                    put(question::update_question).delete(question::delete_question),
                )
                .route("/upload/csv", post(question::upload_questions_csv))
                .route("/{exam_id}/add-questions", post(question::add_questions_to_exam))
                .route(
                    "/{exam_id}/questions/{question_id}",
                    delete(question::remove_question_from_exam),
                )
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let submission_routes = Router::new()
        .route("/auto-save", post(submission::auto_save_answer))
        .route("/{submission_id}", get(submission::get_submission))
        .merge(
            Router::new()
                .route("/exams/{exam_id}/start", post(submission::start_exam))
                .route("/{submission_id}/submit", post(submission::submit_exam))
                .layer(middleware::from_fn(student_middleware)),
        )
        .merge(
            Router::new()
                .route("/", get(submission::list_submissions))
                .route(
                    "/{submission_id}/evaluate",
                    post(submission::evaluate_submission),
                )
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let proctoring_routes = Router::new()
        .route("/log", post(proctoring::log_event))
        .route("/{submission_id}/logs", get(proctoring::get_logs))
        .merge(
            Router::new()
                .route("/{submission_id}/report", get(proctoring::get_report))
                .layer(middleware::from_fn(proctor_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let analytics_routes = Router::new()
        .route("/students/{student_id}", get(analytics::get_student_analytics))
        .merge(
            Router::new()
                .route("/", get(analytics::get_analytics))
                .route("/exams/{exam_id}", get(analytics::get_exam_analytics))
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let result_routes = Router::new()
        .route("/{submission_id}/details", get(result::result_details))
        .merge(
            Router::new()
                .route("/my-results", get(result::my_results))
                .layer(middleware::from_fn(student_middleware)),
        )
        .merge(
            Router::new()
                .route("/", get(result::all_results))
                .route("/exam/{exam_id}/statistics", get(result::exam_statistics))
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let department_routes = Router::new()
        .route("/", get(department::list_departments))
        .route("/{id}", get(department::get_department))
        .merge(
            Router::new()
                .route("/", post(department::create_department))
                .route(
                    "/{id}",
                    put(department::update_department).delete(department::delete_department),
                )
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let course_routes = Router::new()
        .route("/", get(course::list_courses))
        .route("/{id}", get(course::get_course))
        .merge(
            Router::new()
                .route("/", post(course::create_course))
                .route("/{id}", put(course::update_course).delete(course::delete_course))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let class_routes = Router::new()
        .route("/", get(class::list_classes))
        .route("/{id}", get(class::get_class))
        .merge(
            Router::new()
                .route("/", post(class::create_class))
                .route("/{id}", put(class::update_class).delete(class::delete_class))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let lecturer_routes = Router::new()
        .route("/", get(lecturer::list_lecturers))
        .route("/{id}", get(lecturer::get_lecturer))
        .merge(
            Router::new()
                .route("/", post(lecturer::create_lecturer))
                .route(
                    "/{id}",
                    put(lecturer::update_lecturer).delete(lecturer::delete_lecturer),
                )
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let student_routes = Router::new()
        .route("/", get(student::list_students))
        .route("/{id}", get(student::get_student))
        .merge(
            Router::new()
                .route("/", post(student::create_student))
                .route(
                    "/{id}",
                    put(student::update_student).delete(student::delete_student),
                )
                .route("/import-csv", post(student::import_students_csv))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/submissions", submission_routes)
        .nest("/api/proctoring", proctoring_routes)
        .nest("/api/analytics", analytics_routes)
        .nest("/api/results", result_routes)
        .nest("/api/departments", department_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/classes", class_routes)
        .nest("/api/lecturers", lecturer_routes)
        .nest("/api/students", student_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
