// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
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
        .route("/login", post(auth::login));

    // Student-facing quiz routes. Everything requires a verified token;
    // unknown users are provisioned lazily as students.
    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/submit", post(quiz::submit_quiz))
        .route("/submissions/mine", get(quiz::my_submissions))
        .route("/{id}", get(quiz::get_quiz))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route(
            "/quizzes",
            get(admin::list_quizzes).post(admin::create_quiz),
        )
        .route("/quizzes/{id}", put(admin::update_quiz))
        .route("/quizzes/{id}/submissions", get(admin::quiz_submissions))
        .route("/submissions", get(admin::list_submissions))
        .route("/submissions/{id}", get(admin::submission_detail))
        .route(
            "/students/{id}/submissions",
            get(admin::student_submissions),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
