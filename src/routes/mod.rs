pub mod attempts;
pub mod exams;
pub mod health;
pub mod questions;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::{require_author, require_bearer_auth};
use crate::middleware::rate_limit::{rate_limit, RateLimiter};
use crate::AppState;

/// Builds the full HTTP surface. Everything under `/api` needs a bearer
/// token; authoring routes additionally need an author role.
pub fn create_router(state: AppState, limiter: RateLimiter) -> Router {
    let api = Router::new()
        .route(
            "/api/exams",
            post(exams::create_exam).route_layer(middleware::from_fn(require_author)),
        )
        .route("/api/exams/:id", get(exams::get_exam))
        .route(
            "/api/exams/:id/questions",
            get(exams::list_exam_questions).merge(
                post(exams::add_question_to_exam)
                    .route_layer(middleware::from_fn(require_author)),
            ),
        )
        .route(
            "/api/exams/:id/attempts",
            get(attempts::list_attempts).post(attempts::start_attempt),
        )
        .route(
            "/api/questions",
            post(questions::create_question).route_layer(middleware::from_fn(require_author)),
        )
        .route("/api/attempts/:id", get(attempts::get_attempt))
        .route("/api/attempts/:id/answers", put(attempts::submit_answer))
        .route("/api/attempts/:id/complete", post(attempts::complete_attempt))
        .layer(middleware::from_fn(require_bearer_auth))
        .layer(middleware::from_fn_with_state(limiter, rate_limit));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
