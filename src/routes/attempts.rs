use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{
    AttemptDetailResponse, AttemptSummary, CompleteAttemptResponse, StartAttemptResponse,
    SubmitAnswerRequest,
};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let user_id = claims.user_id()?;
    let started = state.attempt_service.start_attempt(exam_id, user_id).await?;

    let expires_at =
        started.attempt.started_at + Duration::minutes(i64::from(started.exam.duration_minutes));
    let status = if started.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let body = StartAttemptResponse {
        attempt: AttemptSummary::from(started.attempt),
        resumed: started.resumed,
        expires_at,
    };
    Ok((status, Json(body)).into_response())
}

pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let user_id = claims.user_id()?;
    let attempts = state.attempt_service.list_attempts(exam_id, user_id).await?;
    let items: Vec<AttemptSummary> = attempts.into_iter().map(AttemptSummary::from).collect();
    Ok(Json(items).into_response())
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Response> {
    let user_id = claims.user_id()?;
    let (attempt, answers) = state.attempt_service.get_attempt(attempt_id, user_id).await?;
    Ok(Json(AttemptDetailResponse {
        attempt: attempt.into(),
        answers,
    })
    .into_response())
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let answer = state
        .attempt_service
        .submit_answer(attempt_id, req.question_id, req.selected_answer, user_id)
        .await?;
    Ok(Json(answer).into_response())
}

pub async fn complete_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Response> {
    let user_id = claims.user_id()?;
    let completed = state
        .attempt_service
        .complete_attempt(attempt_id, user_id)
        .await?;

    let score = completed.attempt.score.unwrap_or_default();
    let body = CompleteAttemptResponse {
        attempt: completed.attempt.into(),
        score,
        total_marks: completed.exam.total_marks,
        passing_marks: completed.exam.passing_marks,
        passed: score >= completed.exam.passing_marks,
    };
    Ok(Json(body).into_response())
}
