use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{AddExamQuestionRequest, CreateExamRequest};
use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::AppState;

pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateExamRequest>,
) -> Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let exam = state.exam_service.create_exam(req, user_id).await?;
    Ok((StatusCode::CREATED, Json(exam)).into_response())
}

pub async fn get_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let exam = state.exam_service.get_exam(exam_id).await?;
    Ok(Json(exam).into_response())
}

pub async fn add_question_to_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<AddExamQuestionRequest>,
) -> Result<Response> {
    req.validate()?;
    let added = state.exam_service.add_question_to_exam(exam_id, req).await?;
    Ok((StatusCode::CREATED, Json(added)).into_response())
}

pub async fn list_exam_questions(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let items = state.exam_service.list_exam_questions(exam_id).await?;
    Ok(Json(items).into_response())
}
