use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::exam_dto::CreateQuestionRequest;
use crate::error::Result;
use crate::AppState;

pub async fn create_question(
    State(state): State<AppState>,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<Response> {
    req.validate()?;
    let question = state.exam_service.create_question(req).await?;
    Ok((StatusCode::CREATED, Json(question)).into_response())
}
