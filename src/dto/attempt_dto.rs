use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::exam_answer::ExamAnswer;
use crate::models::exam_attempt::{AttemptStatus, ExamAttempt};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    #[validate(length(max = 10000))]
    pub selected_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
}

impl From<ExamAttempt> for AttemptSummary {
    fn from(attempt: ExamAttempt) -> Self {
        Self {
            status: attempt.status(),
            id: attempt.id,
            exam_id: attempt.exam_id,
            started_at: attempt.started_at,
            completed_at: attempt.completed_at,
            score: attempt.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt: AttemptSummary,
    pub resumed: bool,
    /// Informational only; answers are not rejected after this instant.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAttemptResponse {
    pub attempt: AttemptSummary,
    pub score: i32,
    pub total_marks: i32,
    pub passing_marks: i32,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptDetailResponse {
    pub attempt: AttemptSummary,
    pub answers: Vec<ExamAnswer>,
}
