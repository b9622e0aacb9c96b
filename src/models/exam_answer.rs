use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ExamAnswer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Values written by an answer upsert keyed on `(attempt_id, question_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerUpsert {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}
