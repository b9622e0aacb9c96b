use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Links a question to an exam with its weight and display order.
///
/// `position` is 1-based and assigned as one past the exam's current maximum.
/// It is a display hint, so gaps are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ExamQuestion {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub question_id: Uuid,
    pub marks: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}
