use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ExamAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exam_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

impl ExamAttempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn status(&self) -> AttemptStatus {
        if self.is_completed() {
            AttemptStatus::Completed
        } else {
            AttemptStatus::InProgress
        }
    }

    /// True when `user_id` owns this attempt and it still accepts answers.
    pub fn is_open_for(&self, user_id: Uuid) -> bool {
        self.user_id == user_id && !self.is_completed()
    }
}
