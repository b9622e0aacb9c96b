use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub title: String,
    pub duration_minutes: i32,
    /// Author-declared total. Never re-derived from the exam's question marks.
    pub total_marks: i32,
    pub passing_marks: i32,
    pub exam_type: Option<String>,
    pub set_number: Option<i32>,
    pub is_published: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamType {
    FullModel,
    Subject,
    Chapter,
    Practice,
    PreviousYear,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::FullModel => "full_model",
            ExamType::Subject => "subject",
            ExamType::Chapter => "chapter",
            ExamType::Practice => "practice",
            ExamType::PreviousYear => "previous_year",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewExam {
    pub title: String,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub passing_marks: i32,
    pub exam_type: Option<ExamType>,
    pub set_number: Option<i32>,
    pub is_published: bool,
    pub created_by: Option<Uuid>,
}
