use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::exam::ExamType;
use crate::models::question::{QuestionOption, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i32,
    #[validate(range(min = 0))]
    pub total_marks: i32,
    #[validate(range(min = 0))]
    pub passing_marks: i32,
    pub exam_type: Option<ExamType>,
    #[validate(range(min = 1))]
    pub set_number: Option<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub options: Vec<QuestionOption>,
    /// Only read for short-answer questions.
    #[validate(length(max = 1000))]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddExamQuestionRequest {
    pub question_id: Uuid,
    #[validate(range(min = 1, max = 1000))]
    pub marks: i32,
}
