use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{AddExamQuestionRequest, CreateExamRequest, CreateQuestionRequest};
use crate::error::{Error, Result};
use crate::models::exam::{Exam, NewExam};
use crate::models::exam_question::ExamQuestion;
use crate::models::question::{NewQuestion, Question};
use crate::services::grading_service::GradingService;
use crate::store::QuestionStore;

#[derive(Clone)]
pub struct ExamService {
    questions: Arc<dyn QuestionStore>,
}

impl ExamService {
    pub fn new(questions: Arc<dyn QuestionStore>) -> Self {
        Self { questions }
    }

    pub async fn create_exam(&self, payload: CreateExamRequest, created_by: Uuid) -> Result<Exam> {
        if payload.passing_marks > payload.total_marks {
            return Err(Error::BadRequest(
                "passing_marks cannot exceed total_marks".to_string(),
            ));
        }

        let exam = self
            .questions
            .create_exam(NewExam {
                title: payload.title,
                duration_minutes: payload.duration_minutes,
                total_marks: payload.total_marks,
                passing_marks: payload.passing_marks,
                exam_type: payload.exam_type,
                set_number: payload.set_number,
                is_published: payload.is_published.unwrap_or(false),
                created_by: Some(created_by),
            })
            .await?;

        tracing::info!(exam_id = %exam.id, %created_by, "exam created");
        Ok(exam)
    }

    pub async fn get_exam(&self, exam_id: Uuid) -> Result<Exam> {
        self.questions
            .get_exam(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    pub async fn create_question(&self, payload: CreateQuestionRequest) -> Result<Question> {
        let correct_answer = payload
            .question_type
            .canonical_answer(&payload.options, payload.correct_answer.as_deref())?;

        let question = self
            .questions
            .create_question(NewQuestion {
                text: payload.text,
                question_type: payload.question_type,
                options: payload.options,
                correct_answer,
            })
            .await?;

        tracing::info!(question_id = %question.id, question_type = %question.question_type, "question created");
        Ok(question)
    }

    /// Appends a question to an exam at the next position.
    ///
    /// Declared `total_marks` is not enforced; a mismatch is only logged.
    pub async fn add_question_to_exam(
        &self,
        exam_id: Uuid,
        payload: AddExamQuestionRequest,
    ) -> Result<ExamQuestion> {
        payload.validate()?;
        let exam = self.get_exam(exam_id).await?;
        if self.questions.get_question(payload.question_id).await?.is_none() {
            return Err(Error::NotFound("Question not found".to_string()));
        }

        let added = self
            .questions
            .add_exam_question(exam_id, payload.question_id, payload.marks)
            .await?;

        let attainable =
            GradingService::attainable_marks(&self.questions.list_exam_questions(exam_id).await?);
        if attainable > i64::from(exam.total_marks) {
            tracing::warn!(
                %exam_id,
                attainable,
                total_marks = exam.total_marks,
                "question marks exceed the exam's declared total"
            );
        }

        tracing::info!(
            %exam_id,
            question_id = %added.question_id,
            position = added.position,
            marks = added.marks,
            "question added to exam"
        );
        Ok(added)
    }

    pub async fn list_exam_questions(&self, exam_id: Uuid) -> Result<Vec<ExamQuestion>> {
        self.get_exam(exam_id).await?;
        self.questions.list_exam_questions(exam_id).await
    }
}
