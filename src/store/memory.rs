use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{AttemptStore, QuestionStore};
use crate::error::{Error, Result};
use crate::models::exam::{Exam, NewExam};
use crate::models::exam_answer::{AnswerUpsert, ExamAnswer};
use crate::models::exam_attempt::ExamAttempt;
use crate::models::exam_question::ExamQuestion;
use crate::models::question::{NewQuestion, Question};
use crate::services::grading_service::GradingService;

#[derive(Debug, Default)]
struct MemoryState {
    exams: HashMap<Uuid, Exam>,
    questions: HashMap<Uuid, Question>,
    exam_questions: Vec<ExamQuestion>,
    attempts: HashMap<Uuid, ExamAttempt>,
    answers: Vec<ExamAnswer>,
}

/// Process-local store. Each operation runs under one lock, which makes
/// every check-and-write atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn create_exam(&self, exam: NewExam) -> Result<Exam> {
        let row = Exam {
            id: Uuid::new_v4(),
            title: exam.title,
            duration_minutes: exam.duration_minutes,
            total_marks: exam.total_marks,
            passing_marks: exam.passing_marks,
            exam_type: exam.exam_type.map(|t| t.as_str().to_string()),
            set_number: exam.set_number,
            is_published: exam.is_published,
            created_by: exam.created_by,
            created_at: Utc::now(),
        };
        self.state()?.exams.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_exam(&self, exam_id: Uuid) -> Result<Option<Exam>> {
        Ok(self.state()?.exams.get(&exam_id).cloned())
    }

    async fn create_question(&self, question: NewQuestion) -> Result<Question> {
        let row = Question {
            id: Uuid::new_v4(),
            text: question.text,
            question_type: question.question_type.as_str().to_string(),
            options: Json(question.options),
            correct_answer: question.correct_answer,
            created_at: Utc::now(),
        };
        self.state()?.questions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_question(&self, question_id: Uuid) -> Result<Option<Question>> {
        Ok(self.state()?.questions.get(&question_id).cloned())
    }

    async fn add_exam_question(
        &self,
        exam_id: Uuid,
        question_id: Uuid,
        marks: i32,
    ) -> Result<ExamQuestion> {
        let mut state = self.state()?;

        let mut max_position = 0;
        for eq in state.exam_questions.iter().filter(|eq| eq.exam_id == exam_id) {
            if eq.question_id == question_id {
                return Err(Error::Conflict(
                    "Question is already part of this exam".to_string(),
                ));
            }
            max_position = max_position.max(eq.position);
        }

        let row = ExamQuestion {
            id: Uuid::new_v4(),
            exam_id,
            question_id,
            marks,
            position: max_position + 1,
            created_at: Utc::now(),
        };
        state.exam_questions.push(row.clone());
        Ok(row)
    }

    async fn list_exam_questions(&self, exam_id: Uuid) -> Result<Vec<ExamQuestion>> {
        let state = self.state()?;
        let mut rows: Vec<ExamQuestion> = state
            .exam_questions
            .iter()
            .filter(|eq| eq.exam_id == exam_id)
            .cloned()
            .collect();
        rows.sort_by_key(|eq| eq.position);
        Ok(rows)
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn open_attempt(
        &self,
        user_id: Uuid,
        exam_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(ExamAttempt, bool)> {
        let mut state = self.state()?;

        if let Some(open) = state
            .attempts
            .values()
            .find(|a| a.user_id == user_id && a.exam_id == exam_id && !a.is_completed())
        {
            return Ok((open.clone(), false));
        }

        let attempt = ExamAttempt {
            id: Uuid::new_v4(),
            user_id,
            exam_id,
            started_at,
            completed_at: None,
            score: None,
        };
        state.attempts.insert(attempt.id, attempt.clone());
        Ok((attempt, true))
    }

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamAttempt>> {
        Ok(self.state()?.attempts.get(&attempt_id).cloned())
    }

    async fn list_attempts(&self, user_id: Uuid, exam_id: Uuid) -> Result<Vec<ExamAttempt>> {
        let state = self.state()?;
        let mut rows: Vec<ExamAttempt> = state
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.exam_id == exam_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(rows)
    }

    async fn upsert_answer(&self, answer: AnswerUpsert) -> Result<Option<ExamAnswer>> {
        let mut state = self.state()?;

        let open = state
            .attempts
            .get(&answer.attempt_id)
            .is_some_and(|a| !a.is_completed());
        if !open {
            return Ok(None);
        }

        if let Some(existing) = state
            .answers
            .iter_mut()
            .find(|a| a.attempt_id == answer.attempt_id && a.question_id == answer.question_id)
        {
            existing.selected_answer = answer.selected_answer;
            existing.is_correct = answer.is_correct;
            existing.answered_at = answer.answered_at;
            return Ok(Some(existing.clone()));
        }

        let row = ExamAnswer {
            id: Uuid::new_v4(),
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            selected_answer: answer.selected_answer,
            is_correct: answer.is_correct,
            answered_at: answer.answered_at,
        };
        state.answers.push(row.clone());
        Ok(Some(row))
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<ExamAnswer>> {
        Ok(self
            .state()?
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn complete_attempt(
        &self,
        attempt_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<ExamAttempt>> {
        let mut state = self.state()?;
        let exam_id = match state.attempts.get(&attempt_id) {
            Some(attempt) if !attempt.is_completed() => attempt.exam_id,
            _ => return Ok(None),
        };

        let answers: Vec<ExamAnswer> = state
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect();
        let exam_questions: Vec<ExamQuestion> = state
            .exam_questions
            .iter()
            .filter(|eq| eq.exam_id == exam_id)
            .cloned()
            .collect();
        let score = GradingService::score(&answers, &exam_questions)?;

        let Some(attempt) = state.attempts.get_mut(&attempt_id) else {
            return Ok(None);
        };
        attempt.completed_at = Some(completed_at);
        attempt.score = Some(score);
        Ok(Some(attempt.clone()))
    }
}
