use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam::Exam;
use crate::models::exam_answer::{AnswerUpsert, ExamAnswer};
use crate::models::exam_attempt::ExamAttempt;
use crate::services::grading_service::GradingService;
use crate::store::{AttemptStore, QuestionStore};

/// Shared by "not found", "not yours" and "already completed" on submit,
/// so the response never reveals whether someone else's attempt exists.
pub const INVALID_OR_COMPLETED_ATTEMPT: &str = "Invalid or completed attempt";
pub const INVALID_ATTEMPT: &str = "Invalid attempt";
pub const ATTEMPT_ALREADY_COMPLETED: &str = "Attempt already completed";

#[derive(Clone)]
pub struct AttemptService {
    attempts: Arc<dyn AttemptStore>,
    questions: Arc<dyn QuestionStore>,
}

#[derive(Debug, Clone)]
pub struct StartedAttempt {
    pub attempt: ExamAttempt,
    pub exam: Exam,
    pub resumed: bool,
}

#[derive(Debug, Clone)]
pub struct CompletedAttempt {
    pub attempt: ExamAttempt,
    pub exam: Exam,
}

impl AttemptService {
    pub fn new(attempts: Arc<dyn AttemptStore>, questions: Arc<dyn QuestionStore>) -> Self {
        Self {
            attempts,
            questions,
        }
    }

    async fn require_exam(&self, exam_id: Uuid) -> Result<Exam> {
        self.questions
            .get_exam(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    /// Starts an attempt, or resumes the caller's open attempt on this exam.
    pub async fn start_attempt(&self, exam_id: Uuid, user_id: Uuid) -> Result<StartedAttempt> {
        let exam = self.require_exam(exam_id).await?;
        let (attempt, created) = self
            .attempts
            .open_attempt(user_id, exam_id, Utc::now())
            .await?;

        if created {
            tracing::info!(attempt_id = %attempt.id, %exam_id, %user_id, "exam attempt started");
        } else {
            tracing::info!(attempt_id = %attempt.id, %exam_id, %user_id, "exam attempt resumed");
        }

        Ok(StartedAttempt {
            attempt,
            exam,
            resumed: !created,
        })
    }

    /// Records the caller's answer to one question, replacing any earlier one.
    pub async fn submit_answer(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        selected_answer: String,
        user_id: Uuid,
    ) -> Result<ExamAnswer> {
        let open = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .is_some_and(|a| a.is_open_for(user_id));
        if !open {
            tracing::warn!(%attempt_id, %user_id, "answer rejected for invalid or completed attempt");
            return Err(Error::Forbidden(INVALID_OR_COMPLETED_ATTEMPT.to_string()));
        }

        let question = self
            .questions
            .get_question(question_id)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;

        let is_correct = GradingService::is_correct(&selected_answer, &question.correct_answer);
        let upsert = AnswerUpsert {
            attempt_id,
            question_id,
            selected_answer,
            is_correct,
            answered_at: Utc::now(),
        };

        // None means the attempt was completed after the ownership check.
        let answer = self
            .attempts
            .upsert_answer(upsert)
            .await?
            .ok_or_else(|| Error::Forbidden(INVALID_OR_COMPLETED_ATTEMPT.to_string()))?;

        tracing::debug!(%attempt_id, %question_id, is_correct, "answer recorded");
        Ok(answer)
    }

    /// Scores and closes the caller's attempt. Completed attempts are final.
    pub async fn complete_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
    ) -> Result<CompletedAttempt> {
        let attempt = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| Error::Forbidden(INVALID_ATTEMPT.to_string()))?;

        if attempt.is_completed() {
            tracing::warn!(%attempt_id, %user_id, "completion rejected for completed attempt");
            return Err(Error::Forbidden(ATTEMPT_ALREADY_COMPLETED.to_string()));
        }

        let exam = self.require_exam(attempt.exam_id).await?;
        let completed = self
            .attempts
            .complete_attempt(attempt_id, Utc::now())
            .await?
            .ok_or_else(|| Error::Forbidden(ATTEMPT_ALREADY_COMPLETED.to_string()))?;

        tracing::info!(
            %attempt_id,
            %user_id,
            score = completed.score.unwrap_or_default(),
            "exam attempt completed"
        );

        Ok(CompletedAttempt {
            attempt: completed,
            exam,
        })
    }

    /// The caller's attempt together with its recorded answers.
    pub async fn get_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
    ) -> Result<(ExamAttempt, Vec<ExamAnswer>)> {
        let attempt = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| Error::Forbidden(INVALID_ATTEMPT.to_string()))?;
        let answers = self.attempts.list_answers(attempt_id).await?;
        Ok((attempt, answers))
    }

    pub async fn list_attempts(&self, exam_id: Uuid, user_id: Uuid) -> Result<Vec<ExamAttempt>> {
        self.require_exam(exam_id).await?;
        self.attempts.list_attempts(user_id, exam_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;
    use crate::store::{MockAttemptStore, MockQuestionStore};
    use mockall::predicate::eq;
    use sqlx::types::Json;

    fn exam(exam_id: Uuid) -> Exam {
        Exam {
            id: exam_id,
            title: "Physics Model Test".to_string(),
            duration_minutes: 30,
            total_marks: 10,
            passing_marks: 5,
            exam_type: Some("full_model".to_string()),
            set_number: Some(1),
            is_published: true,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    fn attempt(user_id: Uuid, exam_id: Uuid, completed: bool) -> ExamAttempt {
        ExamAttempt {
            id: Uuid::new_v4(),
            user_id,
            exam_id,
            started_at: Utc::now(),
            completed_at: completed.then(Utc::now),
            score: completed.then_some(4),
        }
    }

    fn service(attempts: MockAttemptStore, questions: MockQuestionStore) -> AttemptService {
        AttemptService::new(Arc::new(attempts), Arc::new(questions))
    }

    #[tokio::test]
    async fn submit_on_foreign_attempt_writes_nothing() {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let foreign = attempt(owner, Uuid::new_v4(), false);
        let attempt_id = foreign.id;

        let mut attempts = MockAttemptStore::new();
        attempts
            .expect_get_attempt()
            .with(eq(attempt_id))
            .times(1)
            .returning(move |_| Ok(Some(foreign.clone())));
        attempts.expect_upsert_answer().times(0);
        let mut questions = MockQuestionStore::new();
        questions.expect_get_question().times(0);

        let err = service(attempts, questions)
            .submit_answer(attempt_id, Uuid::new_v4(), "A".to_string(), intruder)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref m) if m == INVALID_OR_COMPLETED_ATTEMPT));
    }

    #[tokio::test]
    async fn submit_on_missing_attempt_looks_like_foreign_attempt() {
        let mut attempts = MockAttemptStore::new();
        attempts.expect_get_attempt().returning(|_| Ok(None));
        attempts.expect_upsert_answer().times(0);

        let err = service(attempts, MockQuestionStore::new())
            .submit_answer(Uuid::new_v4(), Uuid::new_v4(), "A".to_string(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref m) if m == INVALID_OR_COMPLETED_ATTEMPT));
    }

    #[tokio::test]
    async fn submit_compares_against_canonical_answer() {
        let user = Uuid::new_v4();
        let open = attempt(user, Uuid::new_v4(), false);
        let attempt_id = open.id;
        let question_id = Uuid::new_v4();

        let mut attempts = MockAttemptStore::new();
        attempts
            .expect_get_attempt()
            .returning(move |_| Ok(Some(open.clone())));
        attempts
            .expect_upsert_answer()
            .withf(move |u| u.question_id == question_id && u.selected_answer == "4" && u.is_correct)
            .times(1)
            .returning(|u| {
                Ok(Some(ExamAnswer {
                    id: Uuid::new_v4(),
                    attempt_id: u.attempt_id,
                    question_id: u.question_id,
                    selected_answer: u.selected_answer,
                    is_correct: u.is_correct,
                    answered_at: u.answered_at,
                }))
            });

        let mut questions = MockQuestionStore::new();
        questions
            .expect_get_question()
            .with(eq(question_id))
            .returning(move |id| {
                Ok(Some(Question {
                    id,
                    text: "2+2?".to_string(),
                    question_type: "multiple_choice".to_string(),
                    options: Json(Vec::new()),
                    correct_answer: "4".to_string(),
                    created_at: Utc::now(),
                }))
            });

        let answer = service(attempts, questions)
            .submit_answer(attempt_id, question_id, "4".to_string(), user)
            .await
            .unwrap();
        assert!(answer.is_correct);
        assert_eq!(answer.attempt_id, attempt_id);
    }

    #[tokio::test]
    async fn completing_a_completed_attempt_is_rejected_without_writes() {
        let user = Uuid::new_v4();
        let done = attempt(user, Uuid::new_v4(), true);
        let attempt_id = done.id;

        let mut attempts = MockAttemptStore::new();
        attempts
            .expect_get_attempt()
            .returning(move |_| Ok(Some(done.clone())));
        attempts.expect_list_answers().times(0);
        attempts.expect_complete_attempt().times(0);

        let err = service(attempts, MockQuestionStore::new())
            .complete_attempt(attempt_id, user)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref m) if m == ATTEMPT_ALREADY_COMPLETED));
    }

    #[tokio::test]
    async fn completion_lost_race_reports_already_completed() {
        let user = Uuid::new_v4();
        let exam_id = Uuid::new_v4();
        let open = attempt(user, exam_id, false);
        let attempt_id = open.id;

        let mut attempts = MockAttemptStore::new();
        attempts
            .expect_get_attempt()
            .returning(move |_| Ok(Some(open.clone())));
        attempts
            .expect_complete_attempt()
            .with(eq(attempt_id), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(None));

        let mut questions = MockQuestionStore::new();
        questions
            .expect_get_exam()
            .returning(move |id| Ok(Some(exam(id))));

        let err = service(attempts, questions)
            .complete_attempt(attempt_id, user)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref m) if m == ATTEMPT_ALREADY_COMPLETED));
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let mut attempts = MockAttemptStore::new();
        attempts
            .expect_get_attempt()
            .returning(|_| Err(Error::Storage("connection reset".to_string())));

        let err = service(attempts, MockQuestionStore::new())
            .complete_attempt(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn start_on_unknown_exam_is_not_found() {
        let mut attempts = MockAttemptStore::new();
        attempts.expect_open_attempt().times(0);
        let mut questions = MockQuestionStore::new();
        questions.expect_get_exam().returning(|_| Ok(None));

        let err = service(attempts, questions)
            .start_attempt(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
