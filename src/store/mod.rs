//! Storage seam for the exam engine.
//!
//! Both traits expose atomic operations for the engine's uniqueness
//! invariants: one open attempt per (user, exam), one answer per
//! (attempt, question), and gap-tolerant increasing question positions.
//! Implementations enforce these themselves, so callers never need a
//! separate read before a write to stay consistent.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::exam::{Exam, NewExam};
use crate::models::exam_answer::{AnswerUpsert, ExamAnswer};
use crate::models::exam_attempt::ExamAttempt;
use crate::models::exam_question::ExamQuestion;
use crate::models::question::{NewQuestion, Question};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Exams, questions and their associations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn create_exam(&self, exam: NewExam) -> Result<Exam>;

    async fn get_exam(&self, exam_id: Uuid) -> Result<Option<Exam>>;

    async fn create_question(&self, question: NewQuestion) -> Result<Question>;

    async fn get_question(&self, question_id: Uuid) -> Result<Option<Question>>;

    /// Associates a question with an exam at the next free position.
    ///
    /// Fails with `Error::Conflict` if the pair is already associated.
    async fn add_exam_question(
        &self,
        exam_id: Uuid,
        question_id: Uuid,
        marks: i32,
    ) -> Result<ExamQuestion>;

    /// Associations for an exam ordered by position.
    async fn list_exam_questions(&self, exam_id: Uuid) -> Result<Vec<ExamQuestion>>;
}

/// Attempts and their answers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Returns the open attempt for (user, exam), creating it if none exists.
    ///
    /// The boolean is `true` when a new attempt was inserted.
    async fn open_attempt(
        &self,
        user_id: Uuid,
        exam_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(ExamAttempt, bool)>;

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamAttempt>>;

    /// All attempts a user made on an exam, newest first.
    async fn list_attempts(&self, user_id: Uuid, exam_id: Uuid) -> Result<Vec<ExamAttempt>>;

    /// Inserts or overwrites the answer for (attempt, question).
    ///
    /// Returns `None` without writing if the attempt is no longer open.
    /// Serialized against `complete_attempt` on the same attempt.
    async fn upsert_answer(&self, answer: AnswerUpsert) -> Result<Option<ExamAnswer>>;

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<ExamAnswer>>;

    /// Scores the attempt from its stored answers and the exam's marks, then
    /// sets `completed_at` and `score`, all while holding the attempt.
    ///
    /// Every answer accepted before completion is counted, and none is
    /// accepted after. Returns `None` without writing if it was already
    /// completed.
    async fn complete_attempt(
        &self,
        attempt_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<ExamAttempt>>;
}
