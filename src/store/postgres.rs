use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{AttemptStore, QuestionStore};
use crate::error::{Error, Result};
use crate::models::exam::{Exam, NewExam};
use crate::models::exam_answer::{AnswerUpsert, ExamAnswer};
use crate::models::exam_attempt::ExamAttempt;
use crate::models::exam_question::ExamQuestion;
use crate::models::question::{NewQuestion, Question};
use crate::services::grading_service::GradingService;

/// Bounded retries when an open attempt is completed between the
/// conflicting insert and the read that should find it.
const OPEN_ATTEMPT_RETRIES: usize = 3;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error, message: &str) -> Error {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(message.to_string())
        }
        other => Error::from(other),
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn create_exam(&self, exam: NewExam) -> Result<Exam> {
        let row = sqlx::query_as::<_, Exam>(
            r#"
            INSERT INTO exams (
                id, title, duration_minutes, total_marks, passing_marks,
                exam_type, set_number, is_published, created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(exam.title)
        .bind(exam.duration_minutes)
        .bind(exam.total_marks)
        .bind(exam.passing_marks)
        .bind(exam.exam_type.map(|t| t.as_str()))
        .bind(exam.set_number)
        .bind(exam.is_published)
        .bind(exam.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_exam(&self, exam_id: Uuid) -> Result<Option<Exam>> {
        let row = sqlx::query_as::<_, Exam>(r#"SELECT * FROM exams WHERE id = $1"#)
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_question(&self, question: NewQuestion) -> Result<Question> {
        let row = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (id, text, question_type, options, correct_answer)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(question.text)
        .bind(question.question_type.as_str())
        .bind(Json(question.options))
        .bind(question.correct_answer)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_question(&self, question_id: Uuid) -> Result<Option<Question>> {
        let row = sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = $1"#)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn add_exam_question(
        &self,
        exam_id: Uuid,
        question_id: Uuid,
        marks: i32,
    ) -> Result<ExamQuestion> {
        let mut tx = self.pool.begin().await?;

        // Serializes position assignment per exam.
        let locked: Option<Uuid> =
            sqlx::query_scalar(r#"SELECT id FROM exams WHERE id = $1 FOR UPDATE"#)
                .bind(exam_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(Error::NotFound("Exam not found".to_string()));
        }

        let row = sqlx::query_as::<_, ExamQuestion>(
            r#"
            INSERT INTO exam_questions (id, exam_id, question_id, marks, position)
            SELECT $1, $2, $3, $4, COALESCE(MAX(position), 0) + 1
            FROM exam_questions
            WHERE exam_id = $2
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(exam_id)
        .bind(question_id)
        .bind(marks)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Question is already part of this exam"))?;

        tx.commit().await?;
        Ok(row)
    }

    async fn list_exam_questions(&self, exam_id: Uuid) -> Result<Vec<ExamQuestion>> {
        let rows = sqlx::query_as::<_, ExamQuestion>(
            r#"SELECT * FROM exam_questions WHERE exam_id = $1 ORDER BY position, created_at"#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn open_attempt(
        &self,
        user_id: Uuid,
        exam_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(ExamAttempt, bool)> {
        for _ in 0..OPEN_ATTEMPT_RETRIES {
            // The partial unique index on open attempts turns a concurrent
            // duplicate into a no-op instead of a second row.
            let inserted = sqlx::query_as::<_, ExamAttempt>(
                r#"
                INSERT INTO exam_attempts (id, user_id, exam_id, started_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id, exam_id) WHERE completed_at IS NULL DO NOTHING
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(exam_id)
            .bind(started_at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(attempt) = inserted {
                return Ok((attempt, true));
            }

            let existing = sqlx::query_as::<_, ExamAttempt>(
                r#"
                SELECT * FROM exam_attempts
                WHERE user_id = $1 AND exam_id = $2 AND completed_at IS NULL
                "#,
            )
            .bind(user_id)
            .bind(exam_id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(attempt) = existing {
                return Ok((attempt, false));
            }
        }

        Err(Error::Storage(
            "could not settle on an open attempt".to_string(),
        ))
    }

    async fn get_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamAttempt>> {
        let row = sqlx::query_as::<_, ExamAttempt>(r#"SELECT * FROM exam_attempts WHERE id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_attempts(&self, user_id: Uuid, exam_id: Uuid) -> Result<Vec<ExamAttempt>> {
        let rows = sqlx::query_as::<_, ExamAttempt>(
            r#"
            SELECT * FROM exam_attempts
            WHERE user_id = $1 AND exam_id = $2
            ORDER BY started_at DESC
            "#,
        )
        .bind(user_id)
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_answer(&self, answer: AnswerUpsert) -> Result<Option<ExamAnswer>> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE lets answers to one attempt proceed together but waits
        // for a completion holding FOR UPDATE, then sees its committed state.
        let open: Option<bool> = sqlx::query_scalar(
            r#"SELECT completed_at IS NULL FROM exam_attempts WHERE id = $1 FOR SHARE"#,
        )
        .bind(answer.attempt_id)
        .fetch_optional(&mut *tx)
        .await?;
        if open != Some(true) {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, ExamAnswer>(
            r#"
            INSERT INTO exam_answers (
                id, attempt_id, question_id, selected_answer, is_correct, answered_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (attempt_id, question_id) DO UPDATE
            SET selected_answer = EXCLUDED.selected_answer,
                is_correct = EXCLUDED.is_correct,
                answered_at = EXCLUDED.answered_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(answer.attempt_id)
        .bind(answer.question_id)
        .bind(answer.selected_answer)
        .bind(answer.is_correct)
        .bind(answer.answered_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<ExamAnswer>> {
        let rows = sqlx::query_as::<_, ExamAnswer>(
            r#"SELECT * FROM exam_answers WHERE attempt_id = $1 ORDER BY answered_at"#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn complete_attempt(
        &self,
        attempt_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<ExamAttempt>> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, ExamAttempt>(
            r#"SELECT * FROM exam_attempts WHERE id = $1 FOR UPDATE"#,
        )
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?;
        let attempt = match attempt {
            Some(attempt) if !attempt.is_completed() => attempt,
            _ => return Ok(None),
        };

        let answers = sqlx::query_as::<_, ExamAnswer>(
            r#"SELECT * FROM exam_answers WHERE attempt_id = $1"#,
        )
        .bind(attempt_id)
        .fetch_all(&mut *tx)
        .await?;
        let exam_questions = sqlx::query_as::<_, ExamQuestion>(
            r#"SELECT * FROM exam_questions WHERE exam_id = $1"#,
        )
        .bind(attempt.exam_id)
        .fetch_all(&mut *tx)
        .await?;
        let score = GradingService::score(&answers, &exam_questions)?;

        let row = sqlx::query_as::<_, ExamAttempt>(
            r#"
            UPDATE exam_attempts
            SET completed_at = $2, score = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(attempt_id)
        .bind(completed_at)
        .bind(score)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row))
    }
}
