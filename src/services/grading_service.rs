use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::exam_answer::ExamAnswer;
use crate::models::exam_question::ExamQuestion;

pub struct GradingService;

impl GradingService {
    /// Exact comparison: no trimming, no case folding, no partial credit.
    pub fn is_correct(selected_answer: &str, correct_answer: &str) -> bool {
        selected_answer == correct_answer
    }

    /// Sums the marks of every correctly answered question on the exam.
    ///
    /// Wrong answers, unanswered questions and answers to questions that are
    /// not (or no longer) part of the exam all contribute zero.
    pub fn score(answers: &[ExamAnswer], exam_questions: &[ExamQuestion]) -> Result<i32> {
        let marks: HashMap<Uuid, i32> = exam_questions
            .iter()
            .map(|eq| (eq.question_id, eq.marks))
            .collect();

        let total: i64 = answers
            .iter()
            .filter(|a| a.is_correct)
            .filter_map(|a| marks.get(&a.question_id))
            .map(|&m| i64::from(m))
            .sum();

        i32::try_from(total)
            .map_err(|_| Error::Internal(format!("score {} is out of range", total)))
    }

    /// Sum of the exam's per-question marks, which may differ from the
    /// exam's declared `total_marks`.
    pub fn attainable_marks(exam_questions: &[ExamQuestion]) -> i64 {
        exam_questions.iter().map(|eq| i64::from(eq.marks)).sum()
    }
}
