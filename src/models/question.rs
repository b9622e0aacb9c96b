use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub question_type: String,
    pub options: Json<Vec<QuestionOption>>,
    /// Canonical answer that submissions are compared against, byte for byte.
    pub correct_answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
        }
    }

    fn uses_options(&self) -> bool {
        !matches!(self, QuestionType::ShortAnswer)
    }

    /// Derives the canonical correct answer for a question being authored.
    ///
    /// Option-based types take the text of the single option flagged correct.
    /// Short answers take the explicitly supplied answer as-is.
    pub fn canonical_answer(
        &self,
        options: &[QuestionOption],
        explicit: Option<&str>,
    ) -> Result<String> {
        if !self.uses_options() {
            return match explicit {
                Some(answer) if !answer.is_empty() => Ok(answer.to_string()),
                _ => Err(Error::BadRequest(
                    "short_answer questions require a correct_answer".to_string(),
                )),
            };
        }

        if options.len() < 2 {
            return Err(Error::BadRequest(format!(
                "{} questions require at least two options",
                self.as_str()
            )));
        }

        let mut flagged = options.iter().filter(|o| o.is_correct);
        match (flagged.next(), flagged.next()) {
            (Some(option), None) => Ok(option.text.clone()),
            (None, _) => Err(Error::BadRequest(
                "exactly one option must be flagged is_correct".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::BadRequest(
                "only one option may be flagged is_correct".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub text: String,
    pub question_type: QuestionType,
    pub options: Vec<QuestionOption>,
    pub correct_answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(text: &str, is_correct: bool) -> QuestionOption {
        QuestionOption {
            text: text.to_string(),
            is_correct,
        }
    }

    #[test]
    fn multiple_choice_takes_flagged_option_text() {
        let options = vec![opt("3", false), opt("4", true), opt("5", false)];
        let answer = QuestionType::MultipleChoice
            .canonical_answer(&options, Some("ignored"))
            .unwrap();
        assert_eq!(answer, "4");
    }

    #[test]
    fn option_types_reject_zero_or_many_flags() {
        let none = vec![opt("True", false), opt("False", false)];
        assert!(QuestionType::TrueFalse.canonical_answer(&none, None).is_err());

        let both = vec![opt("True", true), opt("False", true)];
        assert!(QuestionType::TrueFalse.canonical_answer(&both, None).is_err());
    }

    #[test]
    fn short_answer_requires_explicit_answer() {
        assert_eq!(
            QuestionType::ShortAnswer
                .canonical_answer(&[], Some("Photosynthesis"))
                .unwrap(),
            "Photosynthesis"
        );
        assert!(QuestionType::ShortAnswer.canonical_answer(&[], None).is_err());
        assert!(QuestionType::ShortAnswer.canonical_answer(&[], Some("")).is_err());
    }
}
