pub mod exam;
pub mod exam_answer;
pub mod exam_attempt;
pub mod exam_question;
pub mod question;
