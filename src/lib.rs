pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::services::{attempt_service::AttemptService, exam_service::ExamService};
use crate::store::{AttemptStore, QuestionStore};

#[derive(Clone)]
pub struct AppState {
    pub attempt_service: AttemptService,
    pub exam_service: ExamService,
}

impl AppState {
    pub fn new(questions: Arc<dyn QuestionStore>, attempts: Arc<dyn AttemptStore>) -> Self {
        let attempt_service = AttemptService::new(attempts, questions.clone());
        let exam_service = ExamService::new(questions);

        Self {
            attempt_service,
            exam_service,
        }
    }

    /// Wires both services to one backend that implements both store traits.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: QuestionStore + AttemptStore + 'static,
    {
        Self::new(store.clone(), store)
    }
}
