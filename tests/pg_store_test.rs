//! Runs against a live Postgres. Skipped when DATABASE_URL is unset.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use exam_backend::database::pool::run_migrations;
use exam_backend::error::Error;
use exam_backend::models::exam::NewExam;
use exam_backend::models::exam_answer::AnswerUpsert;
use exam_backend::models::question::{NewQuestion, QuestionType};
use exam_backend::store::{AttemptStore, PgStore, QuestionStore};

async fn pg_store() -> Option<Arc<PgStore>> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");
    run_migrations(&pool).await.expect("migrations");
    Some(Arc::new(PgStore::new(pool)))
}

async fn seed_exam(store: &PgStore) -> Uuid {
    store
        .create_exam(NewExam {
            title: "Integration exam".to_string(),
            duration_minutes: 30,
            total_marks: 100,
            passing_marks: 40,
            exam_type: None,
            set_number: None,
            is_published: true,
            created_by: None,
        })
        .await
        .expect("create exam")
        .id
}

async fn seed_question(store: &PgStore, correct: &str) -> Uuid {
    store
        .create_question(NewQuestion {
            text: format!("Type {}", correct),
            question_type: QuestionType::ShortAnswer,
            options: Vec::new(),
            correct_answer: correct.to_string(),
        })
        .await
        .expect("create question")
        .id
}

fn upsert(attempt_id: Uuid, question_id: Uuid, selected: &str, is_correct: bool) -> AnswerUpsert {
    AnswerUpsert {
        attempt_id,
        question_id,
        selected_answer: selected.to_string(),
        is_correct,
        answered_at: Utc::now(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_hit_the_partial_unique_index() {
    let Some(store) = pg_store().await else {
        return;
    };
    let exam_id = seed_exam(&store).await;
    let user = Uuid::new_v4();

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.open_attempt(user, exam_id, Utc::now()).await })
        })
        .collect();

    let mut ids = HashSet::new();
    let mut created = 0;
    for handle in handles {
        let (attempt, was_created) = handle.await.unwrap().unwrap();
        ids.insert(attempt.id);
        created += usize::from(was_created);
    }
    assert_eq!(ids.len(), 1);
    assert_eq!(created, 1);
}

#[tokio::test]
async fn completion_is_final_and_blocks_later_answers() {
    let Some(store) = pg_store().await else {
        return;
    };
    let exam_id = seed_exam(&store).await;
    let question_id = seed_question(&store, "42").await;
    store.add_exam_question(exam_id, question_id, 7).await.unwrap();
    let user = Uuid::new_v4();
    let (attempt, _) = store.open_attempt(user, exam_id, Utc::now()).await.unwrap();

    store
        .upsert_answer(upsert(attempt.id, question_id, "41", false))
        .await
        .unwrap()
        .unwrap();
    let overwritten = store
        .upsert_answer(upsert(attempt.id, question_id, "42", true))
        .await
        .unwrap()
        .unwrap();
    assert!(overwritten.is_correct);
    assert_eq!(store.list_answers(attempt.id).await.unwrap().len(), 1);

    let done = store
        .complete_attempt(attempt.id, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.score, Some(7));

    assert!(store
        .complete_attempt(attempt.id, Utc::now())
        .await
        .unwrap()
        .is_none());
    assert!(store
        .upsert_answer(upsert(attempt.id, question_id, "0", false))
        .await
        .unwrap()
        .is_none());

    let stored = store.get_attempt(attempt.id).await.unwrap().unwrap();
    assert_eq!(stored.score, Some(7));
    assert_eq!(stored.completed_at, done.completed_at);

    let (retake, created) = store.open_attempt(user, exam_id, Utc::now()).await.unwrap();
    assert!(created);
    assert_ne!(retake.id, attempt.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_additions_get_distinct_positions() {
    let Some(store) = pg_store().await else {
        return;
    };
    let exam_id = seed_exam(&store).await;
    let mut question_ids = Vec::new();
    for i in 0..10 {
        question_ids.push(seed_question(&store, &format!("q{}", i)).await);
    }

    let handles: Vec<_> = question_ids
        .iter()
        .map(|&question_id| {
            let store = store.clone();
            tokio::spawn(async move { store.add_exam_question(exam_id, question_id, 1).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let positions: Vec<i32> = store
        .list_exam_questions(exam_id)
        .await
        .unwrap()
        .iter()
        .map(|eq| eq.position)
        .collect();
    assert_eq!(positions, (1..=10).collect::<Vec<i32>>());

    let dup = store.add_exam_question(exam_id, question_ids[0], 1).await;
    assert!(matches!(dup, Err(Error::Conflict(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn completion_racing_upserts_scores_every_stored_answer() {
    let Some(store) = pg_store().await else {
        return;
    };
    let exam_id = seed_exam(&store).await;
    let mut question_ids = Vec::new();
    for i in 0..20 {
        let question_id = seed_question(&store, &format!("a{}", i)).await;
        store.add_exam_question(exam_id, question_id, 1).await.unwrap();
        question_ids.push(question_id);
    }
    let (attempt, _) = store
        .open_attempt(Uuid::new_v4(), exam_id, Utc::now())
        .await
        .unwrap();
    let attempt_id = attempt.id;

    let upserts: Vec<_> = question_ids
        .iter()
        .map(|&question_id| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .upsert_answer(upsert(attempt_id, question_id, "x", true))
                    .await
            })
        })
        .collect();
    let completion = {
        let store = store.clone();
        tokio::spawn(async move { store.complete_attempt(attempt_id, Utc::now()).await })
    };

    let done = completion.await.unwrap().unwrap().unwrap();
    for handle in upserts {
        handle.await.unwrap().unwrap();
    }

    let stored = store.list_answers(attempt_id).await.unwrap();
    assert_eq!(done.score, Some(stored.len() as i32));
}
