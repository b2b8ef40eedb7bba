mod common;

use common::{engine, quiz, RecordingPlatform, TestEngine};
use quizcast::{
    database::{
        report::{QuizSnapshot, Report, ReportAction, ReportStatus, Reporter},
        store::QuizStore,
    },
    error::Error,
};
use uuid::Uuid;

async fn file_report(engine: &TestEngine, question: &str) -> Report {
    engine
        .report_quiz(
            -1001234567,
            42,
            Some("Trivia".into()),
            QuizSnapshot {
                question: question.into(),
                options: vec!["3".into(), "4".into(), "5".into()],
                correct_option: 1,
            },
            Reporter {
                user_id: 7,
                username: None,
                first_name: "Alice".into(),
            },
        )
        .await
        .unwrap()
}

async fn questions(engine: &TestEngine) -> Vec<String> {
    engine
        .store()
        .retreive_quizzes()
        .await
        .unwrap()
        .iter()
        .map(|quiz| quiz.question().to_owned())
        .collect()
}

#[tokio::test]
async fn new_reports_are_pending_and_counted() {
    let engine = engine(&[], &[], RecordingPlatform::default()).await;

    let first = file_report(&engine, "What is 2+2?").await;
    let second = file_report(&engine, "What is 2+2?").await;

    assert_ne!(first.id, second.id);
    assert_eq!(first.status, ReportStatus::Pending);
    assert_eq!(engine.list_pending_reports().await.unwrap().len(), 2);
    assert_eq!(engine.stats().await.quiz_reports_received, 2);
}

#[tokio::test]
async fn delete_removes_exact_matches_and_lists_similar_ones() {
    let pool = [quiz("What is 2+2?"), quiz("what is 2 + 2??"), quiz("Capital of France?")];
    let engine = engine(&pool, &[], RecordingPlatform::default()).await;
    let report = file_report(&engine, "What is 2+2?").await;

    let outcome = engine.resolve_delete(report.id).await.unwrap();

    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.similar.len(), 1);
    assert_eq!(outcome.similar[0].question(), "what is 2 + 2??");
    assert_eq!(questions(&engine).await, vec!["what is 2 + 2??", "Capital of France?"]);

    let stored = engine.report(report.id).await.unwrap();
    assert_eq!(stored.status, ReportStatus::Deleted);
    assert_eq!(stored.action_taken, Some(ReportAction::QuizDeleted));
    assert_eq!(stored.deleted_quizzes, 1);
    assert!(stored.action_time.is_some());
    assert_eq!(engine.stats().await.quizzes_deleted_by_reports, 1);
}

#[tokio::test]
async fn exact_match_ignores_case() {
    let engine = engine(&[quiz("WHAT IS 2+2?")], &[], RecordingPlatform::default()).await;
    let report = file_report(&engine, "What is 2+2?").await;

    assert_eq!(engine.resolve_delete(report.id).await.unwrap().deleted, 1);
    assert!(questions(&engine).await.is_empty());
}

#[tokio::test]
async fn delete_similar_after_delete_accumulates_totals() {
    let pool = [quiz("What is 2+2?"), quiz("what is 2 + 2??"), quiz("Capital of France?")];
    let engine = engine(&pool, &[], RecordingPlatform::default()).await;
    let report = file_report(&engine, "What is 2+2?").await;

    engine.resolve_delete(report.id).await.unwrap();
    assert_eq!(engine.list_similar(report.id).await.unwrap().len(), 1);

    let outcome = engine.resolve_delete_similar(report.id).await.unwrap();
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.total_deleted, 2);
    assert_eq!(questions(&engine).await, vec!["Capital of France?"]);
    assert!(engine.list_similar(report.id).await.unwrap().is_empty());

    let stored = engine.report(report.id).await.unwrap();
    assert_eq!(stored.action_taken, Some(ReportAction::SimilarDeleted));
    assert_eq!(stored.deleted_quizzes, 1);
    assert_eq!(stored.additional_deleted, 1);
    assert_eq!(stored.total_deleted, 2);
    assert_eq!(engine.stats().await.quizzes_deleted_by_reports, 2);
}

#[tokio::test]
async fn delete_similar_works_on_a_pending_report() {
    let pool = [quiz("capital of France"), quiz("What is the capital of France?")];
    let engine = engine(&pool, &[], RecordingPlatform::default()).await;
    let report = file_report(&engine, "Capital of France").await;

    let outcome = engine.resolve_delete_similar(report.id).await.unwrap();

    assert_eq!(outcome.deleted, 2);
    assert!(questions(&engine).await.is_empty());
    assert_eq!(engine.report(report.id).await.unwrap().status, ReportStatus::Deleted);
}

#[tokio::test]
async fn delete_similar_spares_questions_with_other_operators() {
    let pool = [
        quiz("What is 2+2?"),
        quiz("what is 2 + 2??"),
        quiz("What is 2-2?"),
        quiz("What is 2*2?"),
    ];
    let engine = engine(&pool, &[], RecordingPlatform::default()).await;
    let report = file_report(&engine, "What is 2+2?").await;

    let outcome = engine.resolve_delete_similar(report.id).await.unwrap();

    assert_eq!(outcome.deleted, 2);
    assert_eq!(questions(&engine).await, vec!["What is 2-2?", "What is 2*2?"]);
}

#[tokio::test]
async fn ignore_is_terminal_and_leaves_quizzes_alone() {
    let engine = engine(&[quiz("What is 2+2?")], &[], RecordingPlatform::default()).await;
    let report = file_report(&engine, "What is 2+2?").await;

    let ignored = engine.resolve_ignore(report.id).await.unwrap();
    assert_eq!(ignored.status, ReportStatus::Ignored);
    assert_eq!(ignored.action_taken, Some(ReportAction::Ignored));

    assert!(matches!(engine.resolve_ignore(report.id).await, Err(Error::ReportNotFound(_))));
    assert!(matches!(engine.resolve_delete(report.id).await, Err(Error::ReportNotFound(_))));
    assert!(matches!(
        engine.resolve_delete_similar(report.id).await,
        Err(Error::ReportNotFound(_))
    ));
    assert_eq!(questions(&engine).await, vec!["What is 2+2?"]);
    assert_eq!(engine.stats().await.quizzes_deleted_by_reports, 0);
}

#[tokio::test]
async fn resolving_twice_is_rejected() {
    let engine = engine(&[quiz("What is 2+2?")], &[], RecordingPlatform::default()).await;
    let report = file_report(&engine, "What is 2+2?").await;

    engine.resolve_delete(report.id).await.unwrap();
    assert!(matches!(engine.resolve_delete(report.id).await, Err(Error::ReportNotFound(_))));
    assert!(matches!(engine.resolve_ignore(report.id).await, Err(Error::ReportNotFound(_))));
}

#[tokio::test]
async fn unknown_reports_are_not_found() {
    let engine = engine(&[], &[], RecordingPlatform::default()).await;
    let id = Uuid::new_v4();

    assert!(matches!(engine.resolve_delete(id).await, Err(Error::ReportNotFound(_))));
    assert!(matches!(engine.list_similar(id).await, Err(Error::ReportNotFound(_))));
}

#[tokio::test]
async fn clearing_keeps_pending_reports() {
    let engine = engine(&[], &[], RecordingPlatform::default()).await;
    let pending = file_report(&engine, "Pending?").await;
    let ignored = file_report(&engine, "Ignored?").await;
    let deleted = file_report(&engine, "Deleted?").await;
    engine.resolve_ignore(ignored.id).await.unwrap();
    engine.resolve_delete(deleted.id).await.unwrap();

    assert_eq!(engine.clear_resolved().await.unwrap(), 2);

    let left = engine.list_reports().await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id, pending.id);
    assert_eq!(engine.clear_resolved().await.unwrap(), 0);
}
