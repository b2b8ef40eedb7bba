use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::{preview, Engine};
use crate::{
    database::{
        quiz::Quiz,
        report::{QuizSnapshot, Report, ReportAction, ReportStatus, Reporter},
        store::ContentStore,
    },
    error::{Error, Result},
    platform::ChatPlatform,
};

/// Result of deleting the exact matches of a reported question.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub deleted: u64,
    /// Near matches left in place for the operator to review.
    pub similar: Vec<Quiz>,
}

/// Result of deleting every near match of a reported question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSimilarOutcome {
    pub deleted: u64,
    pub total_deleted: u64,
}

/// Case-insensitive equality of two question texts.
pub fn is_exact_match(reported: &str, candidate: &str) -> bool {
    reported.to_lowercase() == candidate.to_lowercase()
}

/// Case-insensitive containment in either direction, ignoring whitespace
/// only. Punctuation and operators count. Blank questions match nothing.
pub fn is_similar(reported: &str, candidate: &str) -> bool {
    let reported = fold(reported);
    let candidate = fold(candidate);
    if reported.is_empty() || candidate.is_empty() {
        return false;
    }
    reported.contains(&candidate) || candidate.contains(&reported)
}

fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl<S, P> Engine<S, P>
where
    S: ContentStore,
    P: ChatPlatform,
{
    /// Files a new pending report. Duplicates of an open report are kept.
    #[instrument(level = "info", skip(self, snapshot))]
    pub async fn report_quiz(
        &self,
        chat_id: i64,
        message_id: i32,
        group_name: Option<String>,
        snapshot: QuizSnapshot,
        reporter: Reporter,
    ) -> Result<Report> {
        let report = Report::new(chat_id, message_id, group_name, snapshot, reporter);
        self.store.insert_report(&report).await?;
        self.update_stats(|stats| stats.quiz_reports_received += 1).await?;

        log::info!(
            "Quiz '{}' reported by {} in {chat_id}",
            preview(&report.snapshot.question),
            report.reporter
        );
        Ok(report)
    }

    /// Deletes quizzes whose question equals the reported one and lists the
    /// near matches without touching them.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve_delete(&self, report_id: Uuid) -> Result<DeleteOutcome> {
        let mut report = self.pending_report(report_id).await?;
        let question = report.snapshot.question.clone();

        let mut deleted = 0;
        let mut similar = Vec::new();
        for quiz in self.store.retreive_quizzes().await? {
            if is_exact_match(&question, quiz.question()) {
                if self.store.delete_quiz(quiz.id()).await? {
                    deleted += 1;
                }
            } else if is_similar(&question, quiz.question()) {
                similar.push(quiz);
            }
        }

        report.status = ReportStatus::Deleted;
        report.action_taken = Some(ReportAction::QuizDeleted);
        report.action_time = Some(Utc::now());
        report.deleted_quizzes = deleted;
        report.total_deleted = deleted + report.additional_deleted;
        self.store.update_report(&report).await?;

        self.update_stats(|stats| stats.quizzes_deleted_by_reports += deleted).await?;

        log::info!(
            "Report {report_id}: deleted {deleted} quizzes, {} similar left",
            similar.len()
        );
        Ok(DeleteOutcome { deleted, similar })
    }

    /// Deletes every quiz similar to the reported question. Allowed on a
    /// pending report or after [`Engine::resolve_delete`]; counts accumulate.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve_delete_similar(&self, report_id: Uuid) -> Result<DeleteSimilarOutcome> {
        let mut report = match self.store.retreive_report(report_id).await? {
            Some(report) if report.status != ReportStatus::Ignored => report,
            _ => return Err(Error::ReportNotFound(report_id)),
        };
        let question = report.snapshot.question.clone();

        let mut deleted = 0;
        for quiz in self.store.retreive_quizzes().await? {
            if is_similar(&question, quiz.question()) && self.store.delete_quiz(quiz.id()).await? {
                deleted += 1;
            }
        }

        report.status = ReportStatus::Deleted;
        report.action_taken = Some(ReportAction::SimilarDeleted);
        report.action_time = Some(Utc::now());
        report.additional_deleted += deleted;
        report.total_deleted = report.deleted_quizzes + report.additional_deleted;
        self.store.update_report(&report).await?;

        self.update_stats(|stats| stats.quizzes_deleted_by_reports += deleted).await?;

        log::info!(
            "Report {report_id}: deleted {deleted} similar quizzes, {} in total",
            report.total_deleted
        );
        Ok(DeleteSimilarOutcome {
            deleted,
            total_deleted: report.total_deleted,
        })
    }

    /// Marks a pending report ignored. Quizzes are never touched.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve_ignore(&self, report_id: Uuid) -> Result<Report> {
        let mut report = self.pending_report(report_id).await?;

        report.status = ReportStatus::Ignored;
        report.action_taken = Some(ReportAction::Ignored);
        report.action_time = Some(Utc::now());
        self.store.update_report(&report).await?;

        log::info!("Report {report_id} ignored");
        Ok(report)
    }

    /// Quizzes similar to the reported question, for review. Read-only.
    pub async fn list_similar(&self, report_id: Uuid) -> Result<Vec<Quiz>> {
        let report = self
            .store
            .retreive_report(report_id)
            .await?
            .ok_or(Error::ReportNotFound(report_id))?;

        Ok(self
            .store
            .retreive_quizzes()
            .await?
            .into_iter()
            .filter(|quiz| is_similar(&report.snapshot.question, quiz.question()))
            .collect())
    }

    pub async fn report(&self, report_id: Uuid) -> Result<Report> {
        self.store
            .retreive_report(report_id)
            .await?
            .ok_or(Error::ReportNotFound(report_id))
    }

    pub async fn list_pending_reports(&self) -> Result<Vec<Report>> {
        self.store.retreive_reports(Some(ReportStatus::Pending)).await
    }

    pub async fn list_reports(&self) -> Result<Vec<Report>> {
        self.store.retreive_reports(None).await
    }

    /// Deletes every report that is no longer pending, whatever its age.
    pub async fn clear_resolved(&self) -> Result<u64> {
        let cleared = self.store.delete_resolved_reports().await?;
        log::info!("Cleared {cleared} resolved reports");
        Ok(cleared)
    }

    async fn pending_report(&self, report_id: Uuid) -> Result<Report> {
        match self.store.retreive_report(report_id).await? {
            Some(report) if report.status == ReportStatus::Pending => Ok(report),
            _ => Err(Error::ReportNotFound(report_id)),
        }
    }
}
