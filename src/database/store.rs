use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    group::Group,
    quiz::{Quiz, SendKind},
    report::{Report, ReportStatus},
    settings::{Settings, Stats},
};
use crate::error::Result;

pub trait QuizStore {
    fn insert_quiz(&self, quiz: &Quiz) -> impl Future<Output = Result<()>> + Send;

    fn retreive_quizzes(&self) -> impl Future<Output = Result<Vec<Quiz>>> + Send;

    fn retreive_active_quizzes(&self) -> impl Future<Output = Result<Vec<Quiz>>> + Send;

    fn record_quiz_sent(
        &self,
        id: Uuid,
        kind: SendKind,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns whether a quiz with that id existed.
    fn delete_quiz(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    fn delete_all_quizzes(&self) -> impl Future<Output = Result<u64>> + Send;
}

pub trait GroupStore {
    fn retreive_group(&self, chat_id: i64) -> impl Future<Output = Result<Option<Group>>> + Send;

    fn retreive_groups(&self) -> impl Future<Output = Result<Vec<Group>>> + Send;

    /// Inserts the group or replaces the stored one with the same chat id.
    fn save_group(&self, group: &Group) -> impl Future<Output = Result<()>> + Send;

    fn set_group_active(
        &self,
        chat_id: i64,
        active: bool,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn record_group_delivery(
        &self,
        chat_id: i64,
        kind: SendKind,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_inactive_groups(&self) -> impl Future<Output = Result<u64>> + Send;

    fn activate_all_groups(&self) -> impl Future<Output = Result<u64>> + Send;
}

/// The `bot_settings` and `bot_stats` documents.
pub trait SingletonStore {
    fn load_settings(&self) -> impl Future<Output = Result<Option<Settings>>> + Send;

    fn save_settings(&self, settings: &Settings) -> impl Future<Output = Result<()>> + Send;

    fn load_stats(&self) -> impl Future<Output = Result<Option<Stats>>> + Send;

    fn save_stats(&self, stats: &Stats) -> impl Future<Output = Result<()>> + Send;
}

pub trait ReportStore {
    fn insert_report(&self, report: &Report) -> impl Future<Output = Result<()>> + Send;

    fn retreive_report(&self, id: Uuid) -> impl Future<Output = Result<Option<Report>>> + Send;

    fn update_report(&self, report: &Report) -> impl Future<Output = Result<()>> + Send;

    /// All reports when `status` is `None`, oldest first.
    fn retreive_reports(
        &self,
        status: Option<ReportStatus>,
    ) -> impl Future<Output = Result<Vec<Report>>> + Send;

    fn delete_resolved_reports(&self) -> impl Future<Output = Result<u64>> + Send;
}

pub trait ContentStore: QuizStore + GroupStore + SingletonStore + ReportStore + Send + Sync {}

impl<T> ContentStore for T where T: QuizStore + GroupStore + SingletonStore + ReportStore + Send + Sync {}
