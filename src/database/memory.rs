use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    group::Group,
    quiz::{Quiz, SendKind},
    report::{Report, ReportStatus},
    settings::{Settings, Stats},
    store::{GroupStore, QuizStore, ReportStore, SingletonStore},
};
use crate::error::Result;

/// In-process content store. Used when Postgres is unreachable, nothing
/// written here survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    quizzes: Vec<Quiz>,
    groups: Vec<Group>,
    settings: Option<Settings>,
    stats: Option<Stats>,
    reports: Vec<Report>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QuizStore for MemoryStore {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.state().quizzes.push(quiz.clone());
        Ok(())
    }

    async fn retreive_quizzes(&self) -> Result<Vec<Quiz>> {
        Ok(self.state().quizzes.clone())
    }

    async fn retreive_active_quizzes(&self) -> Result<Vec<Quiz>> {
        Ok(self
            .state()
            .quizzes
            .iter()
            .filter(|quiz| quiz.is_active())
            .cloned()
            .collect())
    }

    async fn record_quiz_sent(&self, id: Uuid, kind: SendKind, at: DateTime<Utc>) -> Result<()> {
        if let Some(quiz) = self.state().quizzes.iter_mut().find(|quiz| quiz.id() == id) {
            quiz.record_sent(kind, at);
        }
        Ok(())
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state();
        let before = state.quizzes.len();
        state.quizzes.retain(|quiz| quiz.id() != id);
        Ok(state.quizzes.len() != before)
    }

    async fn delete_all_quizzes(&self) -> Result<u64> {
        let mut state = self.state();
        let deleted = state.quizzes.len() as u64;
        state.quizzes.clear();
        Ok(deleted)
    }
}

impl GroupStore for MemoryStore {
    async fn retreive_group(&self, chat_id: i64) -> Result<Option<Group>> {
        Ok(self
            .state()
            .groups
            .iter()
            .find(|group| group.chat_id == chat_id)
            .cloned())
    }

    async fn retreive_groups(&self) -> Result<Vec<Group>> {
        Ok(self.state().groups.clone())
    }

    async fn save_group(&self, group: &Group) -> Result<()> {
        let mut state = self.state();
        match state.groups.iter_mut().find(|g| g.chat_id == group.chat_id) {
            Some(existing) => *existing = group.clone(),
            None => state.groups.push(group.clone()),
        }
        Ok(())
    }

    async fn set_group_active(&self, chat_id: i64, active: bool) -> Result<bool> {
        let mut state = self.state();
        match state.groups.iter_mut().find(|group| group.chat_id == chat_id) {
            Some(group) => {
                group.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_group_delivery(&self, chat_id: i64, kind: SendKind, at: DateTime<Utc>) -> Result<()> {
        if let Some(group) = self.state().groups.iter_mut().find(|g| g.chat_id == chat_id) {
            group.record_delivery(kind, at);
        }
        Ok(())
    }

    async fn delete_inactive_groups(&self) -> Result<u64> {
        let mut state = self.state();
        let before = state.groups.len();
        state.groups.retain(|group| group.is_active);
        Ok((before - state.groups.len()) as u64)
    }

    async fn activate_all_groups(&self) -> Result<u64> {
        let mut state = self.state();
        state.groups.iter_mut().for_each(|group| group.is_active = true);
        Ok(state.groups.len() as u64)
    }
}

impl SingletonStore for MemoryStore {
    async fn load_settings(&self) -> Result<Option<Settings>> {
        Ok(self.state().settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.state().settings = Some(settings.clone());
        Ok(())
    }

    async fn load_stats(&self) -> Result<Option<Stats>> {
        Ok(self.state().stats.clone())
    }

    async fn save_stats(&self, stats: &Stats) -> Result<()> {
        self.state().stats = Some(stats.clone());
        Ok(())
    }
}

impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &Report) -> Result<()> {
        self.state().reports.push(report.clone());
        Ok(())
    }

    async fn retreive_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.state().reports.iter().find(|r| r.id == id).cloned())
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        if let Some(existing) = self.state().reports.iter_mut().find(|r| r.id == report.id) {
            *existing = report.clone();
        }
        Ok(())
    }

    async fn retreive_reports(&self, status: Option<ReportStatus>) -> Result<Vec<Report>> {
        Ok(self
            .state()
            .reports
            .iter()
            .filter(|report| status.map_or(true, |status| report.status == status))
            .cloned()
            .collect())
    }

    async fn delete_resolved_reports(&self) -> Result<u64> {
        let mut state = self.state();
        let before = state.reports.len();
        state.reports.retain(|report| !report.status.is_resolved());
        Ok((before - state.reports.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_group_replaces_by_chat_id() {
        let store = MemoryStore::new();
        let mut group = Group::new(-1, Some("first".into()), 3);
        store.save_group(&group).await.unwrap();

        group.title = "renamed".into();
        store.save_group(&group).await.unwrap();

        let groups = store.retreive_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title, "renamed");
    }

    #[tokio::test]
    async fn inactive_groups_are_cleaned() {
        let store = MemoryStore::new();
        for chat_id in 1..=3 {
            store.save_group(&Group::new(chat_id, None, 0)).await.unwrap();
        }
        store.set_group_active(2, false).await.unwrap();

        assert_eq!(store.delete_inactive_groups().await.unwrap(), 1);
        assert!(store.retreive_group(2).await.unwrap().is_none());
        assert!(!store.set_group_active(2, true).await.unwrap());
    }
}
