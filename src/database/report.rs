use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Deleted,
    Ignored,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Deleted => "deleted",
            ReportStatus::Ignored => "ignored",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "deleted" => Ok(ReportStatus::Deleted),
            "ignored" => Ok(ReportStatus::Ignored),
            other => Err(format!("unknown report status '{other}'")),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    QuizDeleted,
    SimilarDeleted,
    Ignored,
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportAction::QuizDeleted => "quiz_deleted",
            ReportAction::SimilarDeleted => "similar_deleted",
            ReportAction::Ignored => "ignored",
        }
    }
}

impl FromStr for ReportAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quiz_deleted" => Ok(ReportAction::QuizDeleted),
            "similar_deleted" => Ok(ReportAction::SimilarDeleted),
            "ignored" => Ok(ReportAction::Ignored),
            other => Err(format!("unknown report action '{other}'")),
        }
    }
}

/// Copy of the reported poll as it was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSnapshot {
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: u8,
}

impl QuizSnapshot {
    pub fn correct_answer(&self) -> Option<&str> {
        self.options.get(self.correct_option as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    pub user_id: u64,
    pub username: Option<String>,
    pub first_name: String,
}

impl fmt::Display for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(username) => write!(f, "{} (@{username})", self.first_name),
            None => f.write_str(&self.first_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub status: ReportStatus,
    pub snapshot: QuizSnapshot,
    pub reporter: Reporter,
    pub chat_id: i64,
    pub message_id: i32,
    pub group_name: Option<String>,
    pub reported_at: DateTime<Utc>,
    pub action_taken: Option<ReportAction>,
    pub action_time: Option<DateTime<Utc>>,
    pub deleted_quizzes: u64,
    pub additional_deleted: u64,
    pub total_deleted: u64,
}

impl Report {
    pub fn new(
        chat_id: i64,
        message_id: i32,
        group_name: Option<String>,
        snapshot: QuizSnapshot,
        reporter: Reporter,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: ReportStatus::Pending,
            snapshot,
            reporter,
            chat_id,
            message_id,
            group_name,
            reported_at: Utc::now(),
            action_taken: None,
            action_time: None,
            deleted_quizzes: 0,
            additional_deleted: 0,
            total_deleted: 0,
        }
    }

    /// Link to the reported message. Supergroup ids carry a `-100` prefix
    /// that t.me links omit.
    pub fn message_link(&self) -> String {
        let chat = self.chat_id.to_string();
        let chat = chat.strip_prefix("-100").unwrap_or(chat.trim_start_matches('-'));
        format!("https://t.me/c/{chat}/{}", self.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(chat_id: i64) -> Report {
        Report::new(
            chat_id,
            77,
            Some("Trivia".into()),
            QuizSnapshot {
                question: "Q".into(),
                options: vec!["a".into(), "b".into()],
                correct_option: 1,
            },
            Reporter {
                user_id: 1,
                username: None,
                first_name: "Ann".into(),
            },
        )
    }

    #[test]
    fn new_reports_are_pending() {
        let report = report(-1001234);
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.snapshot.correct_answer(), Some("b"));
    }

    #[test]
    fn message_link_strips_supergroup_prefix() {
        assert_eq!(report(-1001234).message_link(), "https://t.me/c/1234/77");
        assert_eq!(report(-5678).message_link(), "https://t.me/c/5678/77");
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [ReportStatus::Pending, ReportStatus::Deleted, ReportStatus::Ignored] {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }
        assert!("reviewed".parse::<ReportStatus>().is_err());
    }
}
