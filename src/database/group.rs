use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::SendKind;

/// A chat that receives quizzes. Never hard-deleted by delivery failures,
/// only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub chat_id: i64,
    pub title: String,
    pub is_active: bool,
    pub quizzes_received: u64,
    pub manual_quizzes_received: u64,
    pub member_count: u32,
    pub last_activity: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
}

impl Group {
    pub fn new(chat_id: i64, title: Option<String>, member_count: u32) -> Self {
        let now = Utc::now();
        Self {
            chat_id,
            title: title.unwrap_or_else(|| format!("Group {chat_id}")),
            is_active: true,
            quizzes_received: 0,
            manual_quizzes_received: 0,
            member_count,
            last_activity: now,
            added_at: now,
        }
    }

    pub fn record_delivery(&mut self, kind: SendKind, at: DateTime<Utc>) {
        match kind {
            SendKind::Scheduled => self.quizzes_received += 1,
            SendKind::Manual => self.manual_quizzes_received += 1,
        }
        self.last_activity = at;
    }
}
