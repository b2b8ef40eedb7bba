use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SETTINGS_KEY: &str = "bot_settings";
pub const STATS_KEY: &str = "bot_stats";

pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_EXPLANATION: &str = "Check back later for results!";

/// Operator-tunable settings, persisted as a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub quiz_interval: u64,
    pub quiz_explanation: String,
    /// Advisory only, nothing enforces it.
    pub max_quizzes_per_day: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            quiz_interval: DEFAULT_INTERVAL_SECS,
            quiz_explanation: DEFAULT_EXPLANATION.into(),
            max_quizzes_per_day: 24,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Running counters. Only ever incremented, except by an explicit reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_quizzes_sent: u64,
    pub manual_quizzes_sent: u64,
    pub quizzes_added: u64,
    pub total_broadcasts_sent: u64,
    pub quiz_reports_received: u64,
    pub quizzes_deleted_by_reports: u64,
    pub group_engagement: BTreeMap<i64, u64>,
    pub bot_start_time: DateTime<Utc>,
    pub last_quiz_sent: Option<DateTime<Utc>>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_quizzes_sent: 0,
            manual_quizzes_sent: 0,
            quizzes_added: 0,
            total_broadcasts_sent: 0,
            quiz_reports_received: 0,
            quizzes_deleted_by_reports: 0,
            group_engagement: BTreeMap::new(),
            bot_start_time: Utc::now(),
            last_quiz_sent: None,
        }
    }
}

impl Stats {
    pub fn engage(&mut self, chat_id: i64) {
        *self.group_engagement.entry(chat_id).or_default() += 1;
    }

    pub fn total_engagement(&self) -> u64 {
        self.group_engagement.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_document_survives_json() {
        let mut stats = Stats::default();
        stats.engage(-100);
        stats.engage(-100);
        stats.engage(42);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["group_engagement"]["-100"], 2);

        let back: Stats = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_engagement(), 3);
    }
}
