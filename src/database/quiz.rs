use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

/// Which path delivered a quiz: the scheduler's batch or a group admin's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    id: Uuid,
    question: String,
    options: Vec<String>,
    correct_option: u8,
    is_active: bool,
    sent_count: u64,
    manual_sent_count: u64,
    last_sent: Option<DateTime<Utc>>,
    added_at: DateTime<Utc>,
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.question)?;
        for (i, option) in self.options.iter().enumerate() {
            let mark = if i == self.correct_option as usize { "✅" } else { "•" };
            writeln!(f, "{mark} {option}")?;
        }
        Ok(())
    }
}

impl Quiz {
    pub fn new(question: String, options: Vec<String>, correct_option: u8) -> Result<Self> {
        validate(&question, &options, correct_option)?;

        Ok(Self {
            id: Uuid::new_v4(),
            question,
            options,
            correct_option,
            is_active: true,
            sent_count: 0,
            manual_sent_count: 0,
            last_sent: None,
            added_at: Utc::now(),
        })
    }

    /// Rebuilds a quiz loaded from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn retreive(
        id: Uuid,
        question: String,
        options: Vec<String>,
        correct_option: u8,
        is_active: bool,
        sent_count: u64,
        manual_sent_count: u64,
        last_sent: Option<DateTime<Utc>>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            question,
            options,
            correct_option,
            is_active,
            sent_count,
            manual_sent_count,
            last_sent,
            added_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_option(&self) -> u8 {
        self.correct_option
    }

    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_option as usize]
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    pub fn manual_sent_count(&self) -> u64 {
        self.manual_sent_count
    }

    pub fn last_sent(&self) -> Option<DateTime<Utc>> {
        self.last_sent
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    pub fn record_sent(&mut self, kind: SendKind, at: DateTime<Utc>) {
        match kind {
            SendKind::Scheduled => self.sent_count += 1,
            SendKind::Manual => self.manual_sent_count += 1,
        }
        self.last_sent = Some(at);
    }

    #[cfg(test)]
    pub(crate) fn with_last_sent(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_sent = at;
        self
    }
}

fn validate(question: &str, options: &[String], correct_option: u8) -> Result<()> {
    if question.trim().is_empty() {
        return Err(Error::MalformedQuizSource("question is empty"));
    }
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(Error::MalformedQuizSource("a quiz needs between 2 and 10 options"));
    }
    if correct_option as usize >= options.len() {
        return Err(Error::MalformedQuizSource("correct option is out of range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    #[test]
    fn rejects_out_of_range_answer() {
        assert!(Quiz::new("Q".into(), options(3), 2).is_ok());
        assert!(matches!(
            Quiz::new("Q".into(), options(3), 3),
            Err(Error::MalformedQuizSource(_))
        ));
    }

    #[test]
    fn rejects_bad_option_counts() {
        assert!(Quiz::new("Q".into(), options(1), 0).is_err());
        assert!(Quiz::new("Q".into(), options(11), 0).is_err());
        assert!(Quiz::new("Q".into(), options(10), 9).is_ok());
    }

    #[test]
    fn record_sent_updates_matching_counter() {
        let mut quiz = Quiz::new("Q".into(), options(2), 0).unwrap();
        let now = Utc::now();
        quiz.record_sent(SendKind::Scheduled, now);
        quiz.record_sent(SendKind::Manual, now);
        quiz.record_sent(SendKind::Manual, now);
        assert_eq!(quiz.sent_count(), 1);
        assert_eq!(quiz.manual_sent_count(), 2);
        assert_eq!(quiz.last_sent(), Some(now));
    }
}
