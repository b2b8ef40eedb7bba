#![allow(dead_code)]

use std::{collections::HashSet, sync::Mutex, time::Duration};

use quizcast::{
    config::EngineConfig,
    database::{group::Group, memory::MemoryStore, quiz::Quiz, store::{GroupStore, QuizStore}},
    engine::Engine,
    error::DeliveryError,
    platform::{ChatPlatform, QuizPoll},
};

/// A poll as the platform saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct SentPoll {
    pub chat_id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub correct_option: u8,
    pub explanation: String,
    pub is_anonymous: bool,
    pub allows_multiple_answers: bool,
    pub open_period: Option<u16>,
}

/// Records every call and rejects sends to the configured chats.
#[derive(Default)]
pub struct RecordingPlatform {
    failing: HashSet<i64>,
    pub attempts: Mutex<Vec<i64>>,
    pub polls: Mutex<Vec<SentPoll>>,
    pub texts: Mutex<Vec<(i64, String)>>,
}

impl RecordingPlatform {
    pub fn failing(chat_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing: chat_ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> Vec<i64> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn polls(&self) -> Vec<SentPoll> {
        self.polls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(i64, String)> {
        self.texts.lock().unwrap().clone()
    }
}

impl ChatPlatform for RecordingPlatform {
    async fn send_quiz(&self, chat_id: i64, poll: &QuizPoll<'_>) -> Result<(), DeliveryError> {
        self.attempts.lock().unwrap().push(chat_id);
        if self.failing.contains(&chat_id) {
            return Err(DeliveryError::Rejected("bot was kicked".into()));
        }
        self.polls.lock().unwrap().push(SentPoll {
            chat_id,
            question: poll.question.to_owned(),
            options: poll.options.to_vec(),
            correct_option: poll.correct_option,
            explanation: poll.explanation.to_owned(),
            is_anonymous: poll.is_anonymous,
            allows_multiple_answers: poll.allows_multiple_answers,
            open_period: poll.open_period,
        });
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.attempts.lock().unwrap().push(chat_id);
        if self.failing.contains(&chat_id) {
            return Err(DeliveryError::Timeout);
        }
        self.texts.lock().unwrap().push((chat_id, text.to_owned()));
        Ok(())
    }

    async fn is_chat_admin(&self, _chat_id: i64, _user_id: u64) -> Result<bool, DeliveryError> {
        Ok(false)
    }
}

pub type TestEngine = Engine<MemoryStore, RecordingPlatform>;

pub fn quiz(question: &str) -> Quiz {
    Quiz::new(question.into(), vec!["3".into(), "4".into(), "5".into()], 1).unwrap()
}

pub async fn engine(quizzes: &[Quiz], group_ids: &[i64], platform: RecordingPlatform) -> TestEngine {
    let store = MemoryStore::new();
    for quiz in quizzes {
        store.insert_quiz(quiz).await.unwrap();
    }
    for chat_id in group_ids {
        store
            .save_group(&Group::new(*chat_id, Some(format!("Group {chat_id}")), 10))
            .await
            .unwrap();
    }

    let config = EngineConfig {
        pacing: Duration::ZERO,
        ..EngineConfig::default()
    };
    Engine::new(store, platform, config).await
}
