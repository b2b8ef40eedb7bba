use std::{future::Future, time::Duration};

use teloxide::{
    payloads::SendPollSetters,
    prelude::Requester,
    requests::Request,
    types::{ChatId, PollType, UserId},
    Bot,
};

use crate::{database::quiz::Quiz, error::DeliveryError};

/// Everything the platform is told about a quiz poll.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPoll<'a> {
    pub question: &'a str,
    pub options: &'a [String],
    pub correct_option: u8,
    pub explanation: &'a str,
    pub is_anonymous: bool,
    pub allows_multiple_answers: bool,
    /// `None` means the poll never closes on its own.
    pub open_period: Option<u16>,
}

impl<'a> QuizPoll<'a> {
    /// Voters are always visible and exactly one answer is allowed,
    /// whatever the source poll was.
    pub fn for_quiz(quiz: &'a Quiz, explanation: &'a str) -> Self {
        Self {
            question: quiz.question(),
            options: quiz.options(),
            correct_option: quiz.correct_option(),
            explanation,
            is_anonymous: false,
            allows_multiple_answers: false,
            open_period: None,
        }
    }
}

pub trait ChatPlatform: Send + Sync {
    fn send_quiz(
        &self,
        chat_id: i64,
        poll: &QuizPoll<'_>,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    fn send_text(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    /// Whether the user owns or administers the chat.
    fn is_chat_admin(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> impl Future<Output = Result<bool, DeliveryError>> + Send;
}

/// Telegram Bot API client with every call bounded by `timeout`.
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
    timeout: Duration,
}

impl TelegramPlatform {
    pub fn new(bot: Bot, timeout: Duration) -> Self {
        Self { bot, timeout }
    }

    async fn bounded<F, T>(&self, request: F) -> Result<T, DeliveryError>
    where
        F: Future<Output = Result<T, teloxide::RequestError>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DeliveryError::Rejected(e.to_string())),
            Err(_) => Err(DeliveryError::Timeout),
        }
    }
}

impl ChatPlatform for TelegramPlatform {
    async fn send_quiz(&self, chat_id: i64, poll: &QuizPoll<'_>) -> Result<(), DeliveryError> {
        let mut request = self
            .bot
            .send_poll(ChatId(chat_id), poll.question, poll.options.iter().cloned())
            .type_(PollType::Quiz)
            .is_anonymous(poll.is_anonymous)
            .allows_multiple_answers(poll.allows_multiple_answers)
            .correct_option_id(poll.correct_option)
            .explanation(poll.explanation);
        if let Some(period) = poll.open_period {
            request = request.open_period(period);
        }

        self.bounded(request.send()).await.map(|_| ())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.bounded(self.bot.send_message(ChatId(chat_id), text).send())
            .await
            .map(|_| ())
    }

    async fn is_chat_admin(&self, chat_id: i64, user_id: u64) -> Result<bool, DeliveryError> {
        let member = self
            .bounded(self.bot.get_chat_member(ChatId(chat_id), UserId(user_id)).send())
            .await?;
        Ok(member.kind.is_privileged())
    }
}
