use std::time::Duration;

use chrono::Utc;

use crate::{
    database::{
        group::Group,
        quiz::{Quiz, SendKind},
        store::GroupStore,
    },
    platform::{ChatPlatform, QuizPoll},
};

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed_group_ids: Vec<i64>,
    pub delivered_group_ids: Vec<i64>,
}

impl DispatchReport {
    pub fn failed(&self) -> usize {
        self.failed_group_ids.len()
    }
}

enum Payload<'a> {
    Quiz { poll: QuizPoll<'a>, kind: SendKind },
    Broadcast(&'a str),
}

/// Sends one payload to many groups, strictly one at a time with a fixed
/// pause between sends. A group that cannot be reached is deactivated and
/// the batch moves on.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    pacing: Duration,
}

impl Dispatcher {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    pub async fn dispatch_quiz<S, P>(
        &self,
        store: &S,
        platform: &P,
        quiz: &Quiz,
        explanation: &str,
        groups: &[Group],
        kind: SendKind,
    ) -> DispatchReport
    where
        S: GroupStore + Sync,
        P: ChatPlatform,
    {
        let payload = Payload::Quiz {
            poll: QuizPoll::for_quiz(quiz, explanation),
            kind,
        };
        self.fan_out(store, platform, groups, payload).await
    }

    pub async fn dispatch_broadcast<S, P>(
        &self,
        store: &S,
        platform: &P,
        text: &str,
        groups: &[Group],
    ) -> DispatchReport
    where
        S: GroupStore + Sync,
        P: ChatPlatform,
    {
        self.fan_out(store, platform, groups, Payload::Broadcast(text)).await
    }

    async fn fan_out<S, P>(&self, store: &S, platform: &P, groups: &[Group], payload: Payload<'_>) -> DispatchReport
    where
        S: GroupStore + Sync,
        P: ChatPlatform,
    {
        let mut report = DispatchReport::default();

        for group in groups.iter().filter(|group| group.is_active) {
            if report.attempted > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            report.attempted += 1;

            let delivered = match &payload {
                Payload::Quiz { poll, .. } => platform.send_quiz(group.chat_id, poll).await,
                Payload::Broadcast(text) => platform.send_text(group.chat_id, text).await,
            };

            match delivered {
                Ok(()) => {
                    report.succeeded += 1;
                    report.delivered_group_ids.push(group.chat_id);

                    if let Payload::Quiz { kind, .. } = &payload {
                        if let Err(e) = store.record_group_delivery(group.chat_id, *kind, Utc::now()).await {
                            log::error!("Failed to record delivery to group {}: {e}", group.chat_id);
                        }
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Failed to send to group {} ({}): {e}; marking it inactive",
                        group.chat_id,
                        group.title
                    );
                    report.failed_group_ids.push(group.chat_id);

                    if let Err(e) = store.set_group_active(group.chat_id, false).await {
                        log::error!("Failed to deactivate group {}: {e}", group.chat_id);
                    }
                }
            }
        }

        report
    }
}
