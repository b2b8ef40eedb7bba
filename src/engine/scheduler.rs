use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use super::Engine;
use crate::{database::store::ContentStore, error::Error, platform::ChatPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting(Duration),
    Dispatching,
}

/// Periodic dispatch loop. Waits one interval, runs a batch, repeats.
pub struct Scheduler<S, P> {
    engine: Arc<Engine<S, P>>,
    state: watch::Sender<SchedulerState>,
}

impl<S, P> Scheduler<S, P>
where
    S: ContentStore + 'static,
    P: ChatPlatform + 'static,
{
    pub fn new(engine: Arc<Engine<S, P>>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self { engine, state }
    }

    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The interval is read anew before every wait. Shutdown only interrupts
    /// the wait; a batch already in progress is finished first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!("Quiz scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let interval = Duration::from_secs(self.engine.interval().await);
            self.state.send_replace(SchedulerState::Waiting(interval));
            log::debug!("Next quiz batch in {}s", interval.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            self.state.send_replace(SchedulerState::Dispatching);
            match self.engine.send_scheduled_batch().await {
                Ok(report) => log::debug!(
                    "Scheduled batch done: {}/{} delivered",
                    report.succeeded,
                    report.attempted
                ),
                Err(Error::NoEligibleContent(reason)) => {
                    log::info!("Skipping scheduled batch: {reason}")
                }
                Err(e) => log::error!("Scheduled batch failed: {e}"),
            }
        }

        self.state.send_replace(SchedulerState::Idle);
        log::info!("Quiz scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        config::EngineConfig,
        database::{group::Group, memory::MemoryStore, quiz::Quiz, store::{GroupStore, QuizStore}},
        error::DeliveryError,
        platform::QuizPoll,
    };

    #[derive(Default)]
    struct CountingPlatform {
        sent: Mutex<Vec<i64>>,
    }

    impl ChatPlatform for CountingPlatform {
        async fn send_quiz(&self, chat_id: i64, _poll: &QuizPoll<'_>) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(chat_id);
            Ok(())
        }

        async fn send_text(&self, _chat_id: i64, _text: &str) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn is_chat_admin(&self, _chat_id: i64, _user_id: u64) -> Result<bool, DeliveryError> {
            Ok(false)
        }
    }

    async fn engine() -> Arc<Engine<MemoryStore, CountingPlatform>> {
        let store = MemoryStore::new();
        store
            .insert_quiz(&Quiz::new("2+2?".into(), vec!["3".into(), "4".into()], 1).unwrap())
            .await
            .unwrap();
        store.save_group(&Group::new(-100, Some("Group".into()), 3)).await.unwrap();

        let config = EngineConfig {
            pacing: Duration::ZERO,
            ..EngineConfig::default()
        };
        Arc::new(Engine::new(store, CountingPlatform::default(), config).await)
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_once_per_interval_and_stops_on_shutdown() {
        let engine = engine().await;
        let interval = Duration::from_secs(engine.interval().await);

        let (stop, shutdown) = watch::channel(false);
        let scheduler = Scheduler::new(engine.clone());
        let handle = tokio::spawn(scheduler.run(shutdown));

        tokio::time::sleep(interval / 2).await;
        assert!(engine.platform().sent.lock().unwrap().is_empty());

        tokio::time::sleep(interval).await;
        assert_eq!(engine.platform().sent.lock().unwrap().len(), 1);

        tokio::time::sleep(interval).await;
        assert_eq!(engine.platform().sent.lock().unwrap().len(), 2);

        stop.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(engine.stats().await.total_quizzes_sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn new_interval_applies_from_the_next_wait() {
        let engine = engine().await;
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(Scheduler::new(engine.clone()).run(shutdown));

        tokio::time::sleep(Duration::from_secs(10)).await;
        engine.set_interval("1m").await.unwrap();

        // the running one-hour wait is not cut short
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(engine.platform().sent.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        let sent = engine.platform().sent.lock().unwrap().len();
        assert!(sent >= 2, "expected minute-paced batches after the first, got {sent}");

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reports_state_transitions() {
        let engine = engine().await;
        let scheduler = Scheduler::new(engine);
        let state = scheduler.state();
        assert_eq!(*state.borrow(), SchedulerState::Idle);

        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*state.borrow(), SchedulerState::Waiting(Duration::from_secs(3600)));

        stop.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(*state.borrow(), SchedulerState::Idle);
    }
}
