//! The quiz distribution and moderation engine.
//!
//! [`Engine`] owns the store, the chat platform and the shared in-process
//! state (settings, stats, recent-sent window). Both the scheduler task and
//! the update handlers go through it.

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

pub mod dispatcher;
pub mod moderation;
pub mod scheduler;
pub mod selector;

use dispatcher::{DispatchReport, Dispatcher};
use selector::{select_quiz, RecentWindow};

use crate::{
    config::EngineConfig,
    database::{
        group::Group,
        quiz::{Quiz, SendKind},
        settings::{Settings, Stats},
        store::ContentStore,
    },
    error::{DeliveryError, Error, Result},
    ingest::QuizSource,
    interval::parse_interval,
    platform::ChatPlatform,
};

/// Token the caller must pass to wipe the quiz collection.
pub const RESET_CONFIRMATION: &str = "confirm";

pub struct Engine<S, P> {
    store: S,
    platform: P,
    dispatcher: Dispatcher,
    settings: RwLock<Settings>,
    stats: Mutex<Stats>,
    /// Guards selection, the quiz counters it bumps and the window itself.
    recent: Mutex<RecentWindow>,
    /// Held for the whole of a batch so batches never overlap.
    batch: Mutex<()>,
}

impl<S, P> Engine<S, P>
where
    S: ContentStore,
    P: ChatPlatform,
{
    /// Loads the singleton documents, creating them with defaults on first run.
    pub async fn new(store: S, platform: P, config: EngineConfig) -> Self {
        let settings = match store.load_settings().await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                let settings = Settings::default();
                if let Err(e) = store.save_settings(&settings).await {
                    log::error!("Failed to store default settings: {e}");
                }
                settings
            }
            Err(e) => {
                log::error!("Failed to load settings, using defaults: {e}");
                Settings::default()
            }
        };

        let stats = match store.load_stats().await {
            Ok(Some(stats)) => stats,
            Ok(None) => {
                let stats = Stats::default();
                if let Err(e) = store.save_stats(&stats).await {
                    log::error!("Failed to store initial stats: {e}");
                }
                stats
            }
            Err(e) => {
                log::error!("Failed to load stats, starting from zero: {e}");
                Stats::default()
            }
        };

        Self {
            store,
            platform,
            dispatcher: Dispatcher::new(config.pacing),
            settings: RwLock::new(settings),
            stats: Mutex::new(stats),
            recent: Mutex::new(RecentWindow::new(config.recent_capacity)),
            batch: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub async fn stats(&self) -> Stats {
        self.stats.lock().await.clone()
    }

    /// Current dispatch interval in seconds.
    pub async fn interval(&self) -> u64 {
        self.settings.read().await.quiz_interval
    }

    pub async fn recent_window(&self) -> RecentWindow {
        self.recent.lock().await.clone()
    }

    /// One scheduled cycle: select a quiz and send it to every active group.
    #[instrument(level = "info", skip(self))]
    pub async fn send_scheduled_batch(&self) -> Result<DispatchReport> {
        let _batch = self.batch.lock().await;

        let groups: Vec<Group> = self
            .store
            .retreive_groups()
            .await?
            .into_iter()
            .filter(|group| group.is_active)
            .collect();
        if groups.is_empty() {
            return Err(Error::NoEligibleContent("no active groups"));
        }

        let quiz = self.pick_and_track(SendKind::Scheduled).await?;
        let explanation = self.settings.read().await.quiz_explanation.clone();

        log::info!("Sending quiz '{}' to {} active groups", preview(quiz.question()), groups.len());
        let report = self
            .dispatcher
            .dispatch_quiz(&self.store, &self.platform, &quiz, &explanation, &groups, SendKind::Scheduled)
            .await;

        self.update_stats(|stats| {
            stats.total_quizzes_sent += report.succeeded as u64;
            stats.last_quiz_sent = Some(Utc::now());
            report.delivered_group_ids.iter().for_each(|chat_id| stats.engage(*chat_id));
        })
        .await?;

        log::info!(
            "Sent quiz '{}' to {}/{} groups, {} failed",
            preview(quiz.question()),
            report.succeeded,
            report.attempted,
            report.failed()
        );
        Ok(report)
    }

    /// Sends one quiz to a single group on request of one of its admins.
    /// Registers the group on first contact and reactivates it if needed.
    #[instrument(level = "info", skip(self))]
    pub async fn send_manual(&self, chat_id: i64, title: Option<String>) -> Result<Quiz> {
        if self.store.retreive_active_quizzes().await?.is_empty() {
            return Err(Error::NoEligibleContent("no active quizzes"));
        }

        let mut group = self.ensure_group_registered(chat_id, title).await?;
        if !group.is_active {
            self.store.set_group_active(chat_id, true).await?;
            group.is_active = true;
        }

        // counted as sent even if delivery below fails
        let quiz = self.pick_and_track(SendKind::Manual).await?;
        let explanation = self.settings.read().await.quiz_explanation.clone();

        let report = self
            .dispatcher
            .dispatch_quiz(
                &self.store,
                &self.platform,
                &quiz,
                &explanation,
                std::slice::from_ref(&group),
                SendKind::Manual,
            )
            .await;
        if report.succeeded == 0 {
            return Err(Error::DeliveryFailed(DeliveryError::Rejected(format!(
                "quiz could not be delivered to {chat_id}"
            ))));
        }

        self.update_stats(|stats| {
            stats.manual_quizzes_sent += 1;
            stats.engage(chat_id);
        })
        .await?;

        log::info!("Manual quiz '{}' sent to {}", preview(quiz.question()), group.title);
        Ok(quiz)
    }

    /// Sends `text` to every active group.
    #[instrument(level = "info", skip(self, text))]
    pub async fn broadcast(&self, text: &str) -> Result<DispatchReport> {
        let _batch = self.batch.lock().await;

        let groups = self.store.retreive_groups().await?;
        if !groups.iter().any(|group| group.is_active) {
            return Err(Error::NoEligibleContent("no active groups"));
        }

        let report = self
            .dispatcher
            .dispatch_broadcast(&self.store, &self.platform, text, &groups)
            .await;

        self.update_stats(|stats| stats.total_broadcasts_sent += report.succeeded as u64)
            .await?;

        log::info!("Broadcast delivered to {}/{} groups", report.succeeded, report.attempted);
        Ok(report)
    }

    /// Parses and stores a new dispatch interval. The running wait is not
    /// shortened; the new value applies from the next cycle.
    pub async fn set_interval(&self, token: &str) -> Result<u64> {
        let seconds = parse_interval(token)?;

        let mut settings = self.settings.write().await;
        let previous = settings.quiz_interval;
        settings.quiz_interval = seconds;
        settings.updated_at = Utc::now();

        if let Err(e) = self.save_settings(&settings).await {
            settings.quiz_interval = previous;
            return Err(e);
        }

        log::info!("Quiz interval changed from {previous}s to {seconds}s");
        Ok(seconds)
    }

    pub async fn set_explanation(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Config("explanation must not be empty".into()));
        }

        let mut settings = self.settings.write().await;
        let previous = std::mem::replace(&mut settings.quiz_explanation, text.to_owned());
        settings.updated_at = Utc::now();

        if let Err(e) = self.save_settings(&settings).await {
            settings.quiz_explanation = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Stores a quiz received from the admin. Only quiz-mode polls are accepted.
    #[instrument(level = "info", skip(self))]
    pub async fn ingest(&self, source: QuizSource) -> Result<Quiz> {
        let QuizSource::Quiz {
            question,
            options,
            correct_option,
        } = source
        else {
            return Err(Error::MalformedQuizSource("poll has no correct answer"));
        };

        let quiz = Quiz::new(question, options, correct_option)?;
        self.store.insert_quiz(&quiz).await?;
        self.update_stats(|stats| stats.quizzes_added += 1).await?;

        log::info!("Saved quiz '{}'", preview(quiz.question()));
        Ok(quiz)
    }

    /// Deletes every quiz and forgets the recent window. Irreversible, so
    /// the caller has to pass [`RESET_CONFIRMATION`].
    #[instrument(level = "warn", skip(self))]
    pub async fn reset_quizzes(&self, confirmation: &str) -> Result<u64> {
        if !confirmation.trim().eq_ignore_ascii_case(RESET_CONFIRMATION) {
            return Err(Error::ConfirmationRequired);
        }

        let mut recent = self.recent.lock().await;
        let deleted = self.store.delete_all_quizzes().await?;
        recent.clear();
        drop(recent);

        self.update_stats(|stats| stats.quizzes_added = 0).await?;

        log::warn!("Deleted all {deleted} quizzes");
        Ok(deleted)
    }

    /// Registers a group the bot was added to. A known group keeps its
    /// counters and is reactivated.
    pub async fn register_group(&self, chat_id: i64, title: Option<String>, member_count: u32) -> Result<(Group, bool)> {
        let (group, existed) = match self.store.retreive_group(chat_id).await? {
            Some(mut group) => {
                if let Some(title) = title {
                    group.title = title;
                }
                group.member_count = member_count;
                group.is_active = true;
                group.last_activity = Utc::now();
                (group, true)
            }
            None => (Group::new(chat_id, title, member_count), false),
        };

        self.store.save_group(&group).await?;
        log::info!("Registered group {} ({chat_id}), known before: {existed}", group.title);
        Ok((group, existed))
    }

    pub async fn ensure_group_registered(&self, chat_id: i64, title: Option<String>) -> Result<Group> {
        match self.store.retreive_group(chat_id).await? {
            Some(group) => Ok(group),
            None => {
                let group = Group::new(chat_id, title, 0);
                self.store.save_group(&group).await?;
                log::info!("Auto-registered group {} ({chat_id})", group.title);
                Ok(group)
            }
        }
    }

    pub async fn quizzes(&self) -> Result<Vec<Quiz>> {
        self.store.retreive_quizzes().await
    }

    pub async fn groups(&self) -> Result<Vec<Group>> {
        self.store.retreive_groups().await
    }

    pub async fn remove_group(&self, chat_id: i64) -> Result<bool> {
        self.store.set_group_active(chat_id, false).await
    }

    pub async fn clean_inactive_groups(&self) -> Result<u64> {
        let removed = self.store.delete_inactive_groups().await?;
        log::info!("Removed {removed} inactive groups");
        Ok(removed)
    }

    pub async fn reactivate_all_groups(&self) -> Result<u64> {
        let reactivated = self.store.activate_all_groups().await?;
        log::info!("Reactivated {reactivated} groups");
        Ok(reactivated)
    }

    /// Selection and its bookkeeping form one critical section so the manual
    /// and scheduled paths never lose each other's updates.
    async fn pick_and_track(&self, kind: SendKind) -> Result<Quiz> {
        let mut recent = self.recent.lock().await;
        let pool = self.store.retreive_active_quizzes().await?;

        let picked = {
            let mut rng = rand::thread_rng();
            select_quiz(&pool, &recent, &mut rng).cloned()
        };
        let Some(mut quiz) = picked else {
            return Err(Error::NoEligibleContent("no active quizzes"));
        };

        let now = Utc::now();
        self.store.record_quiz_sent(quiz.id(), kind, now).await?;
        quiz.record_sent(kind, now);
        recent.track(quiz.id());

        log::debug!(
            "Selected '{}' from {} active quizzes, {} recent",
            preview(quiz.question()),
            pool.len(),
            recent.len()
        );
        Ok(quiz)
    }

    pub(crate) async fn update_stats(&self, apply: impl FnOnce(&mut Stats)) -> Result<()> {
        let mut stats = self.stats.lock().await;
        apply(&mut stats);

        if let Err(e) = self.store.save_stats(&stats).await {
            log::warn!("Saving stats failed ({e}), retrying once");
            self.store.save_stats(&stats).await?;
        }
        Ok(())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        if let Err(e) = self.store.save_settings(settings).await {
            log::warn!("Saving settings failed ({e}), retrying once");
            self.store.save_settings(settings).await?;
        }
        Ok(())
    }
}

pub(crate) fn preview(text: &str) -> String {
    const LIMIT: usize = 50;
    if text.chars().count() <= LIMIT {
        text.to_owned()
    } else {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{cut}...")
    }
}
