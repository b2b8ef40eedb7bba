use std::{fmt::Write, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use teloxide::{payloads::SendMessageSetters, prelude::Requester, types::Message, Bot};
use tracing::instrument;

use crate::{
    database::{
        group::Group,
        quiz::Quiz,
        report::{Report, ReportStatus},
        settings::{Settings, Stats},
    },
    engine::RESET_CONFIRMATION,
    error::Error,
    ingest::QuizSource,
    interval::format_interval,
    keyboard::{groups_keyboard, settings_keyboard},
    state::AdminState,
    BotEngine, HandlerResult, UserDialogue,
};

const POLL_HOWTO: &str = "❌ Please send a QUIZ MODE poll to save it as a quiz.\n\n\
    1. Tap the attachment icon and pick 'Poll'\n\
    2. Enter the question and 2 to 10 options\n\
    3. Enable 'Quiz Mode' and mark the correct answer\n\
    4. Send it to me\n\n\
    Quizzes are always sent to groups as non-anonymous single-answer polls.";

#[instrument(level = "info", skip(bot, engine))]
pub(crate) async fn show_stats(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    bot.send_message(msg.chat.id, stats_text(&engine).await?).await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, engine))]
pub(crate) async fn show_settings(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    bot.send_message(msg.chat.id, settings_text(&engine).await?)
        .reply_markup(settings_keyboard())
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, engine))]
pub(crate) async fn broadcast(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    engine: Arc<BotEngine>,
    text: String,
) -> HandlerResult {
    if text.trim().is_empty() {
        bot.send_message(msg.chat.id, "📢 Send the message to broadcast to all groups, or /cancel.")
            .await?;
        dialogue.update(AdminState::AwaitingBroadcast).await?;
        return Ok(());
    }

    send_broadcast(&bot, &msg, &engine, &text).await
}

#[instrument(level = "info", skip(bot, dialogue, engine))]
pub(crate) async fn receive_broadcast(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    engine: Arc<BotEngine>,
) -> HandlerResult {
    match msg.text() {
        Some(text) => {
            dialogue.update(AdminState::Idle).await?;
            send_broadcast(&bot, &msg, &engine, text).await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please, send the broadcast as plain text.")
                .await?;
        }
    }
    Ok(())
}

async fn send_broadcast(bot: &Bot, msg: &Message, engine: &BotEngine, text: &str) -> HandlerResult {
    match engine.broadcast(text).await {
        Ok(report) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "✅ Broadcast sent to {}/{} groups. {} failed and were marked inactive.",
                    report.succeeded,
                    report.attempted,
                    report.failed()
                ),
            )
            .await?;
        }
        Err(Error::NoEligibleContent(reason)) => {
            bot.send_message(msg.chat.id, format!("❌ Nothing to do: {reason}."))
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, engine))]
pub(crate) async fn set_delay(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    engine: Arc<BotEngine>,
    token: String,
) -> HandlerResult {
    if token.trim().is_empty() {
        bot.send_message(
            msg.chat.id,
            format!(
                "🕐 Current interval: {}\n\nSend a new one, e.g. 2h, 90m, 1.5h or a bare number of hours.",
                format_interval(engine.interval().await)
            ),
        )
        .await?;
        dialogue.update(AdminState::AwaitingInterval).await?;
        return Ok(());
    }

    apply_interval(&bot, &msg, &engine, &token).await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, engine))]
pub(crate) async fn receive_interval(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    engine: Arc<BotEngine>,
) -> HandlerResult {
    let Some(token) = msg.text() else {
        bot.send_message(msg.chat.id, "Please, send the interval as text, e.g. 2h.")
            .await?;
        return Ok(());
    };

    if apply_interval(&bot, &msg, &engine, token).await? {
        dialogue.update(AdminState::Idle).await?;
    }
    Ok(())
}

// true once the interval was stored
async fn apply_interval(bot: &Bot, msg: &Message, engine: &BotEngine, token: &str) -> Result<bool, crate::HandlerError> {
    match engine.set_interval(token).await {
        Ok(seconds) => {
            bot.send_message(
                msg.chat.id,
                format!("✅ Quiz interval set to {}. It applies from the next cycle.", format_interval(seconds)),
            )
            .await?;
            Ok(true)
        }
        Err(Error::InvalidInterval(raw)) => {
            bot.send_message(
                msg.chat.id,
                format!("❌ Can't understand '{raw}'. Try 2h, 30m, 1.5h or 2."),
            )
            .await?;
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(level = "info", skip(bot, dialogue, engine))]
pub(crate) async fn set_explanation(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    engine: Arc<BotEngine>,
    text: String,
) -> HandlerResult {
    if text.trim().is_empty() {
        bot.send_message(
            msg.chat.id,
            format!(
                "📝 Current explanation:\n{}\n\nSend the new text, or /cancel.",
                engine.settings().await.quiz_explanation
            ),
        )
        .await?;
        dialogue.update(AdminState::AwaitingExplanation).await?;
        return Ok(());
    }

    engine.set_explanation(&text).await?;
    bot.send_message(msg.chat.id, "✅ Quiz explanation updated.").await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, engine))]
pub(crate) async fn receive_explanation(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    engine: Arc<BotEngine>,
) -> HandlerResult {
    match msg.text().map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => {
            engine.set_explanation(text).await?;
            dialogue.update(AdminState::Idle).await?;
            bot.send_message(msg.chat.id, "✅ Quiz explanation updated.").await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please, send the explanation as text.")
                .await?;
        }
    }
    Ok(())
}

#[instrument(level = "warn", skip(bot, engine))]
pub(crate) async fn reset(bot: Bot, msg: Message, engine: Arc<BotEngine>, confirmation: String) -> HandlerResult {
    match engine.reset_quizzes(&confirmation).await {
        Ok(deleted) => {
            bot.send_message(msg.chat.id, format!("✅ Deleted all {deleted} quizzes."))
                .await?;
        }
        Err(Error::ConfirmationRequired) => {
            let total = engine.quizzes().await?.len();
            bot.send_message(
                msg.chat.id,
                format!(
                    "⚠️ This deletes all {total} quizzes and cannot be undone.\n\nSend /reset {RESET_CONFIRMATION} to proceed."
                ),
            )
            .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub(crate) async fn show_reports(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    bot.send_message(msg.chat.id, reports_text(&engine.list_reports().await?))
        .await?;
    Ok(())
}

pub(crate) async fn clear_reports(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    let cleared = engine.clear_resolved().await?;
    bot.send_message(msg.chat.id, format!("🗑️ Cleared {cleared} resolved reports."))
        .await?;
    Ok(())
}

pub(crate) async fn show_groups(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    let groups = engine.groups().await?;
    bot.send_message(msg.chat.id, groups_text(&groups))
        .reply_markup(groups_keyboard(&groups))
        .await?;
    Ok(())
}

pub(crate) async fn clean_groups(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    let removed = engine.clean_inactive_groups().await?;
    bot.send_message(msg.chat.id, format!("🗑️ Removed {removed} inactive groups."))
        .await?;
    Ok(())
}

pub(crate) async fn reactivate_groups(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    let reactivated = engine.reactivate_all_groups().await?;
    bot.send_message(msg.chat.id, format!("🔄 Reactivated {reactivated} groups."))
        .await?;
    Ok(())
}

/// Anything the admin sends privately outside of a dialogue.
#[instrument(level = "info", skip(bot, engine))]
pub(crate) async fn receive_quiz(bot: Bot, msg: Message, engine: Arc<BotEngine>) -> HandlerResult {
    let Some(poll) = msg.poll() else {
        bot.send_message(msg.chat.id, POLL_HOWTO).await?;
        return Ok(());
    };

    match engine.ingest(QuizSource::from_poll(poll)).await {
        Ok(quiz) => {
            let total = engine.quizzes().await?.len();
            bot.send_message(
                msg.chat.id,
                format!(
                    "✅ Quiz saved!\n\n📝 {}\n✅ Correct answer: {}\n📊 Quizzes in the pool: {total}",
                    quiz.question(),
                    quiz.correct_answer()
                ),
            )
            .await?;
        }
        Err(Error::MalformedQuizSource(reason)) => {
            log::info!("Rejected poll from admin: {reason}");
            bot.send_message(msg.chat.id, format!("{POLL_HOWTO}\n\nRejected: {reason}."))
                .await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub(crate) async fn stats_text(engine: &BotEngine) -> crate::Result<String> {
    let quizzes = engine.quizzes().await?;
    let groups = engine.groups().await?;
    let reports = engine.list_reports().await?;
    Ok(render_stats(
        &engine.stats().await,
        &engine.settings().await,
        &quizzes,
        &groups,
        &reports,
        Utc::now(),
    ))
}

pub(crate) async fn settings_text(engine: &BotEngine) -> crate::Result<String> {
    let quizzes = engine.quizzes().await?;
    let groups = engine.groups().await?;
    Ok(render_settings(
        &engine.settings().await,
        &engine.stats().await,
        &quizzes,
        &groups,
        engine.store().is_degraded(),
    ))
}

fn render_stats(
    stats: &Stats,
    settings: &Settings,
    quizzes: &[Quiz],
    groups: &[Group],
    reports: &[Report],
    now: DateTime<Utc>,
) -> String {
    let active_groups = groups.iter().filter(|group| group.is_active).count();
    let week_ago = now - Duration::days(7);
    let recently_active = groups
        .iter()
        .filter(|group| group.is_active && group.last_activity > week_ago)
        .count();
    let most_sent = quizzes.iter().map(Quiz::sent_count).max().unwrap_or(0);
    let pending = reports
        .iter()
        .filter(|report| report.status == ReportStatus::Pending)
        .count();
    let per_group = if groups.is_empty() {
        0.0
    } else {
        stats.total_quizzes_sent as f64 / groups.len() as f64
    };

    format!(
        "📊 Bot statistics\n\n\
         📝 Quizzes\n\
         • In the pool: {}\n\
         • Added: {}\n\
         • Most sent quiz: {most_sent} times\n\
         • Deleted by reports: {}\n\n\
         👥 Groups\n\
         • Total: {}\n\
         • Active: {active_groups}\n\
         • Active this week: {recently_active}\n\
         • Quizzes sent: {}\n\
         • Manual quizzes sent: {}\n\
         • Broadcasts delivered: {}\n\n\
         ⚠️ Reports\n\
         • Received: {}\n\
         • Pending: {pending}\n\
         • Resolved: {}\n\n\
         ⏰ Timing\n\
         • Running since: {}\n\
         • Last quiz sent: {}\n\
         • Interval: {}\n\n\
         📈 Engagement\n\
         • Avg quizzes per group: {per_group:.1}\n\
         • Total engagement: {}",
        quizzes.len(),
        stats.quizzes_added,
        stats.quizzes_deleted_by_reports,
        groups.len(),
        stats.total_quizzes_sent,
        stats.manual_quizzes_sent,
        stats.total_broadcasts_sent,
        stats.quiz_reports_received,
        reports.len() - pending,
        stats.bot_start_time.format("%Y-%m-%d %H:%M"),
        stats
            .last_quiz_sent
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".into()),
        format_interval(settings.quiz_interval),
        stats.total_engagement(),
    )
}

fn render_settings(settings: &Settings, stats: &Stats, quizzes: &[Quiz], groups: &[Group], degraded: bool) -> String {
    format!(
        "⚙️ Bot settings\n\n\
         🕐 Quiz interval: {}\n\
         📝 Quiz explanation:\n{}\n\n\
         💾 Storage: {}\n\
         👥 Active groups: {}\n\
         📝 Active quizzes: {}\n\
         🎯 Manual quizzes sent: {}\n\
         ⚠️ Quiz reports: {}\n\n\
         /setdelay <time> changes the interval\n\
         /setexplanation <text> changes the explanation",
        format_interval(settings.quiz_interval),
        settings.quiz_explanation,
        if degraded { "in-memory (not persisted)" } else { "Postgres" },
        groups.iter().filter(|group| group.is_active).count(),
        quizzes.iter().filter(|quiz| quiz.is_active()).count(),
        stats.manual_quizzes_sent,
        stats.quiz_reports_received,
    )
}

pub(crate) fn reports_text(reports: &[Report]) -> String {
    if reports.is_empty() {
        return "📋 No quiz reports.".into();
    }

    let pending: Vec<&Report> = reports
        .iter()
        .filter(|report| report.status == ReportStatus::Pending)
        .collect();
    let mut text = format!(
        "📋 Quiz reports: {} total, {} pending\n",
        reports.len(),
        pending.len()
    );

    for report in pending.iter().take(10) {
        let _ = write!(
            text,
            "\n• {}\n  by {} in {} at {}\n  {}",
            crate::engine::preview(&report.snapshot.question),
            report.reporter,
            report.group_name.as_deref().unwrap_or("unknown group"),
            report.reported_at.format("%Y-%m-%d %H:%M"),
            report.message_link()
        );
    }
    if pending.len() > 10 {
        let _ = write!(text, "\n\n...and {} more pending", pending.len() - 10);
    }
    text.push_str("\n\n/clearreports removes resolved reports");
    text
}

pub(crate) fn groups_text(groups: &[Group]) -> String {
    if groups.is_empty() {
        return "👥 No groups yet. Add me to a group to start.".into();
    }

    let mut text = format!(
        "👥 Groups: {} total, {} active\n",
        groups.len(),
        groups.iter().filter(|group| group.is_active).count()
    );
    for group in groups {
        let _ = write!(
            text,
            "\n{} {} ({})\n  {} scheduled, {} manual, last activity {}",
            if group.is_active { "🟢" } else { "🔴" },
            group.title,
            group.chat_id,
            group.quizzes_received,
            group.manual_quizzes_received,
            group.last_activity.format("%Y-%m-%d %H:%M")
        );
    }
    text
}

/// Message the admin receives for every new report.
pub(crate) fn report_notice(report: &Report) -> String {
    let options = report
        .snapshot
        .options
        .iter()
        .map(|option| format!("• {option}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "⚠️ QUIZ REPORTED FOR REVIEW\n\n\
         📝 Question: {}\n\n\
         📋 Options:\n{options}\n\n\
         ✅ Correct answer: {}\n\n\
         👤 Reported by: {}\n\
         👥 Group: {}\n\
         🕐 Time: {}\n\
         🔗 {}",
        report.snapshot.question,
        report.snapshot.correct_answer().unwrap_or("?"),
        report.reporter,
        report.group_name.as_deref().unwrap_or("unknown group"),
        report.reported_at.format("%Y-%m-%d %H:%M:%S"),
        report.message_link()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::report::{QuizSnapshot, Reporter};

    fn report(question: &str) -> Report {
        Report::new(
            -1001234567,
            42,
            Some("Trivia".into()),
            QuizSnapshot {
                question: question.into(),
                options: vec!["3".into(), "4".into()],
                correct_option: 1,
            },
            Reporter {
                user_id: 7,
                username: Some("alice".into()),
                first_name: "Alice".into(),
            },
        )
    }

    #[test]
    fn stats_count_recently_active_groups_only() {
        let now = Utc::now();
        let mut stale = Group::new(-2, Some("Old".into()), 0);
        stale.last_activity = now - Duration::days(30);
        let groups = vec![Group::new(-1, Some("New".into()), 0), stale];

        let text = render_stats(&Stats::default(), &Settings::default(), &[], &groups, &[], now);
        assert!(text.contains("• Total: 2"));
        assert!(text.contains("• Active: 2"));
        assert!(text.contains("• Active this week: 1"));
        assert!(text.contains("• Last quiz sent: never"));
    }

    #[test]
    fn settings_flag_the_in_memory_store() {
        let text = render_settings(&Settings::default(), &Stats::default(), &[], &[], true);
        assert!(text.contains("in-memory"));
        assert!(text.contains("Check back later for results!"));
    }

    #[test]
    fn reports_list_only_pending_entries() {
        let mut resolved = report("Resolved one?");
        resolved.status = ReportStatus::Ignored;
        let text = reports_text(&[report("What is 2+2?"), resolved]);

        assert!(text.contains("2 total, 1 pending"));
        assert!(text.contains("What is 2+2?"));
        assert!(!text.contains("Resolved one?"));
    }

    #[test]
    fn notice_names_the_correct_answer_and_reporter() {
        let text = report_notice(&report("What is 2+2?"));
        assert!(text.contains("✅ Correct answer: 4"));
        assert!(text.contains("Alice"));
        assert!(text.contains("https://t.me/c/1234567/42"));
    }
}
