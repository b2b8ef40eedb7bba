use std::{fmt::Write, sync::Arc};

use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::{EditMessageTextSetters, SendMessageSetters},
    prelude::Requester,
    types::CallbackQuery,
    Bot,
};
use tracing::instrument;

use crate::{
    admin::{groups_text, reports_text, settings_text, stats_text},
    error::Error,
    interval::format_interval,
    keyboard::{groups_keyboard, settings_keyboard, similar_keyboard, CallbackAction, MenuItem},
    state::AdminState,
    BotEngine, HandlerResult, UserDialogue,
};

/// Inline buttons pressed by the admin: report moderation, group removal
/// and the dashboard menu.
#[instrument(level = "info", skip(bot, dialogue, engine, q), fields(data = ?q.data))]
pub(crate) async fn handle_callback(
    bot: Bot,
    dialogue: UserDialogue,
    engine: Arc<BotEngine>,
    q: CallbackQuery,
) -> HandlerResult {
    bot.answer_callback_query(&q.id).await?;

    let (Some(data), Some(chat_id)) = (q.data.as_deref(), q.chat_id()) else {
        return Ok(());
    };
    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            log::warn!("Ignoring callback: {e}");
            return Ok(());
        }
    };
    let message_id = q.message.as_ref().map(|message| message.id());

    // edits the pressed message when there is one, posts otherwise
    macro_rules! respond {
        ($text:expr) => {
            match message_id {
                Some(id) => {
                    bot.edit_message_text(chat_id, id, $text).await?;
                }
                None => {
                    bot.send_message(chat_id, $text).await?;
                }
            }
        };
        ($text:expr, $markup:expr) => {
            match message_id {
                Some(id) => {
                    bot.edit_message_text(chat_id, id, $text).reply_markup($markup).await?;
                }
                None => {
                    bot.send_message(chat_id, $text).reply_markup($markup).await?;
                }
            }
        };
    }

    match action {
        CallbackAction::DeleteQuiz(report_id) => match engine.resolve_delete(report_id).await {
            Ok(outcome) => {
                let mut text = format!("✅ Report resolved: deleted {} quiz(zes).", outcome.deleted);
                if outcome.similar.is_empty() {
                    respond!(text);
                } else {
                    let _ = write!(
                        text,
                        "\n\n{} similar quiz(zes) remain. Review or delete them below.",
                        outcome.similar.len()
                    );
                    respond!(text, similar_keyboard(report_id));
                }
            }
            Err(Error::ReportNotFound(_)) => respond!("❌ Report not found or already processed."),
            Err(e) => return Err(e.into()),
        },
        CallbackAction::DeleteSimilar(report_id) => match engine.resolve_delete_similar(report_id).await {
            Ok(outcome) => respond!(format!(
                "✅ Deleted {} similar quiz(zes), {} in total for this report.",
                outcome.deleted, outcome.total_deleted
            )),
            Err(Error::ReportNotFound(_)) => respond!("❌ Report not found or it was ignored."),
            Err(e) => return Err(e.into()),
        },
        CallbackAction::IgnoreReport(report_id) => match engine.resolve_ignore(report_id).await {
            Ok(_) => respond!("👁️ Report ignored. The quiz stays in the pool."),
            Err(Error::ReportNotFound(_)) => respond!("❌ Report not found or already processed."),
            Err(e) => return Err(e.into()),
        },
        CallbackAction::ViewSimilar(report_id) => match engine.list_similar(report_id).await {
            Ok(similar) if similar.is_empty() => {
                bot.send_message(chat_id, "📝 No similar quizzes found.").await?;
            }
            Ok(similar) => {
                let mut text = format!("📝 {} similar quiz(zes):\n", similar.len());
                for quiz in similar.iter().take(10) {
                    let _ = write!(
                        text,
                        "\n• {}\n  answer: {}, sent {} times",
                        crate::engine::preview(quiz.question()),
                        quiz.correct_answer(),
                        quiz.sent_count()
                    );
                }
                if similar.len() > 10 {
                    let _ = write!(text, "\n\n...and {} more", similar.len() - 10);
                }
                bot.send_message(chat_id, text).await?;
            }
            Err(Error::ReportNotFound(_)) => {
                bot.send_message(chat_id, "❌ Report not found.").await?;
            }
            Err(e) => return Err(e.into()),
        },
        CallbackAction::RemoveGroup(group_id) => {
            let removed = engine.remove_group(group_id).await?;
            let groups = engine.groups().await?;
            let text = if removed {
                format!("🚫 Group {group_id} marked inactive.\n\n{}", groups_text(&groups))
            } else {
                format!("❌ Group {group_id} is unknown.\n\n{}", groups_text(&groups))
            };
            respond!(text, groups_keyboard(&groups));
        }
        CallbackAction::Menu(MenuItem::Stats) => respond!(stats_text(&engine).await?),
        CallbackAction::Menu(MenuItem::Settings) => respond!(settings_text(&engine).await?, settings_keyboard()),
        CallbackAction::Menu(MenuItem::Reports) => respond!(reports_text(&engine.list_reports().await?)),
        CallbackAction::Menu(MenuItem::Groups) => {
            let groups = engine.groups().await?;
            respond!(groups_text(&groups), groups_keyboard(&groups));
        }
        CallbackAction::Menu(MenuItem::Broadcast) => {
            dialogue.update(AdminState::AwaitingBroadcast).await?;
            bot.send_message(chat_id, "📢 Send the message to broadcast to all groups, or /cancel.")
                .await?;
        }
        CallbackAction::Menu(MenuItem::Interval) => {
            dialogue.update(AdminState::AwaitingInterval).await?;
            bot.send_message(
                chat_id,
                format!(
                    "🕐 Current interval: {}\n\nSend a new one, e.g. 2h, 90m, 1.5h or a bare number of hours.",
                    format_interval(engine.interval().await)
                ),
            )
            .await?;
        }
        CallbackAction::Menu(MenuItem::Explanation) => {
            dialogue.update(AdminState::AwaitingExplanation).await?;
            bot.send_message(
                chat_id,
                format!(
                    "📝 Current explanation:\n{}\n\nSend the new text, or /cancel.",
                    engine.settings().await.quiz_explanation
                ),
            )
            .await?;
        }
    }

    Ok(())
}
