use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatId, ChatMemberUpdated, Message},
    Bot,
};
use tracing::instrument;

use crate::{
    admin::report_notice,
    config::AdminId,
    database::report::{QuizSnapshot, Reporter},
    error::Error,
    keyboard::report_keyboard,
    platform::ChatPlatform,
    BotEngine, HandlerResult,
};

/// `/rquiz`: one quiz to this group right now. Only chat admins and the bot
/// admin may ask; success is the quiz itself, nothing else is posted.
#[instrument(level = "info", skip(bot, engine))]
pub(crate) async fn send_quiz_now(bot: Bot, msg: Message, engine: Arc<BotEngine>, admin: AdminId) -> HandlerResult {
    if !(msg.chat.is_group() || msg.chat.is_supergroup()) {
        bot.send_message(msg.chat.id, "❌ This command can only be used in groups!")
            .await?;
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let allowed = admin.is(user.id.0)
        || match engine.platform().is_chat_admin(msg.chat.id.0, user.id.0).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                log::warn!("Failed to check admin status of {} in {}: {e}", user.id, msg.chat.id);
                false
            }
        };
    if !allowed {
        bot.send_message(msg.chat.id, "❌ Only group admins can use this command!")
            .await?;
        return Ok(());
    }

    match engine.send_manual(msg.chat.id.0, msg.chat.title().map(str::to_owned)).await {
        Ok(_) => {
            log::info!("Manual quiz sent to {} by {}", msg.chat.id, user.first_name);
        }
        Err(Error::NoEligibleContent(_)) => {
            bot.send_message(msg.chat.id, "❌ No quizzes available yet.").await?;
        }
        Err(e) => {
            log::error!("Failed to send a manual quiz to {}: {e}", msg.chat.id);
            bot.send_message(msg.chat.id, "❌ Failed to send quiz. Please try again later.")
                .await?;
        }
    }
    Ok(())
}

/// `/qreport` in reply to a quiz: files a report and forwards it to the admin.
#[instrument(level = "info", skip(bot, engine))]
pub(crate) async fn report_quiz(bot: Bot, msg: Message, engine: Arc<BotEngine>, admin: AdminId) -> HandlerResult {
    if !(msg.chat.is_group() || msg.chat.is_supergroup()) {
        bot.send_message(msg.chat.id, "❌ This command can only be used in groups!")
            .await?;
        return Ok(());
    }

    let Some((replied, poll)) = msg
        .reply_to_message()
        .and_then(|replied| replied.poll().map(|poll| (replied, poll)))
    else {
        bot.send_message(
            msg.chat.id,
            "❌ Reply to a quiz message with /qreport to send it to the admin for review.",
        )
        .await?;
        return Ok(());
    };
    let Some(correct_option) = poll.correct_option_id else {
        bot.send_message(msg.chat.id, "❌ This is not a quiz! Only quiz polls can be reported.")
            .await?;
        return Ok(());
    };
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let snapshot = QuizSnapshot {
        question: poll.question.clone(),
        options: poll.options.iter().map(|option| option.text.clone()).collect(),
        correct_option,
    };
    let reporter = Reporter {
        user_id: user.id.0,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
    };

    let report = engine
        .report_quiz(
            msg.chat.id.0,
            replied.id.0,
            msg.chat.title().map(str::to_owned),
            snapshot,
            reporter,
        )
        .await?;

    bot.send_message(
        msg.chat.id,
        format!(
            "✅ Quiz reported!\n\n📝 {}\n\nThe admin will review it. Thanks for helping keep the quizzes accurate!",
            crate::engine::preview(&report.snapshot.question)
        ),
    )
    .await?;

    // the report is already stored, a failed notice must not fail the command
    if let Err(e) = bot
        .send_message(ChatId(admin.0 as i64), report_notice(&report))
        .reply_markup(report_keyboard(report.id))
        .await
    {
        log::error!("Failed to forward report {} to the admin: {e}", report.id);
    }
    Ok(())
}

/// The bot's own membership changed in some chat.
#[instrument(level = "info", skip(bot, engine, update), fields(chat = %update.chat.id))]
pub(crate) async fn membership_changed(
    bot: Bot,
    update: ChatMemberUpdated,
    engine: Arc<BotEngine>,
) -> HandlerResult {
    if !(update.chat.is_group() || update.chat.is_supergroup()) {
        return Ok(());
    }

    let was_present = update.old_chat_member.kind.is_present();
    let is_present = update.new_chat_member.kind.is_present();
    let title = update.chat.title().map(str::to_owned);

    if is_present && !was_present {
        let member_count = bot.get_chat_member_count(update.chat.id).await.unwrap_or_else(|e| {
            log::warn!("Failed to count members of {}: {e}", update.chat.id);
            0
        });
        let (group, existed) = engine.register_group(update.chat.id.0, title, member_count).await?;

        let greeting = if existed {
            format!("🎉 I'm back in {}! Quizzes will continue.\n\nUse /rquiz to get one right now.", group.title)
        } else {
            format!(
                "🎉 Thanks for adding me to {}!\n\nI'll send quiz polls regularly. Use /rquiz to get one right now.",
                group.title
            )
        };
        bot.send_message(update.chat.id, greeting).await?;
    } else if was_present && !is_present {
        engine.remove_group(update.chat.id.0).await?;
        log::info!("Removed from group {}", update.chat.id);
    }
    Ok(())
}
