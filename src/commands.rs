use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::Message,
    utils::command::BotCommands,
    Bot,
};

use crate::{config::AdminId, keyboard::admin_menu_keyboard, state::AdminState, HandlerResult, UserDialogue};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "display help.")]
    Help,
    #[command(description = "show the dashboard.")]
    Start,
    #[command(description = "abort the current input.")]
    Cancel,
    #[command(description = "send a quiz to this group now (group admins).")]
    Rquiz,
    #[command(description = "reply to a quiz to report it for review.")]
    Qreport,
    #[command(description = "bot statistics (admin).")]
    Stats,
    #[command(description = "bot settings (admin).")]
    Settings,
    #[command(description = "send a message to every group (admin).")]
    Broadcast(String),
    #[command(description = "set the quiz interval, e.g. 2h or 90m (admin).")]
    SetDelay(String),
    #[command(description = "set the quiz explanation text (admin).")]
    SetExplanation(String),
    #[command(description = "delete every quiz, use `/reset confirm` (admin).")]
    Reset(String),
    #[command(description = "list quiz reports (admin).")]
    Reports,
    #[command(description = "delete resolved reports (admin).")]
    ClearReports,
    #[command(description = "list groups (admin).")]
    Groups,
    #[command(description = "delete inactive groups (admin).")]
    CleanGroups,
    #[command(description = "mark every group active again (admin).")]
    ReactivateGroups,
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

pub(crate) async fn cancel(bot: Bot, dialogue: UserDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Cancelled.").await?;
    dialogue.update(AdminState::Idle).await?;
    Ok(())
}

pub(crate) async fn start(bot: Bot, msg: Message, admin: AdminId) -> HandlerResult {
    let from_admin = msg.from.as_ref().is_some_and(|user| admin.is(user.id.0));

    if msg.chat.is_private() && from_admin {
        bot.send_message(
            msg.chat.id,
            "👋 Admin dashboard\n\nSend me a QUIZ MODE poll to add it to the pool, or pick an option below.",
        )
        .reply_markup(admin_menu_keyboard())
        .await?;
    } else {
        bot.send_message(
            msg.chat.id,
            "👋 I send quiz polls to groups on a schedule.\n\n\
             Add me to a group to receive them.\n\
             /rquiz - send a quiz right now (group admins)\n\
             /qreport - reply to a quiz to report it",
        )
        .await?;
    }
    Ok(())
}
