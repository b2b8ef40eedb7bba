use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        UpdateFilterExt, UpdateHandler,
    },
    dptree,
    prelude::Requester,
    types::{CallbackQuery, Message, Update},
    Bot,
};
use tracing::instrument;

use crate::{
    admin, callbacks, chat,
    commands::{cancel, help, start, Command},
    config::AdminId,
    state::AdminState,
    HandlerError, HandlerResult,
};

/// The whole update tree. Needs `Arc<BotEngine>`, `AdminId` and
/// `InMemStorage<AdminState>` among the dispatcher dependencies.
pub fn schema() -> UpdateHandler<HandlerError> {
    use dptree::case;

    let admin_commands = dptree::filter(|msg: Message, admin: AdminId| sent_by(&msg, admin))
        .branch(case![Command::Stats].endpoint(admin::show_stats))
        .branch(case![Command::Settings].endpoint(admin::show_settings))
        .branch(case![Command::Broadcast(text)].endpoint(admin::broadcast))
        .branch(case![Command::SetDelay(token)].endpoint(admin::set_delay))
        .branch(case![Command::SetExplanation(text)].endpoint(admin::set_explanation))
        .branch(case![Command::Reset(confirmation)].endpoint(admin::reset))
        .branch(case![Command::Reports].endpoint(admin::show_reports))
        .branch(case![Command::ClearReports].endpoint(admin::clear_reports))
        .branch(case![Command::Groups].endpoint(admin::show_groups))
        .branch(case![Command::CleanGroups].endpoint(admin::clean_groups))
        .branch(case![Command::ReactivateGroups].endpoint(admin::reactivate_groups));

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel))
        .branch(case![Command::Rquiz].endpoint(chat::send_quiz_now))
        .branch(case![Command::Qreport].endpoint(chat::report_quiz))
        .branch(admin_commands)
        .endpoint(admin_only);

    let admin_chat = dptree::filter(|msg: Message, admin: AdminId| msg.chat.is_private() && sent_by(&msg, admin))
        .branch(case![AdminState::AwaitingBroadcast].endpoint(admin::receive_broadcast))
        .branch(case![AdminState::AwaitingInterval].endpoint(admin::receive_interval))
        .branch(case![AdminState::AwaitingExplanation].endpoint(admin::receive_explanation))
        .branch(case![AdminState::Idle].endpoint(admin::receive_quiz));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(admin_chat)
        .branch(dptree::filter(|msg: Message| msg.chat.is_private()).endpoint(stranger));

    let callback_handler = Update::filter_callback_query()
        .filter(|q: CallbackQuery, admin: AdminId| admin.is(q.from.id.0))
        .endpoint(callbacks::handle_callback);

    dptree::entry()
        .branch(Update::filter_my_chat_member().endpoint(chat::membership_changed))
        .branch(
            dialogue::enter::<Update, InMemStorage<AdminState>, AdminState, _>()
                .branch(message_handler)
                .branch(callback_handler),
        )
}

fn sent_by(msg: &Message, admin: AdminId) -> bool {
    msg.from.as_ref().is_some_and(|user| admin.is(user.id.0))
}

#[instrument(level = "info", skip(bot, msg), fields(chat = %msg.chat.id))]
async fn admin_only(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "This command is for the bot admin only.")
        .await?;
    Ok(())
}

async fn stranger(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "I only take quizzes from the admin. Add me to a group to receive quiz polls!",
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tree_builds() {
        let _ = schema();
    }
}
