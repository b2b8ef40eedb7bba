use std::{fmt, str::FromStr};

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use uuid::Uuid;

use crate::database::group::Group;

/// Admin dashboard entries reachable from the `/start` menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Stats,
    Settings,
    Reports,
    Groups,
    Broadcast,
    Interval,
    Explanation,
}

impl MenuItem {
    fn as_str(&self) -> &'static str {
        match self {
            MenuItem::Stats => "stats",
            MenuItem::Settings => "settings",
            MenuItem::Reports => "reports",
            MenuItem::Groups => "groups",
            MenuItem::Broadcast => "broadcast",
            MenuItem::Interval => "interval",
            MenuItem::Explanation => "explanation",
        }
    }
}

/// Everything an inline button can ask for. Encoded as `<action>:<argument>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    DeleteQuiz(Uuid),
    DeleteSimilar(Uuid),
    IgnoreReport(Uuid),
    ViewSimilar(Uuid),
    RemoveGroup(i64),
    Menu(MenuItem),
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::DeleteQuiz(id) => write!(f, "delete:{id}"),
            CallbackAction::DeleteSimilar(id) => write!(f, "delsimilar:{id}"),
            CallbackAction::IgnoreReport(id) => write!(f, "ignore:{id}"),
            CallbackAction::ViewSimilar(id) => write!(f, "similar:{id}"),
            CallbackAction::RemoveGroup(chat_id) => write!(f, "remove:{chat_id}"),
            CallbackAction::Menu(item) => write!(f, "menu:{}", item.as_str()),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = String;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let (action, argument) = data
            .split_once(':')
            .ok_or_else(|| format!("malformed callback data '{data}'"))?;
        let report_id = || Uuid::parse_str(argument).map_err(|e| format!("bad report id '{argument}': {e}"));

        match action {
            "delete" => Ok(CallbackAction::DeleteQuiz(report_id()?)),
            "delsimilar" => Ok(CallbackAction::DeleteSimilar(report_id()?)),
            "ignore" => Ok(CallbackAction::IgnoreReport(report_id()?)),
            "similar" => Ok(CallbackAction::ViewSimilar(report_id()?)),
            "remove" => argument
                .parse()
                .map(CallbackAction::RemoveGroup)
                .map_err(|e| format!("bad chat id '{argument}': {e}")),
            "menu" => {
                let item = match argument {
                    "stats" => MenuItem::Stats,
                    "settings" => MenuItem::Settings,
                    "reports" => MenuItem::Reports,
                    "groups" => MenuItem::Groups,
                    "broadcast" => MenuItem::Broadcast,
                    "interval" => MenuItem::Interval,
                    "explanation" => MenuItem::Explanation,
                    other => return Err(format!("unknown menu item '{other}'")),
                };
                Ok(CallbackAction::Menu(item))
            }
            other => Err(format!("unknown callback action '{other}'")),
        }
    }
}

fn button(text: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.to_string())
}

pub(crate) fn admin_menu_keyboard() -> InlineKeyboardMarkup {
    let keyboard = vec![
        vec![
            button("📊 Statistics", CallbackAction::Menu(MenuItem::Stats)),
            button("⚙️ Settings", CallbackAction::Menu(MenuItem::Settings)),
        ],
        vec![
            button("📢 Broadcast", CallbackAction::Menu(MenuItem::Broadcast)),
            button("👥 Groups", CallbackAction::Menu(MenuItem::Groups)),
        ],
        vec![button("⚠️ Reports", CallbackAction::Menu(MenuItem::Reports))],
    ];

    InlineKeyboardMarkup::new(keyboard)
}

pub(crate) fn settings_keyboard() -> InlineKeyboardMarkup {
    let keyboard = vec![
        vec![button("🕐 Set interval", CallbackAction::Menu(MenuItem::Interval))],
        vec![button("📝 Set explanation", CallbackAction::Menu(MenuItem::Explanation))],
    ];

    InlineKeyboardMarkup::new(keyboard)
}

pub(crate) fn report_keyboard(report_id: Uuid) -> InlineKeyboardMarkup {
    let keyboard = vec![
        vec![
            button("🗑️ Delete quiz", CallbackAction::DeleteQuiz(report_id)),
            button("👁️ Ignore", CallbackAction::IgnoreReport(report_id)),
        ],
        vec![
            button("📝 View similar", CallbackAction::ViewSimilar(report_id)),
            button("🗑️ Delete similar", CallbackAction::DeleteSimilar(report_id)),
        ],
    ];

    InlineKeyboardMarkup::new(keyboard)
}

/// Shown once the exact matches are gone.
pub(crate) fn similar_keyboard(report_id: Uuid) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("📝 View similar", CallbackAction::ViewSimilar(report_id)),
        button("🗑️ Delete similar", CallbackAction::DeleteSimilar(report_id)),
    ]])
}

pub(crate) fn groups_keyboard(groups: &[Group]) -> InlineKeyboardMarkup {
    let keyboard = groups
        .iter()
        .filter(|group| group.is_active)
        .map(|group| {
            vec![button(
                &format!("🚫 Remove {}", group.title),
                CallbackAction::RemoveGroup(group.chat_id),
            )]
        });

    InlineKeyboardMarkup::new(keyboard)
}
