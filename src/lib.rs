use state::AdminState;
use teloxide::{dispatching::dialogue::InMemStorage, prelude::Dialogue};

pub mod admin;
pub mod callbacks;
pub mod chat;
pub mod commands;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod interval;
pub mod keyboard;
pub mod platform;
pub mod schema;
pub mod state;

pub use error::{Error, Result};

/// The engine as the bot runs it.
pub type BotEngine = engine::Engine<database::Store, platform::TelegramPlatform>;

type UserDialogue = Dialogue<AdminState, InMemStorage<AdminState>>;
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
type HandlerResult = std::result::Result<(), HandlerError>;
