use std::sync::Arc;

use quizcast::{
    config::Config,
    database::Store,
    engine::{scheduler::Scheduler, Engine},
    platform::TelegramPlatform,
    schema::schema,
    state::AdminState,
};
use teloxide::{
    dispatching::dialogue::InMemStorage,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    update_listeners::webhooks::{self, Options},
};
use tokio::sync::watch;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.log_level);

    let store = Store::open(config.database_url.as_deref(), config.engine.call_timeout).await;
    let bot = Bot::new(&config.token);
    let platform = TelegramPlatform::new(bot.clone(), config.engine.call_timeout);
    let engine = Arc::new(Engine::new(store, platform, config.engine).await);
    log::info!("Starting bot...");

    let (stop, shutdown) = watch::channel(false);
    let scheduler = tokio::spawn(Scheduler::new(engine.clone()).run(shutdown));

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![InMemStorage::<AdminState>::new(), engine, config.admin])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some((url, addr)) => match webhooks::axum(bot, Options::new(addr, url)).await {
            Ok(listener) => {
                dispatcher
                    .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("Update listener error"))
                    .await
            }
            Err(e) => log::error!("Failed to build a webhook listener: {e}"),
        },
        None => dispatcher.dispatch().await,
    }

    log::info!("Shutting down, waiting for the scheduler to finish");
    let _ = stop.send(true);
    if let Err(e) = scheduler.await {
        log::error!("Scheduler task failed: {e}");
    }
}

fn init_tracing(level: &str) {
    if let Err(e) = LogTracer::init() {
        eprintln!("Failed to route log records to tracing: {e}");
    }

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install the tracing subscriber: {e}");
    }
}
