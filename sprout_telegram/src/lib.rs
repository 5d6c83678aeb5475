mod authenticate_user;
mod care;
mod context;
mod delivery;
mod parsing;
mod plants;
mod reminders;
mod sensor;
mod util;

pub use teloxide;

pub use context::AppContext;
pub use delivery::{TelegramDeliveryChannel, TelegramDeliveryChannelError};
pub use reminders::restore_reminders;

use std::sync::Arc;

use dptree::case;
use plants::IdentifiedPlant;
use teloxide::{
    dispatching::{
        DpHandlerDescription,
        dialogue::{self, InMemStorage},
    },
    macros::BotCommands,
    prelude::*,
};

use crate::parsing::ArgsError;

type GlobalDialogue = Dialogue<GlobalState, InMemStorage<GlobalState>>;
type HandlerResult = anyhow::Result<()>;
type AppHandler = Handler<'static, DependencyMap, HandlerResult, DpHandlerDescription>;

#[derive(Default, Clone, Debug, PartialEq)]
enum GlobalState {
    #[default]
    Idle,
    SavingIdentifiedPlant(IdentifiedPlant),
}

pub struct TelegramInteractionInterface;

impl TelegramInteractionInterface {
    pub async fn start(bot: teloxide::Bot, context: Arc<AppContext>) {
        log::info!("Starting Telegram UI.");

        let schema = dialogue::enter::<Update, InMemStorage<GlobalState>, GlobalState, _>()
            .branch(authenticate_user::schema())
            .branch(
                dptree::filter_map_async(authenticate_user::resolve_session)
                    .branch(get_cancel_handler())
                    .branch(plants::schema())
                    .branch(reminders::schema())
                    .branch(care::schema())
                    .branch(sensor::schema())
                    .branch(Update::filter_message().endpoint(invalid_state)),
            )
            .branch(authenticate_user::unauthenticated_schema())
            .branch(Update::filter_callback_query().endpoint(invalid_query));

        Dispatcher::builder(bot, schema)
            .dependencies(dptree::deps![InMemStorage::<GlobalState>::new(), context])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await
    }
}

fn get_cancel_handler() -> AppHandler {
    Update::filter_message().branch(
        teloxide::filter_command::<GlobalCommand, _>()
            .branch(case![GlobalCommand::Cancel].endpoint(cancel)),
    )
}

async fn cancel(bot: Bot, dialogue: GlobalDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Cancelled current operation.")
        .await?;
    dialogue.exit().await?;
    Ok(())
}

async fn invalid_state(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Unable to handle the message. Please try again or use /help to see what I can do.",
    )
    .await?;
    Ok(())
}

async fn invalid_query(bot: Bot, query: CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(query.id.clone()).await?;

    if let Some(message) = util::try_get_message_from_query(&query) {
        bot.send_message(
            message.chat.id,
            "Unable to handle the button press. The message may be outdated.",
        )
        .await?;
    }

    Ok(())
}

async fn reply_args_error(bot: &Bot, chat_id: ChatId, error: ArgsError) -> HandlerResult {
    bot.send_message(chat_id, error.to_string()).await?;
    Ok(())
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum GlobalCommand {
    #[command(description = "register or change your timezone, e.g. /start Europe/Prague")]
    Start(String),
    #[command(description = "show this help")]
    Help,
    #[command(description = "list your plants")]
    Plants,
    #[command(description = "add a plant: Name | Type | Location [| Notes]")]
    AddPlant(String),
    #[command(description = "delete a plant by its number")]
    DeletePlant(String),
    #[command(description = "water reminder: <plant> <HH:MM> [every N days]")]
    Remind(String),
    #[command(description = "stop the water reminder of a plant")]
    StopReminder(String),
    #[command(description = "log care: <plant> <watered|fertilized|pruned> [note]")]
    Log(String),
    #[command(description = "show the care log of a plant")]
    Logs(String),
    #[command(description = "weather-aware care tips for a plant")]
    Tips(String),
    #[command(description = "plant stores near your location")]
    Stores,
    #[command(description = "start temperature and light monitoring")]
    Monitor,
    #[command(description = "stop monitoring")]
    StopMonitor,
    #[command(description = "cancel the current operation")]
    Cancel,
}
