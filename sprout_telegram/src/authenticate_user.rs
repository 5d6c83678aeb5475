use std::sync::Arc;

use chrono::Utc;
use dptree::case;
use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};

use sprout_models::{
    chrono_tz,
    user::{Session, User},
};
use sprout_storage::NewUser;

use crate::{AppContext, GlobalCommand, HandlerResult, reminders};

const TIMEZONE_HINT: &str = "Send /start <Timezone> to register, e.g. /start Europe/Prague";

fn parse_timezone(args: &str) -> Option<chrono_tz::Tz> {
    let args = args.trim();
    if args.is_empty() {
        return None;
    }
    args.parse().ok()
}

async fn start(
    bot: Bot,
    msg: Message,
    args: String,
    context: Arc<AppContext>,
) -> HandlerResult {
    let Some(timezone) = parse_timezone(&args) else {
        bot.send_message(msg.chat.id, format!("Invalid timezone. {TIMEZONE_HINT}"))
            .await?;
        return Ok(());
    };

    match context.users.get_by_tg_chat(msg.chat.id.0).await? {
        Some(user) if user.timezone == timezone => {
            bot.send_message(msg.chat.id, "I've seen you before. Proceed.")
                .await?;
        }
        Some(user) => {
            let user = User { timezone, ..user };
            context.users.update(&user).await?;
            let restored = reminders::restore_user_reminders(
                context.scheduler.as_ref(),
                &context.reminder_configs,
                &user,
                Utc::now(),
            )
            .await?;

            log::info!("[AUTH] User {} moved to {timezone}", user.id);
            bot.send_message(
                msg.chat.id,
                format!("Timezone changed to {timezone}. {restored} reminder(s) rescheduled."),
            )
            .await?;
        }
        None => {
            context
                .users
                .create(NewUser {
                    timezone,
                    tg_chat_id: Some(msg.chat.id.0),
                })
                .await?;

            bot.send_message(
                msg.chat.id,
                "Timezone received. Welcome aboard. Add your first plant with /addplant or send me a photo of it.",
            )
            .await?;
        }
    }

    Ok(())
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GlobalCommand::descriptions().to_string())
        .await?;
    Ok(())
}

async fn ask_to_register(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, format!("Not seen before. {TIMEZONE_HINT}"))
        .await?;
    Ok(())
}

/// Looks up the user behind the update's chat. Updates without a registered
/// user do not get a session.
pub(super) async fn resolve_session(update: Update, context: Arc<AppContext>) -> Option<Session> {
    let chat = update.chat()?;

    match context.users.get_by_tg_chat(chat.id.0).await {
        Ok(user) => user.map(Session::new),
        Err(err) => {
            log::error!("[AUTH] Failed to look up user for chat {}: {err}", chat.id);
            None
        }
    }
}

pub(super) fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message().branch(
        teloxide::filter_command::<GlobalCommand, _>()
            .branch(case![GlobalCommand::Start(args)].endpoint(start))
            .branch(case![GlobalCommand::Help].endpoint(help)),
    )
}

pub(super) fn unauthenticated_schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message().endpoint(ask_to_register)
}

#[cfg(test)]
mod tests {
    use sprout_models::chrono_tz::Europe::Prague;

    use super::*;

    #[test]
    fn timezone_must_be_a_known_zone() {
        assert_eq!(parse_timezone(" Europe/Prague "), Some(Prague));
        assert_eq!(parse_timezone(""), None);
        assert_eq!(parse_timezone("Mars/Olympus"), None);
    }
}
