use chrono::{DateTime, Utc};
use teloxide::{
    Bot,
    payloads::{AnswerCallbackQuerySetters, EditMessageReplyMarkupSetters},
    prelude::Requester,
    sugar::bot::BotMessagesExt,
    types::{CallbackQuery, InlineKeyboardMarkup, MaybeInaccessibleMessage, Message},
};

use sprout_models::chrono_tz::Tz;

pub fn try_get_message_from_query(query: &CallbackQuery) -> Option<&Message> {
    query.message.as_ref().and_then(|msg| match msg {
        MaybeInaccessibleMessage::Inaccessible(_) => None,
        MaybeInaccessibleMessage::Regular(message) => Some(message.as_ref()),
    })
}

pub async fn clear_message_buttons(bot: &Bot, message: &Message) -> Result<(), anyhow::Error> {
    bot.edit_reply_markup(message)
        .reply_markup(InlineKeyboardMarkup::default())
        .await?;

    Ok(())
}

/// Answers the query so the client stops its loading indicator, with an
/// optional toast.
pub async fn answer_query(
    bot: &Bot,
    query: &CallbackQuery,
    text: Option<&str>,
) -> anyhow::Result<()> {
    let answer = bot.answer_callback_query(query.id.clone());
    match text {
        Some(text) => answer.text(text).await?,
        None => answer.await?,
    };
    Ok(())
}

pub fn format_local(datetime: DateTime<Utc>, timezone: Tz) -> String {
    datetime
        .with_timezone(&timezone)
        .format("%a %d %b %H:%M")
        .to_string()
}

#[cfg(test)]
mod tests {
    use sprout_models::chrono_tz::Europe::Prague;

    use super::*;

    #[test]
    fn local_format_uses_the_users_zone() {
        let datetime = DateTime::parse_from_rfc3339("2025-06-02T06:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(format_local(datetime, Prague), "Mon 02 Jun 08:00");
    }
}
