use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
};
use thiserror::Error;

use sprout_models::user::UserId;
use sprout_scheduler::delivery::{
    DeliveryError, NotificationPayload, ReminderDeliveryChannel, ReminderMessageType,
};
use sprout_storage::{StorageError, UserStorage};

use crate::parsing::CallbackAction;

#[derive(Debug, Error)]
pub enum TelegramDeliveryChannelError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error("UserId in reminder is invalid {0}")]
    InvalidUser(UserId),

    #[error("User does not have Telegram chat id configured {0}")]
    NoTelegramConfigured(UserId),
}

/// Sends due reminders to the user's chat.
pub struct TelegramDeliveryChannel {
    users: Arc<UserStorage>,
    bot: Bot,
}

impl TelegramDeliveryChannel {
    pub fn new(users: Arc<UserStorage>, bot: Bot) -> Self {
        Self { users, bot }
    }

    async fn send(
        &self,
        payload: &NotificationPayload,
        message: ReminderMessageType,
    ) -> Result<(), TelegramDeliveryChannelError> {
        let user = self
            .users
            .get(&payload.user_id)
            .await?
            .ok_or_else(|| TelegramDeliveryChannelError::InvalidUser(payload.user_id.clone()))?;

        let chat_id = user.tg_chat_id.ok_or_else(|| {
            TelegramDeliveryChannelError::NoTelegramConfigured(payload.user_id.clone())
        })?;

        self.bot
            .send_message(ChatId(chat_id), get_message_text(payload, message))
            .reply_markup(get_keyboard_markup(payload, message))
            .await?;

        log::info!(
            "[DELIVERY] {message:?} for plant {} sent to chat {chat_id}",
            payload.plant_id
        );
        Ok(())
    }
}

#[async_trait]
impl ReminderDeliveryChannel for TelegramDeliveryChannel {
    async fn send_reminder_notification(
        &self,
        payload: &NotificationPayload,
        message: ReminderMessageType,
    ) -> Result<(), DeliveryError> {
        self.send(payload, message)
            .await
            .map_err(|err| DeliveryError::Channel(Box::new(err)))
    }
}

fn get_keyboard_markup(
    payload: &NotificationPayload,
    message: ReminderMessageType,
) -> InlineKeyboardMarkup {
    match message {
        ReminderMessageType::Due => {
            let watered = CallbackAction::Watered(payload.plant_id.clone());
            let watered_button = InlineKeyboardButton::callback("💧 Watered", watered.to_string());
            InlineKeyboardMarkup::new(vec![vec![watered_button]])
        }
        ReminderMessageType::RearmFailed => InlineKeyboardMarkup::default(),
    }
}

fn get_message_text(payload: &NotificationPayload, message: ReminderMessageType) -> String {
    match message {
        ReminderMessageType::Due => format!("{}\n{}", payload.title(), payload.body()),
        ReminderMessageType::RearmFailed => format!(
            "⚠️ Could not schedule the next watering reminder for {}. Use /remind to set it again.",
            payload.plant_name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NotificationPayload {
        NotificationPayload {
            plant_id: "p-1".to_owned(),
            user_id: "u-1".to_owned(),
            plant_name: "Pilea".to_owned(),
        }
    }

    #[test]
    fn due_reminder_offers_watered_button() {
        let text = get_message_text(&payload(), ReminderMessageType::Due);
        let markup = get_keyboard_markup(&payload(), ReminderMessageType::Due);

        assert_eq!(text, "💧 Water Reminder\nTime to water your Pilea");
        assert_eq!(markup.inline_keyboard.len(), 1);
        assert_eq!(markup.inline_keyboard[0][0].text, "💧 Watered");
    }

    #[test]
    fn failed_rearm_has_no_buttons() {
        let markup = get_keyboard_markup(&payload(), ReminderMessageType::RearmFailed);

        assert!(markup.inline_keyboard.is_empty());
        assert!(get_message_text(&payload(), ReminderMessageType::RearmFailed).contains("Pilea"));
    }
}
