use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use sprout_models::{
    plant::PlantId,
    reminder::{ScheduleHandle, WateringReminder},
    user::UserId,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ReminderMessageType {
    Due,
    RearmFailed,
}

/// What gets delivered to the user when a watering reminder is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub plant_id: PlantId,
    pub user_id: UserId,
    pub plant_name: String,
}

impl NotificationPayload {
    pub fn title(&self) -> &'static str {
        "💧 Water Reminder"
    }

    pub fn body(&self) -> String {
        format!("Time to water your {}", self.plant_name)
    }
}

impl From<&WateringReminder> for NotificationPayload {
    fn from(value: &WateringReminder) -> Self {
        Self {
            plant_id: value.plant_id.clone(),
            user_id: value.user_id.clone(),
            plant_name: value.plant_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEvent {
    Fired {
        handle: ScheduleHandle,
        fired_at: DateTime<Utc>,
    },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Notifications are not permitted for user {0}")]
    PermissionDenied(UserId),

    #[error("Cannot schedule a notification in the past ({0})")]
    InThePast(DateTime<Utc>),

    #[error("No pending schedule {0}")]
    UnknownSchedule(ScheduleHandle),

    #[error("Notification delivery is shut down")]
    Unavailable,

    #[error(transparent)]
    Channel(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Pushes a message to the user right now.
#[async_trait]
pub trait ReminderDeliveryChannel: Send + Sync + 'static {
    async fn send_reminder_notification(
        &self,
        payload: &NotificationPayload,
        message: ReminderMessageType,
    ) -> Result<(), DeliveryError>;
}

/// Schedules single-shot notifications. Every schedule that is not cancelled
/// reports a [`DeliveryEvent::Fired`] once it has been delivered.
#[async_trait]
pub trait NotificationDelivery: Send + Sync + 'static {
    async fn schedule_one_shot(
        &self,
        at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> Result<ScheduleHandle, DeliveryError>;

    async fn cancel(&self, handle: &ScheduleHandle) -> Result<(), DeliveryError>;
}
