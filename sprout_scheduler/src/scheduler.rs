use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use sprout_models::{
    plant::PlantId,
    reminder::{ReminderConfig, ScheduleHandle, WateringReminder},
    user::UserId,
};

use crate::delivery::DeliveryError;

#[derive(Debug, Clone, PartialEq)]
pub struct ArmRequest {
    pub plant_id: PlantId,
    pub user_id: UserId,
    pub plant_name: String,
    pub timezone: sprout_models::chrono_tz::Tz,
    pub config: ReminderConfig,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("No armed reminder for plant {0}")]
    NotArmed(PlantId),

    #[error("Next trigger for plant {0} is out of the supported date range")]
    TriggerOutOfRange(PlantId),
}

#[async_trait]
pub trait ReminderScheduler: Send + Sync + 'static {
    /// Arms (or re-configures) the reminder of a plant. Any pending trigger of
    /// the same plant is superseded.
    async fn arm(
        &self,
        request: ArmRequest,
        now: DateTime<Utc>,
    ) -> Result<WateringReminder, SchedulerError>;

    /// Arms a reminder restored from storage. `anchor` is a trigger the chain
    /// had before, so the restored chain keeps its phase.
    async fn resume(
        &self,
        request: ArmRequest,
        anchor: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<WateringReminder, SchedulerError>;

    /// Re-arms the reminder whose schedule has fired. Returns `None` when the
    /// handle no longer belongs to an armed reminder.
    async fn handle_fired(
        &self,
        handle: ScheduleHandle,
        observed_at: DateTime<Utc>,
    ) -> Result<Option<WateringReminder>, SchedulerError>;

    async fn cancel(&self, plant_id: &PlantId) -> Result<(), SchedulerError>;

    async fn get(&self, plant_id: &PlantId) -> Option<WateringReminder>;
}
