use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use sprout_models::{
    chrono_tz::Tz,
    reminder::{ReminderConfig, RepeatInterval, ScheduleHandle, TimeOfDay},
};
use sprout_scheduler::{
    ArmRequest,
    delivery::{
        DeliveryError, NotificationDelivery, NotificationPayload, ReminderDeliveryChannel,
        ReminderMessageType,
    },
};

pub type ReceivedMessages = Arc<Mutex<Vec<(NotificationPayload, ReminderMessageType)>>>;

#[derive(Clone, Default)]
pub struct TestDeliveryChannel {
    pub received_messages: ReceivedMessages,
}

impl TestDeliveryChannel {
    pub fn message_types(&self) -> Vec<ReminderMessageType> {
        self.received_messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| *message)
            .collect()
    }
}

#[async_trait]
impl ReminderDeliveryChannel for TestDeliveryChannel {
    async fn send_reminder_notification(
        &self,
        payload: &NotificationPayload,
        message: ReminderMessageType,
    ) -> Result<(), DeliveryError> {
        self.received_messages
            .lock()
            .unwrap()
            .push((payload.clone(), message));
        Ok(())
    }
}

/// Records schedule requests instead of running timers. Fires are driven by
/// the test through `ReminderScheduler::handle_fired`.
#[derive(Default)]
pub struct ManualDelivery {
    pub scheduled: Mutex<Vec<(ScheduleHandle, DateTime<Utc>, NotificationPayload)>>,
    pub cancelled: Mutex<Vec<ScheduleHandle>>,
    pub failing: AtomicBool,
}

impl ManualDelivery {
    pub fn fail_from_now_on(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn scheduled_instants(&self) -> Vec<DateTime<Utc>> {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at, _)| *at)
            .collect()
    }

    pub fn cancelled_handles(&self) -> Vec<ScheduleHandle> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDelivery for ManualDelivery {
    async fn schedule_one_shot(
        &self,
        at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> Result<ScheduleHandle, DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::PermissionDenied(payload.user_id));
        }

        let handle = ScheduleHandle::new();
        self.scheduled.lock().unwrap().push((handle, at, payload));
        Ok(handle)
    }

    async fn cancel(&self, handle: &ScheduleHandle) -> Result<(), DeliveryError> {
        self.cancelled.lock().unwrap().push(*handle);
        Ok(())
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
        .and_utc()
}

pub fn arm_request(plant_id: &str, time_of_day: TimeOfDay, days: u32) -> ArmRequest {
    arm_request_in(plant_id, time_of_day, days, Tz::UTC)
}

pub fn arm_request_in(plant_id: &str, time_of_day: TimeOfDay, days: u32, timezone: Tz) -> ArmRequest {
    ArmRequest {
        plant_id: plant_id.to_owned(),
        user_id: "user-1".to_owned(),
        plant_name: "Monstera".to_owned(),
        timezone,
        config: ReminderConfig {
            time_of_day,
            repeat_interval: RepeatInterval::new(days).unwrap(),
        },
    }
}
