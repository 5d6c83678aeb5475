use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use sprout_models::{
    plant::PlantId,
    reminder::{ReminderState, ScheduleHandle, WateringReminder},
};
use sprout_scheduler::{
    ArmRequest, ReminderScheduler, SchedulerError, compute_catch_up_trigger,
    compute_initial_trigger, compute_resumed_trigger,
    delivery::{
        DeliveryError, DeliveryEvent, NotificationDelivery, NotificationPayload,
        ReminderDeliveryChannel, ReminderMessageType,
    },
};

/// Keeps one chain of one-shot schedules per plant. Every fired schedule arms
/// the next one from the current configuration.
pub struct WateringReminderScheduler {
    reminders: Mutex<HashMap<PlantId, WateringReminder>>,
    delivery: Arc<dyn NotificationDelivery>,
    channel: Arc<dyn ReminderDeliveryChannel>,
}

impl WateringReminderScheduler {
    pub fn new(
        delivery: Arc<dyn NotificationDelivery>,
        channel: Arc<dyn ReminderDeliveryChannel>,
    ) -> Self {
        Self {
            reminders: Mutex::new(HashMap::new()),
            delivery,
            channel,
        }
    }

    async fn cancel_superseded(&self, handle: &ScheduleHandle) {
        match self.delivery.cancel(handle).await {
            Ok(()) | Err(DeliveryError::UnknownSchedule(_)) => {}
            Err(err) => log::warn!("[ARM] Failed to cancel superseded schedule {handle}: {err}"),
        }
    }

    async fn arm_at(
        &self,
        request: ArmRequest,
        next_trigger: impl FnOnce(&ArmRequest) -> Option<DateTime<Utc>>,
    ) -> Result<WateringReminder, SchedulerError> {
        let mut reminders = self.reminders.lock().await;

        let next_trigger = next_trigger(&request)
            .ok_or_else(|| SchedulerError::TriggerOutOfRange(request.plant_id.clone()))?;

        let ArmRequest {
            plant_id,
            user_id,
            plant_name,
            timezone,
            config,
        } = request;

        let mut reminder = WateringReminder {
            plant_id,
            user_id,
            plant_name,
            timezone,
            config,
            state: ReminderState::Unarmed,
        };

        let handle = self
            .delivery
            .schedule_one_shot(next_trigger, NotificationPayload::from(&reminder))
            .await?;

        if let Some(previous) = reminders
            .get(&reminder.plant_id)
            .and_then(WateringReminder::handle)
        {
            self.cancel_superseded(&previous).await;
        }

        reminder.state = ReminderState::Armed {
            next_trigger,
            handle,
        };

        log::info!(
            "[ARM] Plant {} armed for {} every {} day(s). Next trigger {}",
            reminder.plant_id,
            reminder.config.time_of_day,
            reminder.config.repeat_interval.days(),
            next_trigger
        );

        reminders.insert(reminder.plant_id.clone(), reminder.clone());
        Ok(reminder)
    }

    async fn notify_rearm_failed(&self, payload: &NotificationPayload) {
        if let Err(err) = self
            .channel
            .send_reminder_notification(payload, ReminderMessageType::RearmFailed)
            .await
        {
            log::error!(
                "[REARM] Failed to tell user {} about it: {err}",
                payload.user_id
            );
        }
    }
}

#[async_trait]
impl ReminderScheduler for WateringReminderScheduler {
    async fn arm(
        &self,
        request: ArmRequest,
        now: DateTime<Utc>,
    ) -> Result<WateringReminder, SchedulerError> {
        self.arm_at(request, |request| {
            let now = now.with_timezone(&request.timezone);
            compute_initial_trigger(&request.config.time_of_day, &now)
                .map(|trigger| trigger.with_timezone(&Utc))
        })
        .await
    }

    async fn resume(
        &self,
        request: ArmRequest,
        anchor: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<WateringReminder, SchedulerError> {
        self.arm_at(request, |request| {
            let config = request.config;
            compute_resumed_trigger(
                &config.time_of_day,
                config.repeat_interval,
                &anchor.with_timezone(&request.timezone),
                &now.with_timezone(&request.timezone),
            )
            .map(|trigger| trigger.with_timezone(&Utc))
        })
        .await
    }

    async fn handle_fired(
        &self,
        handle: ScheduleHandle,
        observed_at: DateTime<Utc>,
    ) -> Result<Option<WateringReminder>, SchedulerError> {
        let mut reminders = self.reminders.lock().await;

        let Some(reminder) = reminders
            .values_mut()
            .find(|reminder| reminder.handle() == Some(handle))
        else {
            log::warn!("[REARM] Ignoring schedule {handle} which is no longer armed");
            return Ok(None);
        };

        let Some(scheduled_at) = reminder.next_trigger() else {
            return Ok(None);
        };

        let timezone = reminder.timezone;
        let config = reminder.config;

        // The chain is anchored on the instant that was scheduled, not on when
        // the fire was observed. A late fire skips the occurrences it missed.
        let payload = NotificationPayload::from(&*reminder);
        let Some(next_trigger) = compute_catch_up_trigger(
            &config.time_of_day,
            config.repeat_interval,
            &scheduled_at.with_timezone(&timezone),
            &observed_at.with_timezone(&timezone),
        ) else {
            reminder.state = ReminderState::Unarmed;
            log::error!(
                "[REARM] Next trigger for plant {} is out of range",
                reminder.plant_id
            );

            let plant_id = reminder.plant_id.clone();
            drop(reminders);
            self.notify_rearm_failed(&payload).await;
            return Err(SchedulerError::TriggerOutOfRange(plant_id));
        };
        let next_trigger = next_trigger.with_timezone(&Utc);

        match self
            .delivery
            .schedule_one_shot(next_trigger, payload.clone())
            .await
        {
            Ok(new_handle) => {
                reminder.state = ReminderState::Armed {
                    next_trigger,
                    handle: new_handle,
                };

                log::info!(
                    "[REARM] Plant {} re-armed. Next trigger {}",
                    reminder.plant_id,
                    next_trigger
                );

                Ok(Some(reminder.clone()))
            }
            Err(err) => {
                reminder.state = ReminderState::Unarmed;

                log::error!(
                    "[REARM] Failed to re-arm reminder for plant {}: {err}",
                    reminder.plant_id
                );

                drop(reminders);
                self.notify_rearm_failed(&payload).await;
                Err(err.into())
            }
        }
    }

    async fn cancel(&self, plant_id: &PlantId) -> Result<(), SchedulerError> {
        let mut reminders = self.reminders.lock().await;

        let handle = reminders
            .get(plant_id)
            .and_then(WateringReminder::handle)
            .ok_or_else(|| SchedulerError::NotArmed(plant_id.clone()))?;

        match self.delivery.cancel(&handle).await {
            Ok(()) | Err(DeliveryError::UnknownSchedule(_)) => {
                reminders.remove(plant_id);
                log::info!("[CANCEL] Reminder for plant {plant_id} cancelled");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, plant_id: &PlantId) -> Option<WateringReminder> {
        self.reminders.lock().await.get(plant_id).cloned()
    }
}

/// Feeds fired schedules into the scheduler one at a time until `shutdown`
/// is cancelled or the delivery side goes away.
pub async fn run_fired_events(
    scheduler: Arc<dyn ReminderScheduler>,
    mut events: mpsc::Receiver<DeliveryEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                log::info!("Fired events loop shutting down");
                break;
            }
            event = events.recv() => match event {
                Some(DeliveryEvent::Fired { handle, fired_at }) => {
                    if let Err(err) = scheduler.handle_fired(handle, fired_at).await {
                        log::error!("Failed to handle fired schedule {handle}: {err}");
                    }
                }
                None => {
                    log::info!("Delivery events channel closed");
                    break;
                }
            }
        }
    }
}
