use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{
    sync::{RwLock, mpsc},
    task::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;

use sprout_models::reminder::ScheduleHandle;
use sprout_scheduler::delivery::{
    DeliveryError, DeliveryEvent, NotificationDelivery, NotificationPayload,
    ReminderDeliveryChannel, ReminderMessageType,
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

struct ScheduledTask {
    task: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

type ScheduledTaskStore = RwLock<HashMap<ScheduleHandle, ScheduledTask>>;

/// One-shot notifications backed by tokio timers. Each schedule is a task that
/// sleeps until its instant, pushes the notification through the delivery
/// channel and then reports [`DeliveryEvent::Fired`].
pub struct TimerNotificationDelivery {
    tasks: Arc<ScheduledTaskStore>,
    channel: Arc<dyn ReminderDeliveryChannel>,
    events: mpsc::Sender<DeliveryEvent>,
    shutdown: CancellationToken,
}

impl TimerNotificationDelivery {
    pub fn new(
        channel: Arc<dyn ReminderDeliveryChannel>,
        events: mpsc::Sender<DeliveryEvent>,
    ) -> Self {
        let tasks = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = CancellationToken::new();
        Self::spawn_cleanup_task(Arc::clone(&tasks), shutdown.child_token());

        Self {
            tasks,
            channel,
            events,
            shutdown,
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.tasks
            .read()
            .await
            .values()
            .filter(|scheduled| !scheduled.task.is_finished())
            .count()
    }

    fn spawn_cleanup_task(tasks: Arc<ScheduledTaskStore>, shutdown: CancellationToken) {
        task::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(CLEANUP_INTERVAL) => {
                        Self::clean_finished_tasks(&tasks).await;
                    }
                    _ = shutdown.cancelled() => {
                        log::info!("Cleanup task shutting down");
                        break;
                    }
                };
            }
        });
    }

    async fn clean_finished_tasks(tasks: &ScheduledTaskStore) {
        let mut tasks = tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, scheduled| !scheduled.task.is_finished());
        let after = tasks.len();

        if before != after {
            log::info!("Cleaned up {} finished notification timers", before - after);
        }
    }
}

impl Drop for TimerNotificationDelivery {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl NotificationDelivery for TimerNotificationDelivery {
    async fn schedule_one_shot(
        &self,
        at: DateTime<Utc>,
        payload: NotificationPayload,
    ) -> Result<ScheduleHandle, DeliveryError> {
        if self.shutdown.is_cancelled() {
            return Err(DeliveryError::Unavailable);
        }

        let delay = (at - Utc::now())
            .to_std()
            .map_err(|_| DeliveryError::InThePast(at))?;

        let handle = ScheduleHandle::new();
        let cancellation_token = self.shutdown.child_token();

        log::info!(
            "[SCHEDULE] Sleeping for {:?} delay. Schedule {}, plant {}",
            delay,
            handle,
            payload.plant_id
        );

        let task = task::spawn(fire_after_delay(
            handle,
            payload,
            delay,
            cancellation_token.clone(),
            Arc::clone(&self.channel),
            self.events.clone(),
        ));

        self.tasks.write().await.insert(
            handle,
            ScheduledTask {
                task,
                cancellation_token,
            },
        );

        Ok(handle)
    }

    async fn cancel(&self, handle: &ScheduleHandle) -> Result<(), DeliveryError> {
        match self.tasks.write().await.remove(handle) {
            Some(scheduled) => {
                scheduled.cancellation_token.cancel();
                Ok(())
            }
            None => Err(DeliveryError::UnknownSchedule(*handle)),
        }
    }
}

async fn fire_after_delay(
    handle: ScheduleHandle,
    payload: NotificationPayload,
    delay: Duration,
    cancellation_token: CancellationToken,
    channel: Arc<dyn ReminderDeliveryChannel>,
    events: mpsc::Sender<DeliveryEvent>,
) {
    tokio::select! {
        _ = cancellation_token.cancelled() => {
            log::info!("[CANCELLED] Schedule {} for plant {}", handle, payload.plant_id);
        }
        _ = tokio::time::sleep(delay) => {
            if let Err(err) = channel
                .send_reminder_notification(&payload, ReminderMessageType::Due)
                .await
            {
                log::error!(
                    "[FIRE] Failed to deliver reminder for plant {}: {err}",
                    payload.plant_id
                );
            }

            let fired = DeliveryEvent::Fired {
                handle,
                fired_at: Utc::now(),
            };

            if events.send(fired).await.is_err() {
                log::warn!("[FIRE] Nobody listens for fired schedules. Schedule {handle}");
            }
        }
    }
}
