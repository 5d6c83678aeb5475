use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sprout_models::reminder::TimeOfDay;
use sprout_scheduler::{
    ReminderScheduler,
    delivery::{
        DeliveryError, DeliveryEvent, NotificationDelivery, NotificationPayload,
        ReminderMessageType,
    },
};

use super::test_utils::*;
use crate::{TimerNotificationDelivery, WateringReminderScheduler, run_fired_events};

fn payload() -> NotificationPayload {
    NotificationPayload {
        plant_id: "fern".to_owned(),
        user_id: "user-1".to_owned(),
        plant_name: "Boston fern".to_owned(),
    }
}

fn timer_delivery() -> (
    TimerNotificationDelivery,
    TestDeliveryChannel,
    mpsc::Receiver<DeliveryEvent>,
) {
    let channel = TestDeliveryChannel::default();
    let (events_tx, events_rx) = mpsc::channel(16);
    let delivery = TimerNotificationDelivery::new(Arc::new(channel.clone()), events_tx);

    (delivery, channel, events_rx)
}

#[tokio::test(start_paused = true)]
async fn scheduled_notification_is_delivered_and_reported() {
    let (delivery, channel, mut events) = timer_delivery();

    let handle = delivery
        .schedule_one_shot(Utc::now() + TimeDelta::seconds(2), payload())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(channel.message_types(), vec![ReminderMessageType::Due]);
    let received = channel.received_messages.lock().unwrap()[0].0.clone();
    assert_eq!(received.body(), "Time to water your Boston fern");

    let Some(DeliveryEvent::Fired { handle: fired, .. }) = events.recv().await else {
        panic!("Expected a fired event");
    };
    assert_eq!(fired, handle);
    assert_eq!(delivery.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_notification_never_fires() {
    let (delivery, channel, mut events) = timer_delivery();

    let handle = delivery
        .schedule_one_shot(Utc::now() + TimeDelta::seconds(2), payload())
        .await
        .unwrap();
    delivery.cancel(&handle).await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(channel.message_types().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn cancelling_twice_reports_unknown_schedule() {
    let (delivery, _channel, _events) = timer_delivery();

    let handle = delivery
        .schedule_one_shot(Utc::now() + TimeDelta::hours(1), payload())
        .await
        .unwrap();
    delivery.cancel(&handle).await.unwrap();

    let result = delivery.cancel(&handle).await;

    assert!(matches!(result, Err(DeliveryError::UnknownSchedule(h)) if h == handle));
}

#[tokio::test(start_paused = true)]
async fn instant_in_the_past_is_rejected() {
    let (delivery, _channel, _events) = timer_delivery();
    let at = Utc::now() - TimeDelta::minutes(1);

    let result = delivery.schedule_one_shot(at, payload()).await;

    assert!(matches!(result, Err(DeliveryError::InThePast(past)) if past == at));
    assert_eq!(delivery.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn fired_reminder_is_rearmed_for_the_next_day() {
    let channel = TestDeliveryChannel::default();
    let (events_tx, events_rx) = mpsc::channel(16);
    let delivery = Arc::new(TimerNotificationDelivery::new(
        Arc::new(channel.clone()),
        events_tx,
    ));
    let scheduler = Arc::new(WateringReminderScheduler::new(
        delivery.clone(),
        Arc::new(channel.clone()),
    ));
    let shutdown = CancellationToken::new();
    let events_loop = tokio::spawn(run_fired_events(
        scheduler.clone(),
        events_rx,
        shutdown.clone(),
    ));

    // A time of day one minute ahead of the wall clock, so the first fire is
    // at most a minute away.
    let now = Utc::now();
    let soon = now + TimeDelta::minutes(1);
    let time_of_day = TimeOfDay::from_time(soon.time());

    let armed = scheduler
        .arm(arm_request("fern", time_of_day, 1), now)
        .await
        .unwrap();
    let first_trigger = armed.next_trigger().unwrap();

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;

    assert_eq!(channel.message_types(), vec![ReminderMessageType::Due]);
    let rearmed = scheduler.get(&"fern".to_owned()).await.unwrap();
    assert_eq!(
        rearmed.next_trigger(),
        Some(first_trigger + TimeDelta::days(1))
    );
    assert_ne!(rearmed.handle(), armed.handle());
    assert_eq!(delivery.pending_count().await, 1);

    shutdown.cancel();
    events_loop.await.unwrap();
}
