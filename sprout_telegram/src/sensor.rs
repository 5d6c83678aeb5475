use std::sync::Arc;

use dptree::case;
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
};
use tokio::sync::mpsc;

use sprout_models::{sensor::SensorAlert, settings::SensorSettings};
use sprout_services::{SensorMonitor, SimulatedSensor};

use crate::{
    AppContext, GlobalCommand, HandlerResult,
    parsing::{self, CallbackAction},
    util::{answer_query, clear_message_buttons, try_get_message_from_query},
};

const ALERT_BUFFER: usize = 4;

fn alert_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "OK",
        CallbackAction::AcknowledgeSensorAlert.to_string(),
    )]])
}

fn monitoring_started_text(settings: &SensorSettings) -> String {
    format!(
        "📡 Monitoring started. Readings every {}s, alerts outside {:.0}–{:.0}°C. Stop with /stopmonitor.",
        settings.interval_secs.max(1),
        settings.temperature.min,
        settings.temperature.max
    )
}

async fn forward_alerts(bot: Bot, chat_id: ChatId, mut alerts: mpsc::Receiver<SensorAlert>) {
    while let Some(alert) = alerts.recv().await {
        let sent = bot
            .send_message(chat_id, format!("🌡 {alert}"))
            .reply_markup(alert_keyboard())
            .await;

        if let Err(err) = sent {
            log::error!("[SENSOR] Failed to send alert to chat {chat_id}: {err}");
        }
    }
}

async fn start_monitor(bot: Bot, msg: Message, context: Arc<AppContext>) -> HandlerResult {
    let mut monitors = context.monitors.lock().await;

    if monitors
        .get(&msg.chat.id)
        .is_some_and(SensorMonitor::is_running)
    {
        bot.send_message(msg.chat.id, "Monitoring is already running.")
            .await?;
        return Ok(());
    }

    let (alerts_tx, alerts_rx) = mpsc::channel(ALERT_BUFFER);
    let monitor = SensorMonitor::start(SimulatedSensor::new(), context.sensor_settings, alerts_tx);
    monitors.insert(msg.chat.id, monitor);
    drop(monitors);
    tokio::spawn(forward_alerts(bot.clone(), msg.chat.id, alerts_rx));

    bot.send_message(msg.chat.id, monitoring_started_text(&context.sensor_settings))
        .await?;
    Ok(())
}

async fn stop_monitor(bot: Bot, msg: Message, context: Arc<AppContext>) -> HandlerResult {
    let removed = context.monitors.lock().await.remove(&msg.chat.id);

    let text = match removed {
        Some(monitor) => {
            monitor.stop();
            match monitor.latest() {
                Some(reading) => format!(
                    "Monitoring stopped. Last reading: {:.0} lux, {:.1}°C, {:.0}% humidity.",
                    reading.light_lux, reading.temperature, reading.humidity
                ),
                None => "Monitoring stopped.".to_owned(),
            }
        }
        None => "Monitoring is not running.".to_owned(),
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn acknowledge_alert(
    bot: Bot,
    query: CallbackQuery,
    context: Arc<AppContext>,
) -> HandlerResult {
    let Some(message) = try_get_message_from_query(&query) else {
        answer_query(&bot, &query, None).await?;
        return Ok(());
    };

    let acknowledged = match context.monitors.lock().await.get(&message.chat.id) {
        Some(monitor) => {
            monitor.acknowledge_alert();
            true
        }
        None => false,
    };

    let text = if acknowledged {
        "Readings resumed"
    } else {
        "Monitoring is not running"
    };
    answer_query(&bot, &query, Some(text)).await?;
    clear_message_buttons(&bot, message).await?;
    Ok(())
}

pub(super) fn schema() -> UpdateHandler<anyhow::Error> {
    let message_handler = Update::filter_message().branch(
        teloxide::filter_command::<GlobalCommand, _>()
            .branch(case![GlobalCommand::Monitor].endpoint(start_monitor))
            .branch(case![GlobalCommand::StopMonitor].endpoint(stop_monitor)),
    );

    let callback_handler = Update::filter_callback_query()
        .filter_map(parsing::callback_action)
        .branch(case![CallbackAction::AcknowledgeSensorAlert].endpoint(acknowledge_alert));

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_offers_acknowledge_button() {
        let keyboard = alert_keyboard();

        assert_eq!(keyboard.inline_keyboard[0][0].text, "OK");
    }

    #[test]
    fn start_message_names_the_range() {
        let text = monitoring_started_text(&SensorSettings::default());

        assert!(text.contains("every 5s"));
        assert!(text.contains("20–25°C"));
    }
}
