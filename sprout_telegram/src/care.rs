use std::sync::Arc;

use chrono::Utc;
use dptree::case;
use teloxide::{dispatching::UpdateHandler, prelude::*};

use sprout_models::{
    care_log::{CareAction, CareLogEntry, NewCareLog},
    chrono_tz::Tz,
    plant::PlantId,
    user::Session,
    weather::{CareTips, Coordinates, PlantStore},
};

use crate::{
    AppContext, GlobalCommand, HandlerResult,
    parsing::{self, CallbackAction, LogArgs},
    reply_args_error,
    util::{answer_query, clear_message_buttons, format_local, try_get_message_from_query},
};

const LOGS_SHOWN: usize = 10;
const LOCATION_HINT: &str =
    "I need your location first. Share it with 📎 → Location and try again.";

fn format_log_entry(entry: &CareLogEntry, timezone: Tz) -> String {
    let when = format_local(entry.timestamp, timezone);
    match &entry.note {
        Some(note) => format!("{when}  {}: {note}", entry.action),
        None => format!("{when}  {}", entry.action),
    }
}

fn format_tips(plant_name: &str, tips: &CareTips) -> String {
    format!(
        "🌤 {:.1}°C, {}, humidity {:.0}%\n\n🌱 {plant_name}\n{}",
        tips.weather.temperature, tips.weather.condition, tips.weather.humidity, tips.instructions
    )
}

fn format_stores(stores: &[PlantStore]) -> String {
    let lines: Vec<String> = stores
        .iter()
        .map(|store| {
            format!(
                "🏪 {} ({:.5}, {:.5})",
                store.name, store.coordinates.latitude, store.coordinates.longitude
            )
        })
        .collect();
    lines.join("\n")
}

async fn log_care(
    bot: Bot,
    msg: Message,
    args: String,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let LogArgs { plant, log } = match parsing::parse_log(&args) {
        Ok(args) => args,
        Err(err) => return reply_args_error(&bot, msg.chat.id, err).await,
    };

    let Some(plant) = context.plant_by_number(&session, plant).await? else {
        bot.send_message(msg.chat.id, format!("There is no plant #{plant}. See /plants."))
            .await?;
        return Ok(());
    };

    let entry = context
        .care_logs
        .add(session.user_id(), &plant.id, log, Utc::now())
        .await?;

    bot.send_message(
        msg.chat.id,
        format!("✅ {} logged for {}.", entry.action, plant.name),
    )
    .await?;
    Ok(())
}

async fn show_logs(
    bot: Bot,
    msg: Message,
    args: String,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let number = match parsing::parse_plant_number(&args) {
        Ok(number) => number,
        Err(err) => return reply_args_error(&bot, msg.chat.id, err).await,
    };

    let Some(plant) = context.plant_by_number(&session, number).await? else {
        bot.send_message(msg.chat.id, format!("There is no plant #{number}. See /plants."))
            .await?;
        return Ok(());
    };

    let entries = context.care_logs.list(session.user_id(), &plant.id).await?;
    let text = if entries.is_empty() {
        format!("No care logged for {} yet.", plant.name)
    } else {
        let lines: Vec<String> = entries
            .iter()
            .take(LOGS_SHOWN)
            .map(|entry| format_log_entry(entry, session.timezone()))
            .collect();
        format!("📖 {}\n{}", plant.name, lines.join("\n"))
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn care_tips(
    bot: Bot,
    msg: Message,
    args: String,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let number = match parsing::parse_plant_number(&args) {
        Ok(number) => number,
        Err(err) => return reply_args_error(&bot, msg.chat.id, err).await,
    };

    let Some(location) = session.user().location else {
        bot.send_message(msg.chat.id, LOCATION_HINT).await?;
        return Ok(());
    };

    let Some(plant) = context.plant_by_number(&session, number).await? else {
        bot.send_message(msg.chat.id, format!("There is no plant #{number}. See /plants."))
            .await?;
        return Ok(());
    };

    let text = match context.advisor.tips(&plant.plant_type, location).await {
        Ok(tips) => format_tips(&plant.name, &tips),
        Err(err) => {
            log::error!("[TIPS] Failed to get tips for plant {}: {err}", plant.id);
            "Failed to get care instructions. Please try again later.".to_owned()
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn nearby_stores(
    bot: Bot,
    msg: Message,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let Some(location) = session.user().location else {
        bot.send_message(msg.chat.id, LOCATION_HINT).await?;
        return Ok(());
    };

    let text = match context.stores.nearby_stores(location).await {
        Ok(stores) if stores.is_empty() => "No plant stores found nearby.".to_owned(),
        Ok(stores) => format_stores(&stores),
        Err(err) => {
            log::error!("[STORES] Store search failed: {err}");
            "Failed to search for plant stores. Please try again later.".to_owned()
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn save_location(
    bot: Bot,
    msg: Message,
    coordinates: Coordinates,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    context
        .users
        .set_location(session.user_id(), coordinates)
        .await?;

    bot.send_message(msg.chat.id, "📍 Location saved. Try /tips or /stores.")
        .await?;
    Ok(())
}

async fn watered(
    bot: Bot,
    query: CallbackQuery,
    plant_id: PlantId,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let Some(plant) = context.plants.get(session.user_id(), &plant_id).await? else {
        answer_query(&bot, &query, Some("This plant no longer exists.")).await?;
        if let Some(message) = try_get_message_from_query(&query) {
            clear_message_buttons(&bot, message).await?;
        }
        return Ok(());
    };

    context
        .care_logs
        .add(
            session.user_id(),
            &plant.id,
            NewCareLog {
                action: CareAction::Watered,
                note: None,
            },
            Utc::now(),
        )
        .await?;

    answer_query(&bot, &query, Some("💧 Logged")).await?;
    if let Some(message) = try_get_message_from_query(&query) {
        clear_message_buttons(&bot, message).await?;
        bot.send_message(message.chat.id, format!("✅ {} watered.", plant.name))
            .await?;
    }

    Ok(())
}

fn shared_location(msg: Message) -> Option<Coordinates> {
    msg.location()
        .map(|location| Coordinates::new(location.latitude, location.longitude))
}

pub(super) fn schema() -> UpdateHandler<anyhow::Error> {
    let message_handler = Update::filter_message()
        .branch(
            teloxide::filter_command::<GlobalCommand, _>()
                .branch(case![GlobalCommand::Log(args)].endpoint(log_care))
                .branch(case![GlobalCommand::Logs(args)].endpoint(show_logs))
                .branch(case![GlobalCommand::Tips(args)].endpoint(care_tips))
                .branch(case![GlobalCommand::Stores].endpoint(nearby_stores)),
        )
        .branch(dptree::filter_map(shared_location).endpoint(save_location));

    let callback_handler = Update::filter_callback_query()
        .filter_map(parsing::callback_action)
        .branch(case![CallbackAction::Watered(plant_id)].endpoint(watered));

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}
