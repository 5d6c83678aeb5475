use std::sync::Arc;

use chrono::Utc;
use dptree::case;
use teloxide::{
    dispatching::UpdateHandler,
    net::Download,
    prelude::*,
    types::{ParseMode, PhotoSize},
    utils::markdown::{bold, escape},
};

use sprout_models::{
    identification::{Identification, PlantCandidate},
    plant::{HealthStatus, NewPlant, Plant},
    reminder::{RepeatInterval, WateringReminder},
    user::Session,
};
use sprout_scheduler::SchedulerError;

use crate::{
    AppContext, GlobalCommand, GlobalDialogue, GlobalState, HandlerResult, parsing,
    reminders::describe_config, reply_args_error, util::format_local,
};

/// A photo match waiting for the user to say where the plant lives.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct IdentifiedPlant {
    pub name: String,
    pub common_name: String,
    pub suggested_interval: RepeatInterval,
}

impl From<PlantCandidate> for IdentifiedPlant {
    fn from(candidate: PlantCandidate) -> Self {
        Self {
            suggested_interval: candidate.watering.suggested_interval(),
            name: candidate.name,
            common_name: candidate.common_name,
        }
    }
}

impl IdentifiedPlant {
    fn into_new_plant(self, location: &str) -> NewPlant {
        NewPlant {
            name: self.common_name,
            plant_type: self.name,
            location: location.trim().to_owned(),
            notes: "Identified from a photo".to_owned(),
            ..Default::default()
        }
    }
}

fn format_plant_line(number: usize, plant: &Plant, reminder: Option<&WateringReminder>) -> String {
    let mut line = format!(
        "{number}\\. {} {}",
        bold(&escape(&plant.name)),
        escape(&format!("({}), {}", plant.plant_type, plant.location))
    );

    if plant.health_status == HealthStatus::Unhealthy {
        line.push_str(" 🥀");
    }

    if let Some(reminder) = reminder {
        let schedule = match reminder.next_trigger() {
            Some(next) => format!(
                "{}, next {}",
                describe_config(&reminder.config),
                format_local(next, reminder.timezone)
            ),
            None => "reminder is not scheduled".to_owned(),
        };
        line.push_str(&format!("\n    💧 {}", escape(&schedule)));
    }

    line
}

async fn list_plants(
    bot: Bot,
    msg: Message,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let plants = context.plants.list(session.user_id()).await?;

    if plants.is_empty() {
        bot.send_message(
            msg.chat.id,
            "You have no plants yet. Add one with /addplant or send me a photo.",
        )
        .await?;
        return Ok(());
    }

    let mut lines = Vec::with_capacity(plants.len());
    for (index, plant) in plants.iter().enumerate() {
        let reminder = context.scheduler.get(&plant.id).await;
        lines.push(format_plant_line(index + 1, plant, reminder.as_ref()));
    }

    bot.send_message(msg.chat.id, lines.join("\n"))
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

async fn add_plant(
    bot: Bot,
    msg: Message,
    args: String,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let new_plant = match parsing::parse_new_plant(&args) {
        Ok(plant) => plant,
        Err(err) => return reply_args_error(&bot, msg.chat.id, err).await,
    };

    let plant = context
        .plants
        .add(session.user_id(), new_plant, Utc::now())
        .await?;
    let number = context.plants.list(session.user_id()).await?.len();

    bot.send_message(
        msg.chat.id,
        format!(
            "Added {} as plant #{number}. Set a watering reminder with /remind {number} 08:00",
            plant.name
        ),
    )
    .await?;
    Ok(())
}

async fn delete_plant(
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

    match context.scheduler.cancel(&plant.id).await {
        Ok(()) | Err(SchedulerError::NotArmed(_)) => {}
        Err(err) => return Err(err.into()),
    }
    context.plants.delete(session.user_id(), &plant.id).await?;

    bot.send_message(msg.chat.id, format!("Deleted {}.", plant.name))
        .await?;
    Ok(())
}

fn largest_photo(msg: &Message) -> Option<&PhotoSize> {
    msg.photo()?
        .iter()
        .max_by_key(|photo| u64::from(photo.width) * u64::from(photo.height))
}

async fn download_photo(bot: &Bot, photo: &PhotoSize) -> anyhow::Result<Vec<u8>> {
    let file = bot.get_file(photo.file.id.clone()).await?;
    let mut image = Vec::with_capacity(file.size as usize);
    bot.download_file(&file.path, &mut image).await?;
    Ok(image)
}

async fn identify_photo(
    bot: Bot,
    dialogue: GlobalDialogue,
    msg: Message,
    context: Arc<AppContext>,
) -> HandlerResult {
    let Some(photo) = largest_photo(&msg) else {
        return Ok(());
    };

    bot.send_message(msg.chat.id, "🔍 Identifying your plant...")
        .await?;

    let image = download_photo(&bot, photo).await?;
    let identification = match context.identifier.identify(&image).await {
        Ok(identification) => identification,
        Err(err) => {
            log::error!("[IDENTIFY] Identification failed: {err}");
            bot.send_message(
                msg.chat.id,
                "Could not identify the plant right now. Please try again later or add it with /addplant.",
            )
            .await?;
            return Ok(());
        }
    };

    match identification {
        Identification::Match(candidate) => {
            let identified = IdentifiedPlant::from(candidate);
            bot.send_message(
                msg.chat.id,
                format!(
                    "This looks like {} ({}). Where does it live? Send me the location, e.g. Kitchen, or /cancel.",
                    identified.common_name, identified.name
                ),
            )
            .await?;
            dialogue
                .update(GlobalState::SavingIdentifiedPlant(identified))
                .await?;
        }
        Identification::NoMatch => {
            bot.send_message(
                msg.chat.id,
                "I couldn't recognize this plant. Add it manually with /addplant Name | Type | Location",
            )
            .await?;
        }
    }

    Ok(())
}

async fn save_identified_plant(
    bot: Bot,
    dialogue: GlobalDialogue,
    msg: Message,
    identified: IdentifiedPlant,
    location: String,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let interval = identified.suggested_interval;
    let plant = match context
        .plants
        .add(session.user_id(), identified.into_new_plant(&location), Utc::now())
        .await
    {
        Ok(plant) => plant,
        Err(err) => {
            bot.send_message(msg.chat.id, format!("Could not save the plant: {err}"))
                .await?;
            return Ok(());
        }
    };
    dialogue.exit().await?;

    let number = context.plants.list(session.user_id()).await?.len();
    bot.send_message(
        msg.chat.id,
        format!(
            "Added {} as plant #{number}. It likes water every {} day(s): /remind {number} 08:00 {}",
            plant.name,
            interval.days(),
            interval.days()
        ),
    )
    .await?;
    Ok(())
}

fn location_text(msg: Message) -> Option<String> {
    msg.text()
        .map(str::trim)
        .filter(|text| !text.is_empty() && !text.starts_with('/'))
        .map(str::to_owned)
}

pub(super) fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message()
        .branch(
            teloxide::filter_command::<GlobalCommand, _>()
                .branch(case![GlobalCommand::Plants].endpoint(list_plants))
                .branch(case![GlobalCommand::AddPlant(args)].endpoint(add_plant))
                .branch(case![GlobalCommand::DeletePlant(args)].endpoint(delete_plant)),
        )
        .branch(dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(identify_photo))
        .branch(
            case![GlobalState::SavingIdentifiedPlant(identified)]
                .filter_map(location_text)
                .endpoint(save_identified_plant),
        )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sprout_models::{
        chrono_tz::Europe::Prague,
        identification::WateringFrequency,
        reminder::{ReminderConfig, ReminderState, ScheduleHandle, TimeOfDay},
    };

    use super::*;

    fn plant() -> Plant {
        NewPlant {
            name: "Fiddle-leaf".to_owned(),
            plant_type: "Ficus lyrata".to_owned(),
            location: "Living room".to_owned(),
            ..Default::default()
        }
        .into_plant(Utc::now())
        .unwrap()
    }

    #[test]
    fn plant_line_escapes_markdown() {
        assert_eq!(
            format_plant_line(1, &plant(), None),
            "1\\. *Fiddle\\-leaf* \\(Ficus lyrata\\), Living room"
        );
    }

    #[test]
    fn plant_line_shows_reminder_schedule() {
        let reminder = WateringReminder {
            plant_id: "p-1".to_owned(),
            user_id: "u-1".to_owned(),
            plant_name: "Fiddle-leaf".to_owned(),
            timezone: Prague,
            config: ReminderConfig {
                time_of_day: TimeOfDay::new(8, 0).unwrap(),
                repeat_interval: RepeatInterval::WEEKLY,
            },
            state: ReminderState::Armed {
                next_trigger: Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap(),
                handle: ScheduleHandle::new(),
            },
        };

        let line = format_plant_line(2, &plant(), Some(&reminder));

        assert!(line.ends_with("💧 every 7 days at 08:00, next Mon 02 Jun 08:00"));
    }

    #[test]
    fn identified_plant_is_named_by_its_common_name() {
        let identified = IdentifiedPlant::from(PlantCandidate {
            name: "Monstera deliciosa".to_owned(),
            common_name: "Swiss cheese plant".to_owned(),
            watering: WateringFrequency::Frequent,
            probability: 0.93,
        });

        assert_eq!(identified.suggested_interval, RepeatInterval::DAILY);

        let new_plant = identified.into_new_plant("  Bedroom ");
        assert_eq!(new_plant.name, "Swiss cheese plant");
        assert_eq!(new_plant.plant_type, "Monstera deliciosa");
        assert_eq!(new_plant.location, "Bedroom");
        assert_eq!(new_plant.validate(), Ok(()));
    }
}
