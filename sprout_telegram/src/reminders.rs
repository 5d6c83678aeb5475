use std::sync::Arc;

use chrono::{DateTime, Utc};
use dptree::case;
use teloxide::{dispatching::UpdateHandler, prelude::*};
use thiserror::Error;

use sprout_models::{
    plant::PlantId,
    reminder::{ReminderConfig, StoredReminder, WateringReminder},
    user::{Session, User, UserId},
};
use sprout_scheduler::{ArmRequest, ReminderScheduler, SchedulerError};
use sprout_storage::{ReminderConfigStorage, StorageError};

use crate::{
    AppContext, GlobalCommand, HandlerResult,
    parsing::{self, RemindArgs},
    reply_args_error,
    util::format_local,
};

#[derive(Debug, Error)]
pub(crate) enum ReminderUpdateError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn arm_request(stored: &StoredReminder, user: &User) -> ArmRequest {
    ArmRequest {
        plant_id: stored.plant_id.clone(),
        user_id: user.id.clone(),
        plant_name: stored.plant_name.clone(),
        timezone: user.timezone,
        config: stored.config(),
    }
}

/// Arms every persisted reminder of the user again, e.g. after a restart or a
/// timezone change. Reminders that fail to arm are logged and skipped.
pub(crate) async fn restore_user_reminders(
    scheduler: &dyn ReminderScheduler,
    configs: &ReminderConfigStorage,
    user: &User,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let stored = configs.list_for_user(&user.id).await?;
    let mut restored = 0;

    for reminder in &stored {
        let request = arm_request(reminder, user);
        let armed = match reminder.next_trigger {
            Some(anchor) => scheduler.resume(request, anchor, now).await,
            None => scheduler.arm(request, now).await,
        };

        match armed {
            Ok(armed) => {
                restored += 1;
                let refreshed = StoredReminder::from_reminder(&armed);
                if refreshed == *reminder {
                    continue;
                }
                if let Err(err) = configs.save(&user.id, &refreshed).await {
                    log::warn!(
                        "[RESTORE] Failed to store next trigger of plant {}: {err}",
                        reminder.plant_id
                    );
                }
            }
            Err(err) => log::error!(
                "[RESTORE] Failed to arm reminder for plant {}: {err}",
                reminder.plant_id
            ),
        }
    }

    Ok(restored)
}

/// Arms the persisted reminders of all users.
pub async fn restore_reminders(context: &AppContext) -> anyhow::Result<usize> {
    let mut restored = 0;
    for user in context.users.list().await? {
        restored += restore_user_reminders(
            context.scheduler.as_ref(),
            &context.reminder_configs,
            &user,
            Utc::now(),
        )
        .await?;
    }

    log::info!("[RESTORE] {restored} reminder(s) armed");
    Ok(restored)
}

/// Arms the reminder and persists its configuration. A reminder that cannot be
/// persisted is cancelled again.
pub(crate) async fn arm_and_save(
    scheduler: &dyn ReminderScheduler,
    configs: &ReminderConfigStorage,
    request: ArmRequest,
    now: DateTime<Utc>,
) -> Result<WateringReminder, ReminderUpdateError> {
    let user_id = request.user_id.clone();
    let reminder = scheduler.arm(request, now).await?;

    if let Err(err) = configs
        .save(&user_id, &StoredReminder::from_reminder(&reminder))
        .await
    {
        match scheduler.cancel(&reminder.plant_id).await {
            Ok(()) | Err(SchedulerError::NotArmed(_)) => {}
            Err(cancel_err) => log::error!(
                "[REMIND] Failed to cancel unsaved reminder for plant {}: {cancel_err}",
                reminder.plant_id
            ),
        }
        return Err(err.into());
    }

    Ok(reminder)
}

/// Forgets the persisted configuration, then cancels the pending reminder.
/// The configuration is put back if cancelling fails. Returns whether a
/// reminder was armed.
pub(crate) async fn stop_and_remove(
    scheduler: &dyn ReminderScheduler,
    configs: &ReminderConfigStorage,
    user_id: &UserId,
    plant_id: &PlantId,
) -> Result<bool, ReminderUpdateError> {
    let stored = configs.get(user_id, plant_id).await?;
    configs.remove(user_id, plant_id).await?;

    match scheduler.cancel(plant_id).await {
        Ok(()) => Ok(true),
        Err(SchedulerError::NotArmed(_)) => Ok(false),
        Err(err) => {
            if let Some(stored) = &stored {
                if let Err(save_err) = configs.save(user_id, stored).await {
                    log::error!(
                        "[STOP] Failed to put back reminder config of plant {plant_id}: {save_err}"
                    );
                }
            }
            Err(err.into())
        }
    }
}

pub(crate) fn describe_config(config: &ReminderConfig) -> String {
    match config.repeat_interval.days() {
        1 => format!("every day at {}", config.time_of_day),
        days => format!("every {days} days at {}", config.time_of_day),
    }
}

fn describe_armed(reminder: &WateringReminder) -> String {
    let schedule = describe_config(&reminder.config);
    match reminder.next_trigger() {
        Some(next) => format!(
            "💧 I'll remind you to water {} {schedule}. Next reminder: {}.",
            reminder.plant_name,
            format_local(next, reminder.timezone)
        ),
        None => format!("⚠️ Reminder for {} is not scheduled.", reminder.plant_name),
    }
}

async fn remind(
    bot: Bot,
    msg: Message,
    args: String,
    session: Session,
    context: Arc<AppContext>,
) -> HandlerResult {
    let RemindArgs { plant, config } = match parsing::parse_remind(&args) {
        Ok(args) => args,
        Err(err) => return reply_args_error(&bot, msg.chat.id, err).await,
    };

    let Some(plant) = context.plant_by_number(&session, plant).await? else {
        bot.send_message(msg.chat.id, format!("There is no plant #{plant}. See /plants."))
            .await?;
        return Ok(());
    };

    let request = ArmRequest {
        plant_id: plant.id.clone(),
        user_id: session.user_id().clone(),
        plant_name: plant.name.clone(),
        timezone: session.timezone(),
        config,
    };

    let reminder = match arm_and_save(
        context.scheduler.as_ref(),
        &context.reminder_configs,
        request,
        Utc::now(),
    )
    .await
    {
        Ok(reminder) => reminder,
        Err(err) => {
            log::error!("[REMIND] Failed to set reminder for plant {}: {err}", plant.id);
            bot.send_message(
                msg.chat.id,
                "Failed to schedule the reminder. Please try again later.",
            )
            .await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, describe_armed(&reminder))
        .await?;
    Ok(())
}

async fn stop_reminder(
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

    let text = match stop_and_remove(
        context.scheduler.as_ref(),
        &context.reminder_configs,
        session.user_id(),
        &plant.id,
    )
    .await
    {
        Ok(true) => format!("Reminder for {} stopped.", plant.name),
        Ok(false) => format!("{} has no reminder.", plant.name),
        Err(err) => {
            log::error!("[STOP] Failed to stop reminder for plant {}: {err}", plant.id);
            "Failed to stop the reminder. Please try again later.".to_owned()
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub(super) fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message().branch(
        teloxide::filter_command::<GlobalCommand, _>()
            .branch(case![GlobalCommand::Remind(args)].endpoint(remind))
            .branch(case![GlobalCommand::StopReminder(args)].endpoint(stop_reminder)),
    )
}
